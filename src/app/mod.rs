// ==========================================
// 电压控制申请系统 - 应用层
// ==========================================
// 职责: 装配仓储/引擎/API, 运行后台扫描任务
// ==========================================

pub mod late_sweeper;
pub mod state;

// 重导出
pub use late_sweeper::{LateSweeper, SweepOutcome, SweeperHandle};
pub use state::{get_default_db_path, AppState};
