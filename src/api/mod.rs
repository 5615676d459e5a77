// ==========================================
// 电压控制申请系统 - API 层
// ==========================================
// 职责: 对外的申请工作流接口 (创建 / 列表 / 查询 / 状态变更)
// ==========================================

pub mod dto;
pub mod error;
pub mod solicitation_api;

// 重导出核心类型
pub use dto::{ListRequest, ListResponse, SolicitationBatch, StatusChangeResponse, SubmitResponse};
pub use error::{ApiError, ApiResult, ConflictKind};
pub use solicitation_api::SolicitationApi;
