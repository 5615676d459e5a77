// ==========================================
// 电压控制申请系统 - 领域模型层
// ==========================================
// 职责: 定义申请实体、状态、排序视图
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod solicitation;
pub mod types;
pub mod update;

// 重导出核心类型
pub use solicitation::{
    CurrentStatusMarker, NewSolicitation, PageRequest, Solicitation, SolicitationEvent,
    SolicitationFilter, SolicitationGroup, SolicitationParams, SolicitationState,
    SolicitationView, SortView, StatusBucket,
};
pub use types::{Company, EquipmentType, SolicitationAction, SolicitationStatus, SortParam, VoltageLevel};
pub use update::{SolicitationUpdate, UpdateKind};
