// ==========================================
// 电压控制申请系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + tokio
// 系统定位: 申请生命周期与参数校验引擎
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 校验 / 状态迁移 / 协作者 trait
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配与后台任务
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{Company, EquipmentType, SolicitationAction, SolicitationStatus, VoltageLevel};

// 领域实体
pub use domain::{Solicitation, SolicitationEvent, SolicitationParams, SolicitationState, SolicitationView};

// 引擎
pub use engine::{EquipmentValidator, TransitionAuthority, TransitionRole};

// API
pub use api::{ApiError, SolicitationApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "电压控制申请系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
