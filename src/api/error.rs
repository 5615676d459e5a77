// ==========================================
// 电压控制申请系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，把引擎/仓储错误映射为调用方可见的错误
// 每种错误对应一个 HTTP 状态码 (status_code)
// ==========================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::transition::TransitionError;
use crate::engine::validator::ValidationError;
use crate::repository::error::RepositoryError;

/// 状态冲突的细分类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictKind {
    NoOp,              // 目标状态与当前状态相同
    InvalidTransition, // 当前状态不允许该迁移
    Expired,           // 超过受理时限
    Concurrent,        // 并发修改, 重试后仍冲突
}

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 调用方错误
    // ==========================================
    #[error("{message}")]
    Validation {
        message: String,
        equipment: Option<String>,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{message}")]
    StateConflict { kind: ConflictKind, message: String },

    // ==========================================
    // 基础设施错误
    // ==========================================
    #[error("数据存储错误: {0}")]
    Store(#[source] RepositoryError),

    #[error("外部协作者调用失败: {0}")]
    Collaborator(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            equipment: None,
        }
    }

    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Validation { .. } => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::StateConflict {
                kind: ConflictKind::Expired,
                ..
            } => 429,
            ApiError::StateConflict { .. } => 400,
            ApiError::Store(_) => 500,
            ApiError::Collaborator(_) => 502,
        }
    }

    pub fn conflict_kind(&self) -> Option<ConflictKind> {
        match self {
            ApiError::StateConflict { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

// ==========================================
// 从 ValidationError 转换
// ==========================================
impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation {
            message: err.message,
            equipment: Some(err.equipment),
        }
    }
}

// ==========================================
// 从 TransitionError 转换
// ==========================================
impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        let message = err.to_string();
        match err {
            TransitionError::NoOp(_) => ApiError::StateConflict {
                kind: ConflictKind::NoOp,
                message,
            },
            TransitionError::InvalidTransition { .. } => ApiError::StateConflict {
                kind: ConflictKind::InvalidTransition,
                message,
            },
            TransitionError::Expired { .. } => ApiError::StateConflict {
                kind: ConflictKind::Expired,
                message,
            },
            TransitionError::Unauthorized { .. } => ApiError::Unauthorized(message),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} {} not found.", entity, id))
            }
            RepositoryError::OptimisticLockFailure {
                solicitation_id, ..
            } => ApiError::StateConflict {
                kind: ConflictKind::Concurrent,
                message: format!(
                    "Solicitation {} was modified concurrently, try again.",
                    solicitation_id
                ),
            },
            other => ApiError::Store(other),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SolicitationStatus;
    use std::error::Error;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::validation("x").status_code(), 400);
        assert_eq!(ApiError::NotFound("x".into()).status_code(), 404);
        assert_eq!(ApiError::Unauthorized("x".into()).status_code(), 401);
        assert_eq!(ApiError::Forbidden("x".into()).status_code(), 403);
        assert_eq!(ApiError::Collaborator("x".into()).status_code(), 502);
    }

    #[test]
    fn test_transition_error_mapping() {
        let err: ApiError = TransitionError::Expired {
            elapsed: 301,
            window: 300,
        }
        .into();
        assert_eq!(err.status_code(), 429);
        assert_eq!(err.conflict_kind(), Some(ConflictKind::Expired));

        let err: ApiError = TransitionError::NoOp(SolicitationStatus::Accepted).into();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.conflict_kind(), Some(ConflictKind::NoOp));

        let err: ApiError = TransitionError::Unauthorized {
            requested: SolicitationStatus::Executed,
        }
        .into();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn test_repository_error_mapping_keeps_source() {
        let err: ApiError = RepositoryError::LockError("poisoned".into()).into();
        assert_eq!(err.status_code(), 500);
        assert!(err.source().is_some());

        let err: ApiError = RepositoryError::not_found("Solicitation", 7).into();
        assert_eq!(err.status_code(), 404);

        let err: ApiError = RepositoryError::OptimisticLockFailure {
            solicitation_id: 7,
            expected_head: 1,
            actual_head: 2,
        }
        .into();
        assert_eq!(err.conflict_kind(), Some(ConflictKind::Concurrent));
    }

    #[test]
    fn test_validation_error_keeps_equipment() {
        let err: ApiError = ValidationError {
            message: "Invalid amount value for equipment type 'REACTOR'.".into(),
            equipment: "REACTOR".into(),
        }
        .into();
        match err {
            ApiError::Validation { message, equipment } => {
                assert!(message.contains("REACTOR"));
                assert_eq!(equipment.as_deref(), Some("REACTOR"));
            }
            _ => panic!("Expected Validation"),
        }
    }
}
