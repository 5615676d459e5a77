// ==========================================
// 电压控制申请系统 - 更新流领域模型
// ==========================================
// stream_id 单调递增, 作为通知总线上的同步令牌
// ==========================================

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateKind {
    Created,
    StatusChanged,
}

impl UpdateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateKind::Created => "CREATED",
            UpdateKind::StatusChanged => "STATUS_CHANGED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CREATED" => Some(UpdateKind::Created),
            "STATUS_CHANGED" => Some(UpdateKind::StatusChanged),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolicitationUpdate {
    pub stream_id: i64,
    pub solicitation_id: i64,
    pub user_id: Option<String>,
    pub kind: UpdateKind,
    pub content: JsonValue,
}
