// ==========================================
// 电压控制申请系统 - API 请求/响应结构
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::{SolicitationStatus, SolicitationView};
use crate::engine::validator::RawSolicitation;

/// 创建成功时返回的消息
pub const CREATED_MESSAGE: &str = "Voltage control solicitations created with success.";

/// 批量创建请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolicitationBatch {
    /// 客户端组包耗时 (毫秒), 必须 >= 0
    #[serde(default)]
    pub creation_total_time: i64,
    #[serde(default)]
    pub solicitations: Vec<RawSolicitation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub group_id: String,
    pub ids: Vec<i64>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangeResponse {
    pub solicitation_id: i64,
    pub status: SolicitationStatus,
    /// 更新流令牌 (记录失败时为 None)
    pub stream_token: Option<i64>,
}

/// 列表请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListRequest {
    #[serde(default)]
    pub company_code: Option<String>,
    #[serde(default)]
    pub substations: Vec<String>,
    #[serde(default)]
    pub table_code: Option<String>,
    #[serde(default)]
    pub exclude_expired: bool,
    #[serde(default)]
    pub from_id: Option<i64>,
    #[serde(default)]
    pub limit: Option<usize>,
    /// 排序提示: status / creation_time / substation
    #[serde(default)]
    pub sort: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub solicitations: Vec<SolicitationView>,
    pub count: usize,
}
