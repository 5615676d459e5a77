// ==========================================
// 电压控制申请系统 - 申请领域模型
// ==========================================
// 申请信封 (不可变) + 状态事件 (只追加)
// 当前状态 = 最大 (time_stamp, event_id) 事件
// 创建时间 = 最小 (time_stamp, event_id) 事件
// ==========================================

use serde::{Deserialize, Serialize};

use super::types::{EquipmentType, SolicitationAction, SolicitationStatus, VoltageLevel};

// ==========================================
// SolicitationParams - 规范化设备参数
// ==========================================
// 每种设备只携带与其相关的字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SolicitationParams {
    /// 电抗器 / 电容器
    Switched {
        amount: i64,
        staggered: bool,
        voltage: Option<VoltageLevel>,
    },
    /// 变压器
    Transformer {
        amount: i64,
        voltage: VoltageLevel,
        voltage_primary: Option<VoltageLevel>,
        voltage_secondary: Option<VoltageLevel>,
    },
    /// 同步调相机 (仅 ADJUST 携带 amount)
    Synchronous { amount: Option<i64> },
}

impl SolicitationParams {
    pub fn amount(&self) -> Option<i64> {
        match self {
            SolicitationParams::Switched { amount, .. } => Some(*amount),
            SolicitationParams::Transformer { amount, .. } => Some(*amount),
            SolicitationParams::Synchronous { amount } => *amount,
        }
    }

    pub fn voltage(&self) -> Option<VoltageLevel> {
        match self {
            SolicitationParams::Switched { voltage, .. } => *voltage,
            SolicitationParams::Transformer { voltage, .. } => Some(*voltage),
            SolicitationParams::Synchronous { .. } => None,
        }
    }

    pub fn staggered(&self) -> Option<bool> {
        match self {
            SolicitationParams::Switched { staggered, .. } => Some(*staggered),
            _ => None,
        }
    }

    pub fn voltage_primary(&self) -> Option<VoltageLevel> {
        match self {
            SolicitationParams::Transformer { voltage_primary, .. } => *voltage_primary,
            _ => None,
        }
    }

    pub fn voltage_secondary(&self) -> Option<VoltageLevel> {
        match self {
            SolicitationParams::Transformer {
                voltage_secondary, ..
            } => *voltage_secondary,
            _ => None,
        }
    }

    /// 从存储列还原参数记录
    ///
    /// 列组合与设备类型不一致时返回 None (视为损坏记录)
    pub fn from_columns(
        equipment: EquipmentType,
        amount: Option<i64>,
        voltage: Option<VoltageLevel>,
        staggered: Option<bool>,
        voltage_primary: Option<VoltageLevel>,
        voltage_secondary: Option<VoltageLevel>,
    ) -> Option<Self> {
        match equipment {
            EquipmentType::Reactor | EquipmentType::Capacitor => {
                Some(SolicitationParams::Switched {
                    amount: amount?,
                    staggered: staggered?,
                    voltage,
                })
            }
            EquipmentType::Transformer => Some(SolicitationParams::Transformer {
                amount: amount?,
                voltage: voltage?,
                voltage_primary,
                voltage_secondary,
            }),
            EquipmentType::Synchronous => Some(SolicitationParams::Synchronous { amount }),
        }
    }
}

// ==========================================
// NewSolicitation - 已校验、待持久化的申请
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSolicitation {
    pub equipment: EquipmentType,
    pub action: SolicitationAction,
    pub substation_code: String,
    pub company_code: String, // 变电站所属公司 (审核方)
    pub params: SolicitationParams,
}

// ==========================================
// Solicitation - 申请信封 (创建后不可变)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solicitation {
    pub id: i64,
    pub equipment: EquipmentType,
    pub action: SolicitationAction,
    pub substation_code: String,
    pub company_code: String,
    pub params: SolicitationParams,
    pub requester_id: String,
    pub group_id: Option<String>,
}

// ==========================================
// SolicitationEvent - 状态事件
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolicitationEvent {
    pub event_id: i64, // 同秒事件的决胜序号
    pub solicitation_id: i64,
    pub actor: Option<String>, // None = 系统 (超时扫描)
    pub status: SolicitationStatus,
    pub time_stamp: i64, // UTC 秒
    pub justification: Option<String>,
}

/// 乐观并发的比对标记: 读取时刻的头事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentStatusMarker {
    pub head_event_id: i64,
    pub status: SolicitationStatus,
}

// ==========================================
// SolicitationState - 由事件推导的当前状态
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolicitationState {
    pub status: SolicitationStatus,
    pub created_at: i64,
    pub updated_at: i64,
    pub head_event_id: i64,
    pub events: Vec<SolicitationEvent>, // 由新到旧
}

impl SolicitationState {
    /// 从事件集合推导当前状态; 空集合返回 None
    pub fn derive(mut events: Vec<SolicitationEvent>) -> Option<Self> {
        events.sort_by(|a, b| {
            b.time_stamp
                .cmp(&a.time_stamp)
                .then(b.event_id.cmp(&a.event_id))
        });
        let head = events.first()?;
        let first = events.last()?;

        Some(SolicitationState {
            status: head.status,
            created_at: first.time_stamp,
            updated_at: head.time_stamp,
            head_event_id: head.event_id,
            events,
        })
    }

    pub fn marker(&self) -> CurrentStatusMarker {
        CurrentStatusMarker {
            head_event_id: self.head_event_id,
            status: self.status,
        }
    }
}

// ==========================================
// SolicitationView - 信封 + 当前状态
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolicitationView {
    #[serde(flatten)]
    pub solicitation: Solicitation,
    pub status: SolicitationStatus,
    pub created_at: i64,
    pub updated_at: i64,
    pub events: Vec<SolicitationEvent>,
}

impl SolicitationView {
    pub fn new(solicitation: Solicitation, state: SolicitationState) -> Self {
        Self {
            solicitation,
            status: state.status,
            created_at: state.created_at,
            updated_at: state.updated_at,
            events: state.events,
        }
    }

    pub fn id(&self) -> i64 {
        self.solicitation.id
    }
}

// ==========================================
// SolicitationGroup - 批次
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolicitationGroup {
    pub group_id: String,
    pub requester_id: String,
    pub creation_total_time: i64, // 客户端组包耗时 (毫秒)
    pub created_at: i64,
}

// ==========================================
// 列表排序视图
// ==========================================

/// 一个状态桶: 桶内统一按头事件时间排序
#[derive(Debug, Clone, Copy)]
pub struct StatusBucket {
    pub statuses: &'static [SolicitationStatus],
    pub newest_first: bool,
}

const OPERATOR_BUCKETS: &[StatusBucket] = &[
    StatusBucket {
        statuses: &[
            SolicitationStatus::Blocked,
            SolicitationStatus::Contested,
            SolicitationStatus::New,
            SolicitationStatus::Required,
        ],
        newest_first: false,
    },
    StatusBucket {
        statuses: &[SolicitationStatus::Late, SolicitationStatus::Accepted],
        newest_first: false,
    },
    StatusBucket {
        statuses: &[SolicitationStatus::Executed, SolicitationStatus::Canceled],
        newest_first: true,
    },
];

const TRANSMISSION_BUCKETS: &[StatusBucket] = &[
    StatusBucket {
        statuses: &[SolicitationStatus::Late],
        newest_first: false,
    },
    StatusBucket {
        statuses: &[SolicitationStatus::Accepted],
        newest_first: false,
    },
    StatusBucket {
        statuses: &[SolicitationStatus::Required],
        newest_first: false,
    },
    StatusBucket {
        statuses: &[SolicitationStatus::New],
        newest_first: false,
    },
    StatusBucket {
        statuses: &[SolicitationStatus::Contested],
        newest_first: false,
    },
    StatusBucket {
        statuses: &[
            SolicitationStatus::Blocked,
            SolicitationStatus::Executed,
            SolicitationStatus::Canceled,
        ],
        newest_first: true,
    },
];

/// 查看方所属侧的排序视图
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortView {
    Operator,
    Transmission,
}

impl SortView {
    pub fn for_company(company_code: &str) -> Self {
        if company_code == "ONS" {
            SortView::Operator
        } else {
            SortView::Transmission
        }
    }

    pub fn buckets(&self) -> &'static [StatusBucket] {
        match self {
            SortView::Operator => OPERATOR_BUCKETS,
            SortView::Transmission => TRANSMISSION_BUCKETS,
        }
    }
}

// ==========================================
// 列表过滤 / 分页
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolicitationFilter {
    pub company_code: Option<String>,
    pub substations: Vec<String>,
    pub table_code: Option<String>,
    pub exclude_expired: bool, // 排除当前状态为 LATE 的申请
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub from_id: Option<i64>,
    pub limit: usize,
}
