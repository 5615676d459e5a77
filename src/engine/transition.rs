// ==========================================
// 电压控制申请系统 - 状态迁移授权引擎
// ==========================================
// 按角色的不可变迁移表, 进程启动时构建一次, 经 Arc 共享
// 判定顺序: 无变化 → 越权 → 非法迁移 → 受理超时
// ==========================================

use std::collections::HashMap;

use thiserror::Error;

use crate::domain::SolicitationStatus;

/// 默认受理时限 (秒)
pub const DEFAULT_ACCEPTANCE_WINDOW_SECS: i64 = 300;

// ==========================================
// TransitionRole - 迁移角色
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionRole {
    Operator,     // ONS
    Transmission, // CTEEP / CHESF
    System,       // 超时扫描 (无操作人)
    Unknown,      // 未识别公司: 空表
}

impl TransitionRole {
    pub fn for_company(company_code: &str) -> Self {
        match company_code {
            "ONS" => TransitionRole::Operator,
            "CTEEP" | "CHESF" => TransitionRole::Transmission,
            _ => TransitionRole::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionRole::Operator => "OPERATOR",
            TransitionRole::Transmission => "TRANSMISSION",
            TransitionRole::System => "SYSTEM",
            TransitionRole::Unknown => "UNKNOWN",
        }
    }
}

// ==========================================
// TransitionError - 迁移拒绝原因
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Solicitation is already in status {0}.")]
    NoOp(SolicitationStatus),

    #[error("Status cannot change from {from} to {to}.")]
    InvalidTransition {
        from: SolicitationStatus,
        to: SolicitationStatus,
    },

    #[error("User is not allowed to change the status to {requested}.")]
    Unauthorized { requested: SolicitationStatus },

    #[error("Solicitation can no longer be accepted: {elapsed}s elapsed, window is {window}s.")]
    Expired { elapsed: i64, window: i64 },
}

type TransitionTable = HashMap<SolicitationStatus, &'static [SolicitationStatus]>;

fn operator_table() -> TransitionTable {
    use SolicitationStatus::*;
    let mut t: TransitionTable = HashMap::new();
    t.insert(New, &[Canceled]);
    t.insert(Blocked, &[Canceled]);
    t.insert(Contested, &[Required, Canceled]);
    t
}

fn transmission_table() -> TransitionTable {
    use SolicitationStatus::*;
    let mut t: TransitionTable = HashMap::new();
    t.insert(New, &[Accepted, Contested, Blocked]);
    t.insert(Accepted, &[Blocked, Executed, Contested]);
    t.insert(Required, &[Accepted]);
    t.insert(Late, &[Executed, Blocked]);
    t
}

fn system_table() -> TransitionTable {
    use SolicitationStatus::*;
    let mut t: TransitionTable = HashMap::new();
    t.insert(Accepted, &[Late]);
    t
}

// ==========================================
// TransitionAuthority - 迁移判定
// ==========================================
#[derive(Debug, Clone)]
pub struct TransitionAuthority {
    tables: HashMap<TransitionRole, TransitionTable>,
    acceptance_window_secs: i64,
}

impl Default for TransitionAuthority {
    fn default() -> Self {
        Self::new(DEFAULT_ACCEPTANCE_WINDOW_SECS)
    }
}

impl TransitionAuthority {
    pub fn new(acceptance_window_secs: i64) -> Self {
        let mut tables = HashMap::new();
        tables.insert(TransitionRole::Operator, operator_table());
        tables.insert(TransitionRole::Transmission, transmission_table());
        tables.insert(TransitionRole::System, system_table());
        tables.insert(TransitionRole::Unknown, TransitionTable::new());

        Self {
            tables,
            acceptance_window_secs,
        }
    }

    pub fn acceptance_window_secs(&self) -> i64 {
        self.acceptance_window_secs
    }

    /// 当前状态下该角色允许的目标状态
    pub fn allowed_targets(
        &self,
        role: TransitionRole,
        current: SolicitationStatus,
    ) -> &'static [SolicitationStatus] {
        self.tables
            .get(&role)
            .and_then(|t| t.get(&current))
            .copied()
            .unwrap_or(&[])
    }

    fn role_can_ever_reach(&self, role: TransitionRole, requested: SolicitationStatus) -> bool {
        self.tables
            .get(&role)
            .map(|t| t.values().any(|targets| targets.contains(&requested)))
            .unwrap_or(false)
    }

    /// 判定一次状态迁移
    ///
    /// # 参数
    /// - created_at: 申请创建时间 (首事件时间, 秒)
    /// - now: 当前时间 (秒)
    pub fn check(
        &self,
        current: SolicitationStatus,
        requested: SolicitationStatus,
        role: TransitionRole,
        created_at: i64,
        now: i64,
    ) -> Result<(), TransitionError> {
        if requested == current {
            return Err(TransitionError::NoOp(current));
        }

        if !self.role_can_ever_reach(role, requested) {
            return Err(TransitionError::Unauthorized { requested });
        }

        if !self.allowed_targets(role, current).contains(&requested) {
            return Err(TransitionError::InvalidTransition {
                from: current,
                to: requested,
            });
        }

        if requested == SolicitationStatus::Accepted {
            let elapsed = now - created_at;
            if elapsed > self.acceptance_window_secs {
                return Err(TransitionError::Expired {
                    elapsed,
                    window: self.acceptance_window_secs,
                });
            }
        }

        Ok(())
    }
}
