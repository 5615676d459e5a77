// ==========================================
// 电压控制申请系统 - 领域类型定义
// ==========================================
// 设备类型 / 操作 / 电压等级 / 公司 / 申请状态
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 设备类型 (Equipment Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EquipmentType {
    Capacitor,   // 电容器
    Reactor,     // 电抗器
    Transformer, // 变压器
    Synchronous, // 同步调相机
}

impl EquipmentType {
    pub const ALL: [EquipmentType; 4] = [
        EquipmentType::Capacitor,
        EquipmentType::Reactor,
        EquipmentType::Transformer,
        EquipmentType::Synchronous,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentType::Capacitor => "CAPACITOR",
            EquipmentType::Reactor => "REACTOR",
            EquipmentType::Transformer => "TRANSFORMER",
            EquipmentType::Synchronous => "SYNCHRONOUS",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.as_str() == s)
    }

    /// 该设备允许的操作集合
    pub fn allowed_actions(&self) -> &'static [SolicitationAction] {
        use SolicitationAction::*;
        match self {
            EquipmentType::Capacitor | EquipmentType::Reactor => &[TurnOn, TurnOff],
            EquipmentType::Transformer => &[Rise, Reduce, Adjust, AdjustForTape],
            EquipmentType::Synchronous => &[Maximize, Reset, Minimize, Adjust],
        }
    }
}

impl fmt::Display for EquipmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 申请操作 (Action)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolicitationAction {
    TurnOn,
    TurnOff,
    Rise,
    Reduce,
    Adjust,
    AdjustForTape,
    Maximize,
    Reset,
    Minimize,
}

impl SolicitationAction {
    pub const ALL: [SolicitationAction; 9] = [
        SolicitationAction::TurnOn,
        SolicitationAction::TurnOff,
        SolicitationAction::Rise,
        SolicitationAction::Reduce,
        SolicitationAction::Adjust,
        SolicitationAction::AdjustForTape,
        SolicitationAction::Maximize,
        SolicitationAction::Reset,
        SolicitationAction::Minimize,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SolicitationAction::TurnOn => "TURN_ON",
            SolicitationAction::TurnOff => "TURN_OFF",
            SolicitationAction::Rise => "RISE",
            SolicitationAction::Reduce => "REDUCE",
            SolicitationAction::Adjust => "ADJUST",
            SolicitationAction::AdjustForTape => "ADJUST_FOR_TAPE",
            SolicitationAction::Maximize => "MAXIMIZE",
            SolicitationAction::Reset => "RESET",
            SolicitationAction::Minimize => "MINIMIZE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.as_str() == s)
    }
}

impl fmt::Display for SolicitationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 电压等级 (Voltage Level)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoltageLevel {
    #[serde(rename = "500kV")]
    Kv500,
    #[serde(rename = "440kV")]
    Kv440,
    #[serde(rename = "230kV")]
    Kv230,
    #[serde(rename = "138kV")]
    Kv138,
    #[serde(rename = "88kV")]
    Kv88,
}

impl VoltageLevel {
    pub const ALL: [VoltageLevel; 5] = [
        VoltageLevel::Kv500,
        VoltageLevel::Kv440,
        VoltageLevel::Kv230,
        VoltageLevel::Kv138,
        VoltageLevel::Kv88,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VoltageLevel::Kv500 => "500kV",
            VoltageLevel::Kv440 => "440kV",
            VoltageLevel::Kv230 => "230kV",
            VoltageLevel::Kv138 => "138kV",
            VoltageLevel::Kv88 => "88kV",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == s)
    }
}

impl fmt::Display for VoltageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 公司 (Company)
// ==========================================
// ONS: 调度方 (发起申请)
// CTEEP / CHESF: 输电公司 (审核执行)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Company {
    Ons,
    Cteep,
    Chesf,
}

impl Company {
    pub const ALL: [Company; 3] = [Company::Ons, Company::Cteep, Company::Chesf];

    pub fn as_str(&self) -> &'static str {
        match self {
            Company::Ons => "ONS",
            Company::Cteep => "CTEEP",
            Company::Chesf => "CHESF",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == s)
    }

    pub fn is_operator(&self) -> bool {
        matches!(self, Company::Ons)
    }
}

impl fmt::Display for Company {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 申请状态 (Solicitation Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolicitationStatus {
    New,       // 新建
    Accepted,  // 已接受
    Executed,  // 已执行
    Blocked,   // 已阻止
    Contested, // 已质疑
    Canceled,  // 已取消
    Required,  // 重新要求
    Late,      // 已超时
}

impl SolicitationStatus {
    pub const ALL: [SolicitationStatus; 8] = [
        SolicitationStatus::New,
        SolicitationStatus::Accepted,
        SolicitationStatus::Executed,
        SolicitationStatus::Blocked,
        SolicitationStatus::Contested,
        SolicitationStatus::Canceled,
        SolicitationStatus::Required,
        SolicitationStatus::Late,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SolicitationStatus::New => "NEW",
            SolicitationStatus::Accepted => "ACCEPTED",
            SolicitationStatus::Executed => "EXECUTED",
            SolicitationStatus::Blocked => "BLOCKED",
            SolicitationStatus::Contested => "CONTESTED",
            SolicitationStatus::Canceled => "CANCELED",
            SolicitationStatus::Required => "REQUIRED",
            SolicitationStatus::Late => "LATE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|st| st.as_str() == s)
    }
}

impl fmt::Display for SolicitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 列表排序提示 (Sort Param)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortParam {
    Status,
    CreationTime,
    Substation,
}

impl SortParam {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortParam::Status => "status",
            SortParam::CreationTime => "creation_time",
            SortParam::Substation => "substation",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "status" => Some(SortParam::Status),
            "creation_time" => Some(SortParam::CreationTime),
            "substation" => Some(SortParam::Substation),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_names() {
        for st in SolicitationStatus::ALL {
            assert_eq!(SolicitationStatus::from_str(st.as_str()), Some(st));
        }
        assert_eq!(SolicitationStatus::from_str("NOT_ANSWERED"), None);
        assert_eq!(SolicitationStatus::from_str("accepted"), None);
    }

    #[test]
    fn test_voltage_level_serde_names() {
        let json = serde_json::to_string(&VoltageLevel::Kv138).unwrap();
        assert_eq!(json, "\"138kV\"");
        assert_eq!(VoltageLevel::from_str("88kV"), Some(VoltageLevel::Kv88));
        assert_eq!(VoltageLevel::from_str("69kV"), None);
    }

    #[test]
    fn test_allowed_actions_per_equipment() {
        assert!(EquipmentType::Reactor
            .allowed_actions()
            .contains(&SolicitationAction::TurnOn));
        assert!(!EquipmentType::Transformer
            .allowed_actions()
            .contains(&SolicitationAction::TurnOff));
        assert!(EquipmentType::Synchronous
            .allowed_actions()
            .contains(&SolicitationAction::Adjust));
        assert!(EquipmentType::Transformer
            .allowed_actions()
            .contains(&SolicitationAction::AdjustForTape));
    }

    #[test]
    fn test_company_roles() {
        assert!(Company::Ons.is_operator());
        assert!(!Company::Cteep.is_operator());
        assert_eq!(Company::from_str("CHESF"), Some(Company::Chesf));
        assert_eq!(Company::from_str("XYZ"), None);
    }
}
