// ==========================================
// 电压控制申请系统 - 设备参数校验引擎
// ==========================================
// 流程: normalize (清除无关字段) → parse (类型化) → validate (按设备)
// 红线: 纯函数, 无 I/O
// ==========================================

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::domain::{
    EquipmentType, NewSolicitation, SolicitationAction, SolicitationParams, VoltageLevel,
};

/// ADJUST_FOR_TAPE 允许的最小分接头调整量
pub const TAPE_ADJUST_MIN_AMOUNT: i64 = -100_000;

/// 常规操作的最小数量
pub const DEFAULT_MIN_AMOUNT: i64 = 1;

// ==========================================
// ValidationError - 参数校验错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub equipment: String,
}

impl ValidationError {
    fn invalid_equipment(equipment: &str) -> Self {
        Self {
            message: format!("Invalid equipment type '{}'.", equipment),
            equipment: equipment.to_string(),
        }
    }

    fn invalid_action(equipment: EquipmentType) -> Self {
        Self::with(equipment, "Invalid action for equipment type '{}'.")
    }

    fn invalid_amount(equipment: EquipmentType) -> Self {
        Self::with(equipment, "Invalid amount value for equipment type '{}'.")
    }

    fn missing_voltage(equipment: EquipmentType) -> Self {
        Self::with(equipment, "Voltage value must be informed for '{}'.")
    }

    fn invalid_voltage(equipment: EquipmentType) -> Self {
        Self::with(equipment, "Invalid voltage value for equipment type '{}'.")
    }

    fn missing_staggered(equipment: EquipmentType) -> Self {
        Self::with(equipment, "Staggered value must be informed for '{}'.")
    }

    fn with(equipment: EquipmentType, template: &str) -> Self {
        Self {
            message: template.replace("{}", equipment.as_str()),
            equipment: equipment.as_str().to_string(),
        }
    }
}

// ==========================================
// RawSolicitation - 未校验的请求项
// ==========================================
// 参数字段保持原始 JSON, 缺省为 Null
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSolicitation {
    #[serde(default)]
    pub equipment: String,
    #[serde(default)]
    pub action: String,
    #[serde(default, alias = "substation_code")]
    pub substation: String,
    #[serde(default)]
    pub company_code: String,
    #[serde(default)]
    pub amount: JsonValue,
    #[serde(default)]
    pub voltage: JsonValue,
    #[serde(default)]
    pub staggered: JsonValue,
    #[serde(default, alias = "at")]
    pub voltage_primary: JsonValue,
    #[serde(default, alias = "bt")]
    pub voltage_secondary: JsonValue,
}

/// 规范化后的参数字段 (无关字段为 Null)
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFields {
    pub amount: JsonValue,
    pub voltage: JsonValue,
    pub staggered: JsonValue,
    pub voltage_primary: JsonValue,
    pub voltage_secondary: JsonValue,
}

/// 单字段解析结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parsed<T> {
    Absent,
    Value(T),
    Malformed,
}

// ==========================================
// normalize - 按设备清除无关字段
// ==========================================
pub fn normalize(
    equipment: EquipmentType,
    action: SolicitationAction,
    raw: &RawSolicitation,
) -> NormalizedFields {
    let keep = |v: &JsonValue| -> JsonValue {
        match v {
            JsonValue::String(s) if s.trim().is_empty() => JsonValue::Null,
            other => other.clone(),
        }
    };

    match equipment {
        EquipmentType::Reactor | EquipmentType::Capacitor => NormalizedFields {
            amount: keep(&raw.amount),
            voltage: keep(&raw.voltage),
            staggered: keep(&raw.staggered),
            voltage_primary: JsonValue::Null,
            voltage_secondary: JsonValue::Null,
        },
        EquipmentType::Transformer => NormalizedFields {
            amount: keep(&raw.amount),
            voltage: keep(&raw.voltage),
            staggered: JsonValue::Null,
            voltage_primary: keep(&raw.voltage_primary),
            voltage_secondary: keep(&raw.voltage_secondary),
        },
        EquipmentType::Synchronous => NormalizedFields {
            amount: if action == SolicitationAction::Adjust {
                keep(&raw.amount)
            } else {
                JsonValue::Null
            },
            voltage: JsonValue::Null,
            staggered: JsonValue::Null,
            voltage_primary: JsonValue::Null,
            voltage_secondary: JsonValue::Null,
        },
    }
}

// ==========================================
// parse - 字段类型化
// ==========================================

/// 数量: JSON 整数, 或 (可带符号的) 纯数字字符串
pub fn parse_amount(value: &JsonValue) -> Parsed<i64> {
    match value {
        JsonValue::Null => Parsed::Absent,
        JsonValue::Number(n) => match n.as_i64() {
            Some(v) => Parsed::Value(v),
            None => Parsed::Malformed,
        },
        JsonValue::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Parsed::Absent;
            }
            let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Parsed::Malformed;
            }
            match s.parse::<i64>() {
                Ok(v) => Parsed::Value(v),
                Err(_) => Parsed::Malformed,
            }
        }
        _ => Parsed::Malformed,
    }
}

pub fn parse_voltage(value: &JsonValue) -> Parsed<VoltageLevel> {
    match value {
        JsonValue::Null => Parsed::Absent,
        JsonValue::String(s) if s.trim().is_empty() => Parsed::Absent,
        JsonValue::String(s) => match VoltageLevel::from_str(s.trim()) {
            Some(level) => Parsed::Value(level),
            None => Parsed::Malformed,
        },
        _ => Parsed::Malformed,
    }
}

/// 分组投切标志: JSON 布尔, 或 "true"/"false"
pub fn parse_staggered(value: &JsonValue) -> Parsed<bool> {
    match value {
        JsonValue::Null => Parsed::Absent,
        JsonValue::Bool(b) => Parsed::Value(*b),
        JsonValue::String(s) => match s.trim() {
            "" => Parsed::Absent,
            "true" => Parsed::Value(true),
            "false" => Parsed::Value(false),
            _ => Parsed::Malformed,
        },
        _ => Parsed::Malformed,
    }
}

// ==========================================
// EquipmentValidator - 设备参数校验器
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct EquipmentValidator;

impl EquipmentValidator {
    pub fn new() -> Self {
        Self
    }

    /// 校验单个请求项
    ///
    /// 检查顺序: 设备类型 → 操作 → 按设备规则
    pub fn validate(&self, raw: &RawSolicitation) -> Result<NewSolicitation, ValidationError> {
        let equipment = EquipmentType::from_str(raw.equipment.trim())
            .ok_or_else(|| ValidationError::invalid_equipment(&raw.equipment))?;

        let action = SolicitationAction::from_str(raw.action.trim())
            .filter(|a| equipment.allowed_actions().contains(a))
            .ok_or_else(|| ValidationError::invalid_action(equipment))?;

        let fields = normalize(equipment, action, raw);

        let params = match equipment {
            EquipmentType::Reactor | EquipmentType::Capacitor => {
                Self::validate_switched(equipment, &fields)?
            }
            EquipmentType::Transformer => Self::validate_transformer(action, &fields)?,
            EquipmentType::Synchronous => Self::validate_synchronous(action, &fields)?,
        };

        Ok(NewSolicitation {
            equipment,
            action,
            substation_code: raw.substation.trim().to_string(),
            company_code: raw.company_code.trim().to_string(),
            params,
        })
    }

    fn validate_switched(
        equipment: EquipmentType,
        fields: &NormalizedFields,
    ) -> Result<SolicitationParams, ValidationError> {
        let amount = Self::required_amount(equipment, &fields.amount, DEFAULT_MIN_AMOUNT)?;

        let voltage = match parse_voltage(&fields.voltage) {
            Parsed::Absent => None,
            Parsed::Value(level) => Some(level),
            Parsed::Malformed => return Err(ValidationError::invalid_voltage(equipment)),
        };

        let staggered = match parse_staggered(&fields.staggered) {
            Parsed::Value(b) => b,
            Parsed::Absent | Parsed::Malformed => {
                return Err(ValidationError::missing_staggered(equipment))
            }
        };

        Ok(SolicitationParams::Switched {
            amount,
            staggered,
            voltage,
        })
    }

    fn validate_transformer(
        action: SolicitationAction,
        fields: &NormalizedFields,
    ) -> Result<SolicitationParams, ValidationError> {
        let equipment = EquipmentType::Transformer;

        let voltage = match parse_voltage(&fields.voltage) {
            Parsed::Absent => return Err(ValidationError::missing_voltage(equipment)),
            Parsed::Value(level) => level,
            Parsed::Malformed => return Err(ValidationError::invalid_voltage(equipment)),
        };

        let min = if action == SolicitationAction::AdjustForTape {
            TAPE_ADJUST_MIN_AMOUNT
        } else {
            DEFAULT_MIN_AMOUNT
        };
        let amount = Self::required_amount(equipment, &fields.amount, min)?;

        let optional_level = |value: &JsonValue| match parse_voltage(value) {
            Parsed::Absent => Ok(None),
            Parsed::Value(level) => Ok(Some(level)),
            Parsed::Malformed => Err(ValidationError::invalid_voltage(equipment)),
        };
        let voltage_primary = optional_level(&fields.voltage_primary)?;
        let voltage_secondary = optional_level(&fields.voltage_secondary)?;

        Ok(SolicitationParams::Transformer {
            amount,
            voltage,
            voltage_primary,
            voltage_secondary,
        })
    }

    fn validate_synchronous(
        action: SolicitationAction,
        fields: &NormalizedFields,
    ) -> Result<SolicitationParams, ValidationError> {
        let amount = if action == SolicitationAction::Adjust {
            Some(Self::required_amount(
                EquipmentType::Synchronous,
                &fields.amount,
                DEFAULT_MIN_AMOUNT,
            )?)
        } else {
            None
        };
        Ok(SolicitationParams::Synchronous { amount })
    }

    // 非整数与越界共用同一错误
    fn required_amount(
        equipment: EquipmentType,
        value: &JsonValue,
        min: i64,
    ) -> Result<i64, ValidationError> {
        match parse_amount(value) {
            Parsed::Value(v) if v >= min => Ok(v),
            _ => Err(ValidationError::invalid_amount(equipment)),
        }
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(equipment: &str, action: &str) -> RawSolicitation {
        RawSolicitation {
            equipment: equipment.to_string(),
            action: action.to_string(),
            substation: "MOS".to_string(),
            company_code: "CTEEP".to_string(),
            ..Default::default()
        }
    }

    fn message(r: &RawSolicitation) -> String {
        EquipmentValidator::new().validate(r).unwrap_err().message
    }

    // ===== 设备 / 操作 =====

    #[test]
    fn test_unknown_equipment() {
        let r = raw("REATOR", "TURN_ON");
        assert_eq!(message(&r), "Invalid equipment type 'REATOR'.");
    }

    #[test]
    fn test_action_not_allowed_for_equipment() {
        let mut r = raw("REACTOR", "RISE");
        r.amount = json!(5);
        r.staggered = json!(true);
        assert_eq!(message(&r), "Invalid action for equipment type 'REACTOR'.");

        let r = raw("SYNCHRONOUS", "TURN_ON");
        assert_eq!(message(&r), "Invalid action for equipment type 'SYNCHRONOUS'.");
    }

    // ===== 电抗器 / 电容器 =====

    #[test]
    fn test_reactor_without_voltage_is_valid() {
        let mut r = raw("REACTOR", "TURN_ON");
        r.amount = json!(5);
        r.staggered = json!(true);
        r.voltage_primary = json!("500kV");

        let v = EquipmentValidator::new().validate(&r).unwrap();
        assert_eq!(
            v.params,
            SolicitationParams::Switched {
                amount: 5,
                staggered: true,
                voltage: None
            }
        );
        assert_eq!(v.params.voltage_primary(), None);
    }

    #[test]
    fn test_capacitor_rules() {
        let mut r = raw("CAPACITOR", "TURN_OFF");
        r.amount = json!("2");
        r.staggered = json!(false);
        r.voltage = json!("138kV");
        let v = EquipmentValidator::new().validate(&r).unwrap();
        assert_eq!(v.params.voltage(), Some(VoltageLevel::Kv138));
        assert_eq!(v.params.amount(), Some(2));

        r.amount = json!(0);
        assert_eq!(message(&r), "Invalid amount value for equipment type 'CAPACITOR'.");

        r.amount = json!(1);
        r.voltage = json!("550kV");
        assert_eq!(message(&r), "Invalid voltage value for equipment type 'CAPACITOR'.");

        r.voltage = json!("");
        r.staggered = JsonValue::Null;
        assert_eq!(message(&r), "Staggered value must be informed for 'CAPACITOR'.");
    }

    // ===== 变压器 =====

    #[test]
    fn test_transformer_requires_voltage() {
        let mut r = raw("TRANSFORMER", "RISE");
        r.amount = json!(2);
        assert_eq!(message(&r), "Voltage value must be informed for 'TRANSFORMER'.");

        r.voltage = json!("69kV");
        assert_eq!(message(&r), "Invalid voltage value for equipment type 'TRANSFORMER'.");
    }

    #[test]
    fn test_transformer_tape_adjust_allows_negative_amount() {
        let mut r = raw("TRANSFORMER", "ADJUST_FOR_TAPE");
        r.amount = json!(-500);
        r.voltage = json!("230kV");
        r.staggered = json!(true);
        let v = EquipmentValidator::new().validate(&r).unwrap();
        assert_eq!(v.params.amount(), Some(-500));
        assert_eq!(v.params.staggered(), None);

        r.amount = json!(-100_001);
        assert_eq!(message(&r), "Invalid amount value for equipment type 'TRANSFORMER'.");

        r.action = "RISE".to_string();
        r.amount = json!(-500);
        assert_eq!(message(&r), "Invalid amount value for equipment type 'TRANSFORMER'.");
    }

    #[test]
    fn test_transformer_primary_secondary_levels() {
        let mut r = raw("TRANSFORMER", "ADJUST");
        r.amount = json!(1);
        r.voltage = json!("440kV");
        r.voltage_primary = json!("440kV");
        r.voltage_secondary = json!("138kV");
        let v = EquipmentValidator::new().validate(&r).unwrap();
        assert_eq!(v.params.voltage_primary(), Some(VoltageLevel::Kv440));
        assert_eq!(v.params.voltage_secondary(), Some(VoltageLevel::Kv138));

        r.voltage_secondary = json!("13kV");
        assert_eq!(message(&r), "Invalid voltage value for equipment type 'TRANSFORMER'.");
    }

    #[test]
    fn test_transformer_at_bt_aliases() {
        let r: RawSolicitation = serde_json::from_value(json!({
            "equipment": "TRANSFORMER",
            "action": "REDUCE",
            "substation": "MOS",
            "company_code": "CTEEP",
            "amount": "3",
            "voltage": "500kV",
            "at": "500kV",
            "bt": "230kV"
        }))
        .unwrap();
        let v = EquipmentValidator::new().validate(&r).unwrap();
        assert_eq!(v.params.voltage_secondary(), Some(VoltageLevel::Kv230));
    }

    // ===== 同步调相机 =====

    #[test]
    fn test_synchronous_amount_only_for_adjust() {
        let mut r = raw("SYNCHRONOUS", "RESET");
        r.amount = json!("");
        r.voltage = json!("500kV");
        let v = EquipmentValidator::new().validate(&r).unwrap();
        assert_eq!(v.params, SolicitationParams::Synchronous { amount: None });

        r.amount = json!("garbage");
        let v = EquipmentValidator::new().validate(&r).unwrap();
        assert_eq!(v.params.amount(), None);

        r.action = "ADJUST".to_string();
        r.amount = json!("");
        assert_eq!(message(&r), "Invalid amount value for equipment type 'SYNCHRONOUS'.");

        r.amount = json!(-151);
        assert_eq!(message(&r), "Invalid amount value for equipment type 'SYNCHRONOUS'.");

        r.amount = json!(10);
        let v = EquipmentValidator::new().validate(&r).unwrap();
        assert_eq!(v.params.amount(), Some(10));
    }

    // ===== 数量解析 =====

    #[test]
    fn test_parse_amount_coercion() {
        assert_eq!(parse_amount(&json!(1)), Parsed::Value(1));
        assert_eq!(parse_amount(&json!("1")), Parsed::Value(1));
        assert_eq!(parse_amount(&json!(" -7 ")), Parsed::Value(-7));
        assert_eq!(parse_amount(&json!("+3")), Parsed::Value(3));
        assert_eq!(parse_amount(&json!("1.0")), Parsed::Malformed);
        assert_eq!(parse_amount(&json!(1.0)), Parsed::Malformed);
        assert_eq!(parse_amount(&json!("5a")), Parsed::Malformed);
        assert_eq!(parse_amount(&json!("-")), Parsed::Malformed);
        assert_eq!(parse_amount(&json!(true)), Parsed::Malformed);
        assert_eq!(parse_amount(&json!([1])), Parsed::Malformed);
        assert_eq!(parse_amount(&json!("")), Parsed::Absent);
        assert_eq!(parse_amount(&JsonValue::Null), Parsed::Absent);
    }

    #[test]
    fn test_non_numeric_amount_same_error_as_out_of_range() {
        let mut r = raw("REACTOR", "TURN_ON");
        r.staggered = json!(true);
        r.amount = json!("abc");
        let malformed = message(&r);
        r.amount = json!(-5);
        let out_of_range = message(&r);
        assert_eq!(malformed, out_of_range);
    }

    #[test]
    fn test_normalize_is_pure_and_idempotent() {
        let mut r = raw("SYNCHRONOUS", "MAXIMIZE");
        r.amount = json!(4);
        r.staggered = json!(true);
        let before = r.clone();
        let n = normalize(EquipmentType::Synchronous, SolicitationAction::Maximize, &r);
        assert_eq!(r, before);
        assert_eq!(n.amount, JsonValue::Null);
        assert_eq!(n.staggered, JsonValue::Null);
    }
}
