// ==========================================
// 电压控制申请系统 - 申请事件日志仓储
// ==========================================
// 表: voltage_control_solicitation (信封) + solicitation_event (事件)
// 红线: 信封不可变, 事件只追加, 当前状态永远由事件推导
// ==========================================

mod core;
mod queries;


pub use core::SolicitationRepository;
