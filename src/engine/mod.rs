// ==========================================
// 电压控制申请系统 - 引擎层
// ==========================================
// 职责: 参数校验、状态迁移判定、协作者 trait
// 红线: Engine 不拼 SQL, 不做 I/O
// ==========================================

pub mod clock;
pub mod directory;
pub mod events;
pub mod transition;
pub mod validator;

// 重导出核心引擎
pub use clock::{Clock, ManualClock, SystemClock};
pub use directory::{DirectoryError, IdentityDirectory, SubstationDirectory};
pub use events::{
    BroadcastNotificationBus, NoOpNotificationBus, NotificationBus, SolicitationNotification,
    SOLICITATION_STREAM_KEY,
};
pub use transition::{TransitionAuthority, TransitionError, TransitionRole};
pub use validator::{EquipmentValidator, RawSolicitation, ValidationError};
