// ==========================================
// 电压控制申请系统 - 通知总线
// ==========================================
// 职责: 定义申请变更通知 trait，实现依赖倒置
// 说明: 引擎只发布 (stream_key, token, recipients)，投递由外部完成
// ==========================================

use serde::{Deserialize, Serialize};
use std::error::Error;
use tokio::sync::broadcast;

/// 申请更新流的流标识
pub const SOLICITATION_STREAM_KEY: &str = "voltage_control_solicitation_key";

// ==========================================
// 通知
// ==========================================

/// 申请变更通知
///
/// token 为更新流的 stream_id，消费方据此增量同步
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolicitationNotification {
    pub stream_key: String,
    pub token: i64,
    /// 接收人列表（None 表示全部在线用户）
    pub recipients: Option<Vec<String>>,
}

impl SolicitationNotification {
    pub fn new(token: i64, recipients: Option<Vec<String>>) -> Self {
        Self {
            stream_key: SOLICITATION_STREAM_KEY.to_string(),
            token,
            recipients,
        }
    }
}

// ==========================================
// 通知总线 Trait
// ==========================================

/// 通知总线 Trait
///
/// 发布失败只记录日志，不回滚已持久化的状态
pub trait NotificationBus: Send + Sync {
    fn publish(
        &self,
        notification: SolicitationNotification,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作通知总线
#[derive(Debug, Clone, Default)]
pub struct NoOpNotificationBus;

impl NotificationBus for NoOpNotificationBus {
    fn publish(
        &self,
        notification: SolicitationNotification,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpNotificationBus: 跳过通知 - stream_key={}, token={}",
            notification.stream_key,
            notification.token
        );
        Ok(())
    }
}

/// 进程内广播通知总线
///
/// 没有订阅者时发布返回错误
#[derive(Debug, Clone)]
pub struct BroadcastNotificationBus {
    sender: broadcast::Sender<SolicitationNotification>,
}

impl BroadcastNotificationBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SolicitationNotification> {
        self.sender.subscribe()
    }
}

impl NotificationBus for BroadcastNotificationBus {
    fn publish(
        &self,
        notification: SolicitationNotification,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let receivers = self.sender.send(notification)?;
        tracing::debug!("通知已广播: receivers={}", receivers);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_bus() {
        let bus = NoOpNotificationBus;
        assert!(bus.publish(SolicitationNotification::new(1, None)).is_ok());
    }

    #[test]
    fn test_broadcast_bus_delivers_to_subscriber() {
        let bus = BroadcastNotificationBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(SolicitationNotification::new(
            42,
            Some(vec!["user_cteep".to_string()]),
        ))
        .unwrap();

        let received = rx.try_recv().unwrap();
        assert_eq!(received.token, 42);
        assert_eq!(received.stream_key, SOLICITATION_STREAM_KEY);
        assert_eq!(received.recipients.unwrap(), vec!["user_cteep".to_string()]);
    }

    #[test]
    fn test_broadcast_bus_without_subscribers_fails() {
        let bus = BroadcastNotificationBus::new(8);
        assert!(bus.publish(SolicitationNotification::new(1, None)).is_err());
    }
}
