//! 消息总线消息类型定义
//!
//! 这些类型在 booking-server 和 clients 之间共享。事件流是单向的：
//! 服务端产生，客户端消费。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use uuid::Uuid;

pub mod payload;
pub use payload::*;

/// 协议版本号
pub const PROTOCOL_VERSION: u16 = 1;

/// 事件流消息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// 连接建立后的欢迎帧（携带各集合当前版本号）
    Welcome = 0,
    /// 系统通知
    Notification = 1,
    /// 同步信号（集合变更）
    Sync = 2,
    /// 预订领域事件
    Booking = 3,
}

impl TryFrom<u8> for EventType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventType::Welcome),
            1 => Ok(EventType::Notification),
            2 => Ok(EventType::Sync),
            3 => Ok(EventType::Booking),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Welcome => write!(f, "welcome"),
            EventType::Notification => write!(f, "notification"),
            EventType::Sync => write!(f, "sync"),
            EventType::Booking => write!(f, "booking"),
        }
    }
}

/// 消息总线消息体
///
/// payload 为 JSON 字节，按 event_type 解析为具体载荷类型。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub request_id: Uuid,
    pub event_type: EventType,
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(event_type: EventType, payload: Vec<u8>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            event_type,
            payload,
        }
    }

    /// 创建欢迎帧消息
    pub fn welcome(payload: &WelcomePayload) -> Self {
        Self::new(
            EventType::Welcome,
            serde_json::to_vec(payload).expect("Failed to serialize welcome payload"),
        )
    }

    /// 创建通知消息
    pub fn notification(payload: &NotificationPayload) -> Self {
        Self::new(
            EventType::Notification,
            serde_json::to_vec(payload).expect("Failed to serialize notification"),
        )
    }

    /// 创建同步信号消息
    pub fn sync(payload: &SyncPayload) -> Self {
        Self::new(
            EventType::Sync,
            serde_json::to_vec(payload).expect("Failed to serialize sync payload"),
        )
    }

    /// 创建预订事件消息
    pub fn booking(event: &crate::booking::BookingEvent) -> Self {
        Self::new(
            EventType::Booking,
            serde_json::to_vec(event).expect("Failed to serialize booking event"),
        )
    }

    /// 解析载荷为指定类型
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }

    /// 转换为发给 WebSocket 客户端的 JSON 文本帧
    ///
    /// ```json
    /// { "type": "sync", "request_id": "...", "payload": { ... } }
    /// ```
    pub fn to_frame_json(&self) -> Result<String, serde_json::Error> {
        let payload: serde_json::Value = serde_json::from_slice(&self.payload)?;
        let frame = serde_json::json!({
            "type": self.event_type.to_string(),
            "request_id": self.request_id,
            "payload": payload,
        });
        serde_json::to_string(&frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_message_roundtrip() {
        let payload = SyncPayload {
            resource: "slots".to_string(),
            version: 42,
            action: "updated".to_string(),
            id: "slots:abc".to_string(),
            data: None,
        };

        let msg = BusMessage::sync(&payload);
        assert_eq!(msg.event_type, EventType::Sync);
        assert!(!msg.request_id.is_nil());

        let parsed: SyncPayload = msg.parse_payload().unwrap();
        assert_eq!(parsed, payload);
    }

    #[test]
    fn test_frame_json_shape() {
        let msg = BusMessage::notification(&NotificationPayload::info("Test", "Hello"));
        let frame = msg.to_frame_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();

        assert_eq!(value["type"], "notification");
        assert_eq!(value["payload"]["title"], "Test");
    }

    #[test]
    fn test_event_type_from_u8() {
        assert_eq!(EventType::try_from(2u8), Ok(EventType::Sync));
        assert!(EventType::try_from(9u8).is_err());
    }
}
