//! 事件总线与事件转发
//!
//! ```text
//! ┌──────────────────┐     ┌────────────────┐     ┌──────────────┐
//! │  BookingManager  │ ──▶ │ EventForwarder │ ──▶ │  MessageBus  │
//! └──────────────────┘     └────────────────┘     └──────┬───────┘
//!                                                        │ subscribe()
//!        broadcast_sync() ───────────────────────────────┤
//!                                                        ▼
//!                                               WebSocket handlers
//! ```
//!
//! 总线上承载三类帧：
//! - `welcome`: 连接建立后的版本快照
//! - `sync`: 集合变更信号 (resources / slots / bookings / users)
//! - `booking`: 预订领域事件 (由 EventForwarder 转发)

pub mod bus;
pub mod forwarder;

pub use bus::{ConnectedClient, MessageBus, DEFAULT_CHANNEL_CAPACITY};
pub use forwarder::EventForwarder;
pub use shared::message::{
    BusMessage, EventType, NotificationPayload, SyncPayload, WelcomePayload,
};
