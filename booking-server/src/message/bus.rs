//! 事件总线核心实现
//!
//! # 架构
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     MessageBus                           │
//! │  ┌───────────────────────────────────────────────────┐  │
//! │  │  broadcast::Sender<BusMessage>                    │  │
//! │  └───────────────────────────────────────────────────┘  │
//! └────────────────────────┬────────────────────────────────┘
//!                          │ subscribe()
//!              ┌───────────┼───────────┐
//!              ▼           ▼           ▼
//!          WS client   WS client   WS client
//! ```
//!
//! 事件流是单向的：服务端 publish，客户端经 WebSocket 消费。
//! 客户端不向总线写消息，所有写操作走 HTTP API。

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use shared::message::BusMessage;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::utils::AppError;

/// Capacity of the broadcast channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// 已连接客户端的元数据
///
/// WebSocket 握手通过鉴权后登记，断开时移除。
/// socket 本身由各自的处理任务持有，这里只存描述信息。
#[derive(Debug, Clone, Serialize)]
pub struct ConnectedClient {
    /// 连接 ID (每个 WebSocket 连接唯一)
    pub id: String,
    /// 连接所属用户 ID
    pub user_id: String,
    /// 用户显示名
    pub name: String,
    /// 连接建立时间 (RFC3339)
    pub connected_at: String,
}

/// 事件总线 - 负责服务端事件的扇出
///
/// # 职责
///
/// - 事件广播 (publish)
/// - 订阅管理 (subscribe, 每个 WebSocket 连接一个接收端)
/// - 客户端登记 (register_client, remove_client)
#[derive(Debug, Clone)]
pub struct MessageBus {
    /// 服务器到客户端的广播通道
    server_tx: broadcast::Sender<BusMessage>,
    /// 关闭信号令牌
    shutdown_token: CancellationToken,
    /// 已连接的客户端 (连接 ID -> 元数据)
    clients: Arc<DashMap<String, ConnectedClient>>,
}

impl MessageBus {
    /// 创建默认容量的事件总线
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// 创建指定容量的事件总线
    pub fn with_capacity(capacity: usize) -> Self {
        let (server_tx, _) = broadcast::channel(capacity);
        Self {
            server_tx,
            shutdown_token: CancellationToken::new(),
            clients: Arc::new(DashMap::new()),
        }
    }

    /// 发布消息 (服务器 -> 所有订阅者)
    pub async fn publish(&self, msg: BusMessage) -> Result<(), AppError> {
        // 没有任何订阅者时 send 会报错，此时丢弃即可
        if self.server_tx.receiver_count() == 0 {
            return Ok(());
        }
        self.server_tx
            .send(msg)
            .map_err(|e| AppError::internal(e.to_string()))?;
        Ok(())
    }

    /// 订阅服务器广播 (每个 WebSocket 连接调用一次)
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.server_tx.subscribe()
    }

    /// 获取广播发送端 (高级用法)
    pub fn sender(&self) -> &broadcast::Sender<BusMessage> {
        &self.server_tx
    }

    /// 获取关闭令牌 (用于监控关闭信号)
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    /// 登记一个已通过鉴权的 WebSocket 连接
    pub fn register_client(&self, client: ConnectedClient) {
        tracing::debug!(client_id = %client.id, user_id = %client.user_id, "Client registered");
        self.clients.insert(client.id.clone(), client);
    }

    /// 移除断开的连接
    pub fn remove_client(&self, client_id: &str) {
        if self.clients.remove(client_id).is_some() {
            tracing::debug!(client_id = %client_id, "Client removed");
        }
    }

    /// 获取已连接客户端列表
    pub fn connected_clients(&self) -> Vec<ConnectedClient> {
        self.clients.iter().map(|e| e.value().clone()).collect()
    }

    /// 当前连接数
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// 优雅关闭事件总线
    ///
    /// 取消所有运行中的任务，包括事件转发器和 WebSocket 处理循环
    pub fn shutdown(&self) {
        tracing::info!("Shutting down message bus");
        self.shutdown_token.cancel();
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::message::{EventType, NotificationPayload};

    #[tokio::test]
    async fn test_publish_and_subscribe() {
        let bus = MessageBus::new();
        let mut rx = bus.subscribe();

        let payload = NotificationPayload::info("Test", "Hello");
        bus.publish(BusMessage::notification(&payload)).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type, EventType::Notification);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = MessageBus::new();
        let payload = NotificationPayload::info("Nobody", "listening");
        assert!(bus.publish(BusMessage::notification(&payload)).await.is_ok());
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = MessageBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let payload = NotificationPayload::warning("Fanout", "all receivers see this");
        bus.publish(BusMessage::notification(&payload)).await.unwrap();

        assert_eq!(rx1.recv().await.unwrap().event_type, EventType::Notification);
        assert_eq!(rx2.recv().await.unwrap().event_type, EventType::Notification);
    }

    #[test]
    fn test_client_registry() {
        let bus = MessageBus::new();
        bus.register_client(ConnectedClient {
            id: "conn-1".into(),
            user_id: "users:alice".into(),
            name: "Alice".into(),
            connected_at: "2024-01-01T00:00:00.000Z".into(),
        });

        assert_eq!(bus.client_count(), 1);
        assert_eq!(bus.connected_clients()[0].name, "Alice");

        bus.remove_client("conn-1");
        assert_eq!(bus.client_count(), 0);
        // Removing twice is a no-op
        bus.remove_client("conn-1");
    }
}
