//! 预订事件转发器
//!
//! BookingManager 在自己的 broadcast 通道上发布领域事件，
//! 转发器订阅该通道并将每个事件包装成 Booking 帧发到总线，
//! 再由 WebSocket 层推送给客户端。
//!
//! ```text
//! BookingManager ──▶ broadcast<BookingEvent> ──▶ EventForwarder ──▶ MessageBus
//! ```

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use shared::booking::BookingEvent;
use shared::message::BusMessage;

use super::MessageBus;

/// 事件转发器
///
/// 长驻后台任务，生命周期跟随总线的关闭令牌。
pub struct EventForwarder {
    receiver: broadcast::Receiver<BookingEvent>,
    bus: MessageBus,
    shutdown_token: CancellationToken,
}

impl EventForwarder {
    /// 创建转发器
    ///
    /// `receiver` 来自 `BookingManager::subscribe()`。
    pub fn new(receiver: broadcast::Receiver<BookingEvent>, bus: MessageBus) -> Self {
        let shutdown_token = bus.shutdown_token().clone();
        Self {
            receiver,
            bus,
            shutdown_token,
        }
    }

    /// 开始转发事件
    ///
    /// This is a long-running task that should be spawned in the background.
    pub async fn run(mut self) {
        tracing::info!("Event forwarder started");

        loop {
            tokio::select! {
                // Listen for shutdown signal
                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Event forwarder shutting down");
                    break;
                }

                // Receive domain events from the manager
                event_result = self.receiver.recv() => {
                    match event_result {
                        Ok(event) => {
                            tracing::debug!(
                                event_type = %event.event_type,
                                event_id = %event.event_id,
                                "Forwarding booking event"
                            );
                            if let Err(e) = self.bus.publish(BusMessage::booking(&event)).await {
                                tracing::error!("Failed to forward booking event: {}", e);
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!("Event forwarder lagged, skipped {} events", skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            tracing::info!("Booking event channel closed");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!("Event forwarder stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::booking::{BookingEventPayload, BookingEventType};
    use shared::message::EventType;

    #[tokio::test]
    async fn test_forwards_booking_events_to_bus() {
        let (tx, rx) = broadcast::channel(16);
        let bus = MessageBus::new();
        let mut bus_rx = bus.subscribe();

        let forwarder = EventForwarder::new(rx, bus.clone());
        tokio::spawn(forwarder.run());

        let event = BookingEvent::new(
            "users:alice".to_string(),
            "Alice".to_string(),
            BookingEventType::BookingCancelled,
            BookingEventPayload::BookingCancelled {
                booking_id: "bookings:b1".to_string(),
                slot_id: "slots:s1".to_string(),
                slot_released: true,
            },
        );
        tx.send(event.clone()).unwrap();

        let frame = bus_rx.recv().await.unwrap();
        assert_eq!(frame.event_type, EventType::Booking);

        let forwarded: BookingEvent = frame.parse_payload().unwrap();
        assert_eq!(forwarded.event_id, event.event_id);

        bus.shutdown();
    }

    #[tokio::test]
    async fn test_stops_when_manager_channel_closes() {
        let (tx, rx) = broadcast::channel::<BookingEvent>(16);
        let bus = MessageBus::new();

        let forwarder = EventForwarder::new(rx, bus);
        let handle = tokio::spawn(forwarder.run());

        drop(tx);
        // The run loop should exit on Closed rather than spinning
        handle.await.unwrap();
    }
}
