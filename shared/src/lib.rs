//! Shared types for the booking platform
//!
//! Wire-level types used by the booking server and its clients: feed
//! message envelopes, sync/notification payloads and booking domain
//! events.

pub mod booking;
pub mod message;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Message bus re-exports (for convenient access)
pub use booking::{BookingEvent, BookingEventType};
pub use message::{BusMessage, EventType};
