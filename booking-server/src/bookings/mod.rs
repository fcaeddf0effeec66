//! Booking Lifecycle Module
//!
//! The single authority over booking state and slot availability:
//!
//! - **manager**: BookingManager, the only code path that flips a slot's
//!   `is_available` flag
//! - **generator**: deterministic slot grid expansion
//! - **error**: manager error types and storage error classification
//!
//! # Architecture
//!
//! ```text
//! Request → BookingManager → Claim transaction (SurrealDB)
//!                 ↓
//!            BookingEvent → Broadcast → WS feed / sync counters
//! ```
//!
//! Handlers never write booking or slot state directly; they go through
//! the manager so every transition is transactional and every committed
//! transition is announced exactly once.

pub mod error;
pub mod generator;
pub mod manager;

// Re-exports
pub use error::{BookingError, BookingResult};
pub use generator::SlotGrid;
pub use manager::{
    BookingManager, CancelOutcome, CreateOutcome, DeleteOutcome, GenerateSlotsParams,
    StatusOutcome,
};

// Re-export shared types for convenience
pub use shared::booking::{BookingEvent, BookingEventPayload, BookingEventType};
