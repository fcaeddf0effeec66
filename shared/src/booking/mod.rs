//! Booking domain events shared between server and clients

pub mod event;

pub use event::{BookingEvent, BookingEventPayload, BookingEventType};
