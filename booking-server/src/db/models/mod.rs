//! Database models
//!
//! SurrealDB 实体模型与请求载荷。每个实体提供三个类型：
//! 实体本身、Create 载荷、Update 载荷。

pub mod booking;
pub mod resource;
pub mod serde_helpers;
pub mod slot;
pub mod user;

pub use booking::{Booking, BookingCreate, BookingStatus};
pub use resource::{Resource, ResourceCreate, ResourceUpdate};
pub use slot::{Slot, SlotCreate};
pub use user::{User, UserCreate, UserRole, UserUpdate};

use surrealdb::RecordId;

/// ID type aliases
pub type UserId = RecordId;
pub type ResourceId = RecordId;
pub type SlotId = RecordId;
pub type BookingId = RecordId;
