//! Slot Model

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Fixed time window during which a resource may be booked
///
/// `is_available` is flipped exclusively by the booking lifecycle
/// manager inside its claim/release transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    #[serde(with = "serde_helpers::record_id")]
    pub resource_id: RecordId,
    /// RFC3339
    pub start_time: String,
    /// RFC3339
    pub end_time: String,
    /// YYYY-MM-DD, redundant with start_time, kept for query convenience
    pub date: String,
    #[serde(
        default = "default_true",
        deserialize_with = "serde_helpers::bool_true"
    )]
    pub is_available: bool,
    #[serde(default)]
    pub price: f64,
}

fn default_true() -> bool {
    true
}

/// Create slot payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotCreate {
    /// Owning resource, "resources:id" form
    pub resource_id: String,
    /// RFC3339
    pub start_time: String,
    /// RFC3339
    pub end_time: String,
    /// YYYY-MM-DD
    pub date: String,
    pub is_available: Option<bool>,
    pub price: Option<f64>,
}
