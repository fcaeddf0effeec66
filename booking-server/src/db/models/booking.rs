//! Booking Model

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Booking status lifecycle
///
/// `cancelled` is the only status that releases the slot; `completed`
/// is terminal and informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    /// Statuses that hold a claim on the slot
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "completed" => Ok(BookingStatus::Completed),
            other => Err(format!("unknown booking status: {other}")),
        }
    }
}

/// Reservation of one slot by one user
///
/// User and resource display fields are denormalized at creation time
/// from the authoritative records, never taken from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    #[serde(with = "serde_helpers::record_id")]
    pub user_id: RecordId,
    pub user_name: String,
    pub user_email: String,
    #[serde(with = "serde_helpers::record_id")]
    pub resource_id: RecordId,
    pub resource_name: String,
    #[serde(with = "serde_helpers::record_id")]
    pub slot_id: RecordId,
    /// RFC3339, copied from the slot at booking time
    pub start_time: String,
    /// RFC3339, copied from the slot at booking time
    pub end_time: String,
    pub status: BookingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub total_price: f64,
    /// Idempotency token supplied by the client, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_token: Option<String>,
    /// RFC3339
    pub created_at: String,
}

/// Create booking payload (client-facing)
///
/// Everything else on [`Booking`] is derived server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCreate {
    /// Slot to claim, "slots:id" form accepted
    pub slot_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Optional idempotency token; replays return the original booking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&BookingStatus::Confirmed).unwrap(),
            r#""confirmed""#
        );
        let parsed: BookingStatus = serde_json::from_str(r#""cancelled""#).unwrap();
        assert_eq!(parsed, BookingStatus::Cancelled);
    }

    #[test]
    fn test_status_classification() {
        assert!(BookingStatus::Pending.is_active());
        assert!(BookingStatus::Confirmed.is_active());
        assert!(!BookingStatus::Cancelled.is_active());
        assert!(BookingStatus::Completed.is_terminal());
    }
}
