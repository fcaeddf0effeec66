//! Resource Model

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Bookable resource (room, equipment, service)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Category string: "meeting-room", "workspace", "equipment", "service"
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default = "default_capacity")]
    pub capacity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(
        default = "default_true",
        deserialize_with = "serde_helpers::bool_true"
    )]
    pub is_active: bool,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub price_per_hour: f64,
    /// Admin who created the resource
    #[serde(with = "serde_helpers::record_id")]
    pub owner_id: RecordId,
    /// RFC3339
    pub created_at: String,
}

fn default_true() -> bool {
    true
}

fn default_capacity() -> i32 {
    1
}

/// Create resource payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceCreate {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub location: Option<String>,
    pub capacity: Option<i32>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub price_per_hour: Option<f64>,
}

/// Update resource payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amenities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_hour: Option<f64>,
}
