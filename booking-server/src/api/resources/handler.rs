//! Resource API Handlers

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use surrealdb::RecordId;

use crate::auth::Identity;
use crate::core::ServerState;
use crate::db::models::{Resource, ResourceCreate, ResourceUpdate};
use crate::db::repository::{ResourceRepository, SlotRepository};
use crate::utils::validation::{
    MAX_CATEGORY_LEN, MAX_LOCATION_LEN, MAX_NAME_LEN, MAX_NOTE_LEN, MAX_URL_LEN,
    validate_optional_text, validate_required_text,
};
use crate::utils::{AppError, AppResponse, AppResult, ok, ok_with_message};

const COLLECTION: &str = "resources";

/// Search query string
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

/// Active flag payload for PUT {id}/active
#[derive(Debug, Deserialize)]
pub struct ActiveUpdate {
    pub is_active: bool,
}

fn validate_pricing(capacity: Option<i32>, price: Option<f64>) -> Result<(), AppError> {
    if let Some(capacity) = capacity
        && !(1..=1000).contains(&capacity)
    {
        return Err(AppError::validation("capacity must be between 1 and 1000"));
    }
    if let Some(price) = price
        && (!price.is_finite() || price < 0.0)
    {
        return Err(AppError::validation("price_per_hour must be non-negative"));
    }
    Ok(())
}

/// List active resources
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<AppResponse<Vec<Resource>>>> {
    let repo = ResourceRepository::new(state.get_db());
    let resources = repo.find_all().await?;
    Ok(ok(resources))
}

/// List all resources including inactive (admin)
pub async fn list_with_inactive(
    State(state): State<ServerState>,
) -> AppResult<Json<AppResponse<Vec<Resource>>>> {
    let repo = ResourceRepository::new(state.get_db());
    let resources = repo.find_all_with_inactive().await?;
    Ok(ok(resources))
}

/// Get resource by id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<Resource>>> {
    let repo = ResourceRepository::new(state.get_db());
    let resource = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Resource {} not found", id)))?;
    Ok(ok(resource))
}

/// List active resources in a category
pub async fn list_by_category(
    State(state): State<ServerState>,
    Path(category): Path<String>,
) -> AppResult<Json<AppResponse<Vec<Resource>>>> {
    let repo = ResourceRepository::new(state.get_db());
    let resources = repo.find_by_category(&category).await?;
    Ok(ok(resources))
}

/// Case-insensitive name search over active resources
pub async fn search(
    State(state): State<ServerState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<AppResponse<Vec<Resource>>>> {
    let term = query.q.trim();
    if term.is_empty() {
        return Ok(ok(Vec::new()));
    }

    let repo = ResourceRepository::new(state.get_db());
    let resources = repo.search(term).await?;
    Ok(ok(resources))
}

/// Create a new resource (admin)
///
/// The creating admin becomes the owner.
pub async fn create(
    State(state): State<ServerState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<ResourceCreate>,
) -> AppResult<Json<AppResponse<Resource>>> {
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    validate_required_text(&payload.category, "category", MAX_CATEGORY_LEN)?;
    validate_optional_text(&payload.description, "description", MAX_NOTE_LEN)?;
    validate_optional_text(&payload.location, "location", MAX_LOCATION_LEN)?;
    validate_optional_text(&payload.image_url, "image_url", MAX_URL_LEN)?;
    validate_pricing(payload.capacity, payload.price_per_hour)?;

    let owner_id: RecordId = identity
        .user_id
        .parse()
        .map_err(|_| AppError::validation("Invalid user id in token"))?;

    let repo = ResourceRepository::new(state.get_db());
    let resource = repo.create(payload, owner_id).await?;

    let id = resource.id.as_ref().map(|t| t.to_string()).unwrap_or_default();
    tracing::info!(resource_id = %id, "Resource created");

    state
        .broadcast_sync(COLLECTION, "created", &id, Some(&resource))
        .await;

    Ok(ok(resource))
}

/// Update a resource (admin, partial)
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<ResourceUpdate>,
) -> AppResult<Json<AppResponse<Resource>>> {
    if let Some(name) = &payload.name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    if let Some(category) = &payload.category {
        validate_required_text(category, "category", MAX_CATEGORY_LEN)?;
    }
    validate_optional_text(&payload.description, "description", MAX_NOTE_LEN)?;
    validate_optional_text(&payload.location, "location", MAX_LOCATION_LEN)?;
    validate_optional_text(&payload.image_url, "image_url", MAX_URL_LEN)?;
    validate_pricing(payload.capacity, payload.price_per_hour)?;

    let repo = ResourceRepository::new(state.get_db());
    let resource = repo.update(&id, payload).await?;

    state
        .broadcast_sync(COLLECTION, "updated", &id, Some(&resource))
        .await;

    Ok(ok(resource))
}

/// Toggle resource availability for new bookings (admin)
///
/// Deactivation blocks new bookings but leaves existing ones alone.
pub async fn set_active(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<ActiveUpdate>,
) -> AppResult<Json<AppResponse<Resource>>> {
    let repo = ResourceRepository::new(state.get_db());
    let resource = repo.set_active(&id, payload.is_active).await?;

    tracing::info!(resource_id = %id, is_active = payload.is_active, "Resource active flag changed");

    state
        .broadcast_sync(COLLECTION, "updated", &id, Some(&resource))
        .await;

    Ok(ok(resource))
}

/// Delete a resource and all its slots (admin)
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<bool>>> {
    let resources = ResourceRepository::new(state.get_db());
    let slots = SlotRepository::new(state.get_db());

    // Slots first so a failure never leaves orphans pointing at a
    // deleted resource
    let removed_slots = slots.delete_by_resource(&id).await?;
    let deleted = resources.delete(&id).await?;

    if deleted {
        tracing::info!(resource_id = %id, removed_slots, "Resource deleted");
        state
            .broadcast_sync::<()>(COLLECTION, "deleted", &id, None)
            .await;
    }

    Ok(ok_with_message(
        deleted,
        format!("Deleted resource and {} slots", removed_slots),
    ))
}
