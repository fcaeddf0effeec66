//! Resource Repository

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{Resource, ResourceCreate, ResourceUpdate};
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

#[derive(Clone)]
pub struct ResourceRepository {
    base: BaseRepository,
}

impl ResourceRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find all active resources, newest first
    pub async fn find_all(&self) -> RepoResult<Vec<Resource>> {
        let resources: Vec<Resource> = self
            .base
            .db()
            .query("SELECT * FROM resources WHERE is_active = true ORDER BY created_at DESC LIMIT 100")
            .await?
            .take(0)?;
        Ok(resources)
    }

    /// Find all resources including inactive (admin view)
    pub async fn find_all_with_inactive(&self) -> RepoResult<Vec<Resource>> {
        let resources: Vec<Resource> = self
            .base
            .db()
            .query("SELECT * FROM resources ORDER BY created_at DESC LIMIT 100")
            .await?
            .take(0)?;
        Ok(resources)
    }

    /// Find resource by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Resource>> {
        let thing: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", id)))?;
        let resource: Option<Resource> = self.base.db().select(thing).await?;
        Ok(resource)
    }

    /// Find active resources in a category
    pub async fn find_by_category(&self, category: &str) -> RepoResult<Vec<Resource>> {
        let category_owned = category.to_string();
        let resources: Vec<Resource> = self
            .base
            .db()
            .query(
                "SELECT * FROM resources WHERE is_active = true AND category = $category ORDER BY created_at DESC LIMIT 100",
            )
            .bind(("category", category_owned))
            .await?
            .take(0)?;
        Ok(resources)
    }

    /// Case-insensitive name search over active resources
    pub async fn search(&self, term: &str) -> RepoResult<Vec<Resource>> {
        let term_owned = term.to_lowercase();
        let resources: Vec<Resource> = self
            .base
            .db()
            .query(
                "SELECT * FROM resources WHERE is_active = true AND string::contains(string::lowercase(name), $term) ORDER BY created_at DESC LIMIT 20",
            )
            .bind(("term", term_owned))
            .await?
            .take(0)?;
        Ok(resources)
    }

    /// Create a new resource owned by the given user
    pub async fn create(&self, data: ResourceCreate, owner_id: RecordId) -> RepoResult<Resource> {
        let created_at = crate::utils::time::now_iso();

        let mut result = self
            .base
            .db()
            .query(
                r#"CREATE resources SET
                    name = $name,
                    description = $description,
                    category = $category,
                    location = $location,
                    capacity = $capacity,
                    image_url = $image_url,
                    is_active = $is_active,
                    amenities = $amenities,
                    price_per_hour = $price_per_hour,
                    owner_id = $owner_id,
                    created_at = $created_at
                RETURN AFTER"#,
            )
            .bind(("name", data.name))
            .bind(("description", data.description))
            .bind(("category", data.category))
            .bind(("location", data.location))
            .bind(("capacity", data.capacity.unwrap_or(1)))
            .bind(("image_url", data.image_url))
            .bind(("is_active", data.is_active.unwrap_or(true)))
            .bind(("amenities", data.amenities))
            .bind(("price_per_hour", data.price_per_hour.unwrap_or(0.0)))
            .bind(("owner_id", owner_id))
            .bind(("created_at", created_at))
            .await?;

        let created: Option<Resource> = result.take(0)?;
        created.ok_or_else(|| RepoError::Database("Failed to create resource".to_string()))
    }

    /// Partial update of a resource
    pub async fn update(&self, id: &str, data: ResourceUpdate) -> RepoResult<Resource> {
        let thing: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", id)))?;

        let mut result = self
            .base
            .db()
            .query(
                r#"UPDATE $thing SET
                    name = $name OR name,
                    description = $description OR description,
                    category = $category OR category,
                    location = $location OR location,
                    capacity = IF $has_capacity THEN $capacity ELSE capacity END,
                    image_url = $image_url OR image_url,
                    is_active = IF $has_is_active THEN $is_active ELSE is_active END,
                    amenities = IF $has_amenities THEN $amenities ELSE amenities END,
                    price_per_hour = IF $has_price THEN $price_per_hour ELSE price_per_hour END
                RETURN AFTER"#,
            )
            .bind(("thing", thing))
            .bind(("name", data.name))
            .bind(("description", data.description))
            .bind(("category", data.category))
            .bind(("location", data.location))
            .bind(("has_capacity", data.capacity.is_some()))
            .bind(("capacity", data.capacity))
            .bind(("image_url", data.image_url))
            .bind(("has_is_active", data.is_active.is_some()))
            .bind(("is_active", data.is_active))
            .bind(("has_amenities", data.amenities.is_some()))
            .bind(("amenities", data.amenities))
            .bind(("has_price", data.price_per_hour.is_some()))
            .bind(("price_per_hour", data.price_per_hour))
            .await?;

        result
            .take::<Option<Resource>>(0)?
            .ok_or_else(|| RepoError::NotFound(format!("Resource {} not found", id)))
    }

    /// Enable or disable a resource
    pub async fn set_active(&self, id: &str, is_active: bool) -> RepoResult<Resource> {
        let thing: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", id)))?;

        let mut result = self
            .base
            .db()
            .query("UPDATE $thing SET is_active = $is_active RETURN AFTER")
            .bind(("thing", thing))
            .bind(("is_active", is_active))
            .await?;

        result
            .take::<Option<Resource>>(0)?
            .ok_or_else(|| RepoError::NotFound(format!("Resource {} not found", id)))
    }

    /// Hard delete a resource
    pub async fn delete(&self, id: &str) -> RepoResult<bool> {
        let thing: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", id)))?;
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Resource {} not found", id)))?;

        self.base
            .db()
            .query("DELETE $thing")
            .bind(("thing", thing))
            .await?;
        Ok(true)
    }
}
