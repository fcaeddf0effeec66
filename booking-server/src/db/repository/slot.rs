//! Slot Repository
//!
//! 时段数据访问。is_available 的翻转只发生在 BookingManager 的
//! 事务里，这里不提供单独的可用性开关。

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{Slot, SlotCreate};
use serde::Serialize;
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

/// Insert row with a native record link for resource_id
#[derive(Debug, Serialize)]
struct SlotRow {
    resource_id: RecordId,
    start_time: String,
    end_time: String,
    date: String,
    is_available: bool,
    price: f64,
}

#[derive(Clone)]
pub struct SlotRepository {
    base: BaseRepository,
}

impl SlotRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find slot by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Slot>> {
        let thing: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", id)))?;
        let slot: Option<Slot> = self.base.db().select(thing).await?;
        Ok(slot)
    }

    /// All slots of a resource on a date, earliest first
    pub async fn find_by_resource_and_date(
        &self,
        resource_id: &str,
        date: &str,
    ) -> RepoResult<Vec<Slot>> {
        let rid: RecordId = resource_id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", resource_id)))?;
        let date_owned = date.to_string();
        let slots: Vec<Slot> = self
            .base
            .db()
            .query(
                "SELECT * FROM slots WHERE resource_id = $rid AND date = $date ORDER BY start_time ASC LIMIT 500",
            )
            .bind(("rid", rid))
            .bind(("date", date_owned))
            .await?
            .take(0)?;
        Ok(slots)
    }

    /// Only the still-bookable slots of a resource on a date
    pub async fn find_available_by_resource_and_date(
        &self,
        resource_id: &str,
        date: &str,
    ) -> RepoResult<Vec<Slot>> {
        let rid: RecordId = resource_id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", resource_id)))?;
        let date_owned = date.to_string();
        let slots: Vec<Slot> = self
            .base
            .db()
            .query(
                "SELECT * FROM slots WHERE resource_id = $rid AND date = $date AND is_available = true ORDER BY start_time ASC LIMIT 500",
            )
            .bind(("rid", rid))
            .bind(("date", date_owned))
            .await?
            .take(0)?;
        Ok(slots)
    }

    /// All slots of a resource across dates
    pub async fn find_by_resource(&self, resource_id: &str) -> RepoResult<Vec<Slot>> {
        let rid: RecordId = resource_id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", resource_id)))?;
        let slots: Vec<Slot> = self
            .base
            .db()
            .query(
                "SELECT * FROM slots WHERE resource_id = $rid ORDER BY date ASC, start_time ASC LIMIT 500",
            )
            .bind(("rid", rid))
            .await?
            .take(0)?;
        Ok(slots)
    }

    /// Create a single slot
    pub async fn create(&self, data: SlotCreate) -> RepoResult<Slot> {
        let rid: RecordId = data
            .resource_id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", data.resource_id)))?;

        let mut result = self
            .base
            .db()
            .query(
                r#"CREATE slots SET
                    resource_id = $rid,
                    start_time = $start_time,
                    end_time = $end_time,
                    date = $date,
                    is_available = $is_available,
                    price = $price
                RETURN AFTER"#,
            )
            .bind(("rid", rid))
            .bind(("start_time", data.start_time))
            .bind(("end_time", data.end_time))
            .bind(("date", data.date))
            .bind(("is_available", data.is_available.unwrap_or(true)))
            .bind(("price", data.price.unwrap_or(0.0)))
            .await?;

        let created: Option<Slot> = result.take(0)?;
        created.ok_or_else(|| RepoError::Database("Failed to create slot".to_string()))
    }

    /// Bulk insert generated slots, returns them in insert order
    pub async fn create_bulk(&self, batch: Vec<SlotCreate>) -> RepoResult<Vec<Slot>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let mut rows = Vec::with_capacity(batch.len());
        for data in batch {
            let rid: RecordId = data
                .resource_id
                .parse()
                .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", data.resource_id)))?;
            rows.push(SlotRow {
                resource_id: rid,
                start_time: data.start_time,
                end_time: data.end_time,
                date: data.date,
                is_available: data.is_available.unwrap_or(true),
                price: data.price.unwrap_or(0.0),
            });
        }

        let mut result = self
            .base
            .db()
            .query("INSERT INTO slots $batch")
            .bind(("batch", rows))
            .await?;

        let created: Vec<Slot> = result.take(0)?;
        Ok(created)
    }

    /// Hard delete a slot
    pub async fn delete(&self, id: &str) -> RepoResult<bool> {
        let thing: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", id)))?;
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Slot {} not found", id)))?;

        self.base
            .db()
            .query("DELETE $thing")
            .bind(("thing", thing))
            .await?;
        Ok(true)
    }

    /// Delete every slot of a resource, returns how many went away
    pub async fn delete_by_resource(&self, resource_id: &str) -> RepoResult<usize> {
        let rid: RecordId = resource_id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", resource_id)))?;

        let mut result = self
            .base
            .db()
            .query(
                r#"
                LET $gone = DELETE slots WHERE resource_id = $rid RETURN BEFORE;
                RETURN array::len($gone);
                "#,
            )
            .bind(("rid", rid))
            .await?;

        let count: Option<usize> = result.take(0)?;
        Ok(count.unwrap_or(0))
    }
}
