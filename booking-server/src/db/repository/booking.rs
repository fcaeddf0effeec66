//! Booking Repository
//!
//! 预订数据访问。创建、取消、改状态都和时段的 is_available 绑在
//! 同一个事务里，保证「时段可用 ⟺ 没有活跃预订」这条不变量。

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{Booking, BookingStatus};
use serde::{Deserialize, Serialize};
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

/// Insert row for the claim transaction, record links kept native
#[derive(Debug, Serialize)]
pub struct BookingRow {
    pub user_id: RecordId,
    pub user_name: String,
    pub user_email: String,
    pub resource_id: RecordId,
    pub resource_name: String,
    pub slot_id: RecordId,
    pub start_time: String,
    pub end_time: String,
    pub status: BookingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub total_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_token: Option<String>,
    pub created_at: String,
}

/// What a guarded transition did
///
/// `before` is the booking as it was when the transaction started
/// (None when the id does not exist), `booking` the row after the
/// statement ran (unchanged when the guard did not match).
#[derive(Debug, Deserialize)]
pub struct TransitionOutcome {
    pub before: Option<Booking>,
    pub booking: Option<Booking>,
    pub released: bool,
    pub reclaimed: bool,
}

/// RocksDB 乐观事务在提交时才发现写冲突，SurrealDB 把它包装成一条
/// 可重试错误。对抢占时段来说，冲突就等于没抢到。
fn is_write_conflict(err: &surrealdb::Error) -> bool {
    let msg = err.to_string().to_lowercase();
    msg.contains("read or write conflict")
        || msg.contains("resource busy")
        || msg.contains("can be retried")
}

#[derive(Clone)]
pub struct BookingRepository {
    base: BaseRepository,
}

impl BookingRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find booking by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Booking>> {
        let thing: RecordId = id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", id)))?;
        let booking: Option<Booking> = self.base.db().select(thing).await?;
        Ok(booking)
    }

    /// A user's bookings, newest first
    pub async fn find_by_user(&self, user_id: &str) -> RepoResult<Vec<Booking>> {
        let uid: RecordId = user_id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", user_id)))?;
        let bookings: Vec<Booking> = self
            .base
            .db()
            .query("SELECT * FROM bookings WHERE user_id = $uid ORDER BY created_at DESC LIMIT 100")
            .bind(("uid", uid))
            .await?
            .take(0)?;
        Ok(bookings)
    }

    /// A user's confirmed bookings that have not started yet, soonest first
    pub async fn find_upcoming_by_user(
        &self,
        user_id: &str,
        now: &str,
    ) -> RepoResult<Vec<Booking>> {
        let uid: RecordId = user_id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", user_id)))?;
        let now_owned = now.to_string();
        let bookings: Vec<Booking> = self
            .base
            .db()
            .query(
                "SELECT * FROM bookings WHERE user_id = $uid AND status = 'confirmed' AND start_time > $now ORDER BY start_time ASC LIMIT 50",
            )
            .bind(("uid", uid))
            .bind(("now", now_owned))
            .await?
            .take(0)?;
        Ok(bookings)
    }

    /// All bookings, newest first (admin view)
    pub async fn find_all(&self) -> RepoResult<Vec<Booking>> {
        let bookings: Vec<Booking> = self
            .base
            .db()
            .query("SELECT * FROM bookings ORDER BY created_at DESC LIMIT 200")
            .await?
            .take(0)?;
        Ok(bookings)
    }

    /// All bookings in one status, newest first (admin view)
    pub async fn find_by_status(&self, status: BookingStatus) -> RepoResult<Vec<Booking>> {
        let bookings: Vec<Booking> = self
            .base
            .db()
            .query(
                "SELECT * FROM bookings WHERE status = $status ORDER BY created_at DESC LIMIT 100",
            )
            .bind(("status", status))
            .await?
            .take(0)?;
        Ok(bookings)
    }

    /// Bookings against one resource, newest first
    pub async fn find_by_resource(&self, resource_id: &str) -> RepoResult<Vec<Booking>> {
        let rid: RecordId = resource_id
            .parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", resource_id)))?;
        let bookings: Vec<Booking> = self
            .base
            .db()
            .query(
                "SELECT * FROM bookings WHERE resource_id = $rid ORDER BY created_at DESC LIMIT 100",
            )
            .bind(("rid", rid))
            .await?
            .take(0)?;
        Ok(bookings)
    }

    /// Look up a booking by its idempotency token
    pub async fn find_by_request_token(&self, token: &str) -> RepoResult<Option<Booking>> {
        let token_owned = token.to_string();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM bookings WHERE request_token = $req_token LIMIT 1")
            .bind(("req_token", token_owned))
            .await?;
        let bookings: Vec<Booking> = result.take(0)?;
        Ok(bookings.into_iter().next())
    }

    /// Claim the slot and create the booking in one transaction.
    ///
    /// The UPDATE only matches while the slot is still available, so of
    /// any number of concurrent callers exactly one gets the row back.
    /// The resource's is_active is re-read inside the transaction: a
    /// deactivation racing the caller's pre-check cannot land a booking.
    /// Returns None when the claim missed (already taken, resource
    /// deactivated, or the engine reported a commit conflict, which all
    /// mean the same thing here).
    pub async fn create_claiming_slot(
        &self,
        slot_id: RecordId,
        row: BookingRow,
    ) -> RepoResult<Option<Booking>> {
        let resource_id = row.resource_id.clone();
        let result = self
            .base
            .db()
            .query(
                r#"
                BEGIN TRANSACTION;
                LET $res = SELECT is_active FROM $resource;
                -- 条件更新就是抢占：没抢到则不创建
                LET $claimed = IF $res[0].is_active = true THEN (UPDATE $slot SET is_available = false WHERE is_available = true RETURN AFTER) ELSE [] END;
                LET $created = IF array::len($claimed) > 0 THEN (CREATE ONLY bookings CONTENT $row) ELSE NONE END;
                RETURN $created;
                COMMIT TRANSACTION;
                "#,
            )
            .bind(("resource", resource_id))
            .bind(("slot", slot_id))
            .bind(("row", row))
            .await;

        let mut response = match result {
            Ok(response) => response,
            Err(err) if is_write_conflict(&err) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        match response.take::<Option<Booking>>(0) {
            Ok(created) => Ok(created),
            Err(err) if is_write_conflict(&err) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Cancel a booking and release its slot in one transaction.
    ///
    /// The status guard makes a second cancel a no-op: the booking comes
    /// back unchanged and `released` stays false.
    pub async fn cancel_releasing_slot(
        &self,
        booking_id: RecordId,
    ) -> RepoResult<TransitionOutcome> {
        let mut result = self
            .base
            .db()
            .query(
                r#"
                BEGIN TRANSACTION;
                LET $found = SELECT * FROM bookings WHERE id = $booking LIMIT 1;
                LET $before = $found[0];
                LET $updated = UPDATE $booking SET status = 'cancelled' WHERE status IN ['pending', 'confirmed'] RETURN AFTER;
                LET $released = IF array::len($updated) > 0 THEN (UPDATE $before.slot_id SET is_available = true RETURN AFTER) ELSE [] END;
                RETURN {
                    before: $before,
                    booking: $updated[0] OR $before,
                    released: array::len($released) > 0,
                    reclaimed: false
                };
                COMMIT TRANSACTION;
                "#,
            )
            .bind(("booking", booking_id))
            .await?;

        let outcome: Option<TransitionOutcome> = result.take(0)?;
        outcome.ok_or_else(|| RepoError::Database("Cancel transaction returned nothing".to_string()))
    }

    /// Bring a cancelled booking back by re-claiming its slot.
    ///
    /// Same compare-and-swap as creation: when the slot was rebooked in
    /// the meantime the claim misses, nothing changes and `reclaimed`
    /// stays false.
    pub async fn reinstate_claiming_slot(
        &self,
        booking_id: RecordId,
        new_status: BookingStatus,
    ) -> RepoResult<TransitionOutcome> {
        let mut result = self
            .base
            .db()
            .query(
                r#"
                BEGIN TRANSACTION;
                LET $found = SELECT * FROM bookings WHERE id = $booking LIMIT 1;
                LET $before = $found[0];
                LET $claimed = IF $before.status = 'cancelled' THEN (UPDATE $before.slot_id SET is_available = false WHERE is_available = true RETURN AFTER) ELSE [] END;
                LET $updated = IF array::len($claimed) > 0 THEN (UPDATE $booking SET status = $status RETURN AFTER) ELSE [] END;
                RETURN {
                    before: $before,
                    booking: $updated[0] OR $before,
                    released: false,
                    reclaimed: array::len($claimed) > 0
                };
                COMMIT TRANSACTION;
                "#,
            )
            .bind(("booking", booking_id))
            .bind(("status", new_status))
            .await?;

        let outcome: Option<TransitionOutcome> = result.take(0)?;
        outcome
            .ok_or_else(|| RepoError::Database("Reinstate transaction returned nothing".to_string()))
    }

    /// Status-only transition guarded by the expected current status.
    ///
    /// The WHERE clause turns a lost race into an unchanged row instead
    /// of a blind overwrite.
    pub async fn set_status_guarded(
        &self,
        booking_id: RecordId,
        new_status: BookingStatus,
        expected: BookingStatus,
    ) -> RepoResult<TransitionOutcome> {
        let mut result = self
            .base
            .db()
            .query(
                r#"
                BEGIN TRANSACTION;
                LET $found = SELECT * FROM bookings WHERE id = $booking LIMIT 1;
                LET $before = $found[0];
                LET $updated = UPDATE $booking SET status = $status WHERE status = $expected RETURN AFTER;
                RETURN {
                    before: $before,
                    booking: $updated[0] OR $before,
                    released: false,
                    reclaimed: false
                };
                COMMIT TRANSACTION;
                "#,
            )
            .bind(("booking", booking_id))
            .bind(("status", new_status))
            .bind(("expected", expected))
            .await?;

        let outcome: Option<TransitionOutcome> = result.take(0)?;
        outcome
            .ok_or_else(|| RepoError::Database("Status transaction returned nothing".to_string()))
    }

    /// Delete a booking, releasing its slot when it was still active.
    pub async fn delete_releasing_slot(
        &self,
        booking_id: RecordId,
    ) -> RepoResult<TransitionOutcome> {
        let mut result = self
            .base
            .db()
            .query(
                r#"
                BEGIN TRANSACTION;
                LET $found = SELECT * FROM bookings WHERE id = $booking LIMIT 1;
                LET $before = $found[0];
                LET $released = IF $before.status IN ['pending', 'confirmed'] THEN (UPDATE $before.slot_id SET is_available = true RETURN AFTER) ELSE [] END;
                LET $gone = DELETE $booking RETURN BEFORE;
                RETURN {
                    before: $before,
                    booking: NONE,
                    released: array::len($released) > 0,
                    reclaimed: false
                };
                COMMIT TRANSACTION;
                "#,
            )
            .bind(("booking", booking_id))
            .await?;

        let outcome: Option<TransitionOutcome> = result.take(0)?;
        outcome
            .ok_or_else(|| RepoError::Database("Delete transaction returned nothing".to_string()))
    }
}
