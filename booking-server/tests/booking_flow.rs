//! Booking lifecycle integration tests against an embedded RocksDB store.
//!
//! Run: cargo test -p booking-server --test booking_flow

use std::sync::Arc;

use booking_server::auth::Identity;
use booking_server::bookings::{BookingError, BookingManager, GenerateSlotsParams};
use booking_server::db::DbService;
use booking_server::db::models::{
    BookingCreate, BookingStatus, ResourceCreate, SlotCreate, UserRole,
};
use booking_server::db::repository::{
    BookingRepository, BookingRow, ResourceRepository, SlotRepository,
};
use surrealdb::{RecordId, Surreal};
use surrealdb::engine::local::Db;

struct TestEnv {
    // Drop order: the store dir must outlive the handle
    db: Surreal<Db>,
    manager: Arc<BookingManager>,
    _tmp: tempfile::TempDir,
}

async fn setup() -> TestEnv {
    let tmp = tempfile::tempdir().unwrap();
    let service = DbService::new(tmp.path().to_str().unwrap()).await.unwrap();
    let db = service.db;
    let manager = Arc::new(BookingManager::new(db.clone()));
    TestEnv {
        db,
        manager,
        _tmp: tmp,
    }
}

fn user(key: &str, name: &str) -> Identity {
    Identity {
        user_id: format!("users:{key}"),
        name: name.to_string(),
        email: format!("{key}@example.com"),
        role: UserRole::User,
    }
}

fn admin() -> Identity {
    Identity {
        user_id: "users:admin".to_string(),
        name: "Administrator".to_string(),
        email: "admin@example.com".to_string(),
        role: UserRole::Admin,
    }
}

async fn seed_resource(db: &Surreal<Db>, active: bool) -> String {
    let repo = ResourceRepository::new(db.clone());
    let owner = "users:admin".parse().unwrap();
    let resource = repo
        .create(
            ResourceCreate {
                name: "Court A".to_string(),
                description: None,
                category: "meeting-room".to_string(),
                location: Some("Floor 2".to_string()),
                capacity: Some(4),
                image_url: None,
                is_active: Some(active),
                amenities: vec!["projector".to_string()],
                price_per_hour: Some(50.0),
            },
            owner,
        )
        .await
        .unwrap();
    resource.id.unwrap().to_string()
}

async fn seed_slot_at(db: &Surreal<Db>, resource_id: &str, start: &str, end: &str) -> String {
    let repo = SlotRepository::new(db.clone());
    let slot = repo
        .create(SlotCreate {
            resource_id: resource_id.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            date: start[..10].to_string(),
            is_available: Some(true),
            price: Some(50.0),
        })
        .await
        .unwrap();
    slot.id.unwrap().to_string()
}

async fn seed_slot(db: &Surreal<Db>, resource_id: &str) -> String {
    seed_slot_at(
        db,
        resource_id,
        "2024-06-01T09:00:00.000Z",
        "2024-06-01T10:00:00.000Z",
    )
    .await
}

async fn slot_available(db: &Surreal<Db>, slot_id: &str) -> bool {
    SlotRepository::new(db.clone())
        .find_by_id(slot_id)
        .await
        .unwrap()
        .expect("slot should exist")
        .is_available
}

fn create_req(slot_id: &str) -> BookingCreate {
    BookingCreate {
        slot_id: slot_id.to_string(),
        notes: None,
        request_token: None,
    }
}

#[tokio::test]
async fn create_claims_slot_and_cancel_releases_it() {
    let env = setup().await;
    let resource_id = seed_resource(&env.db, true).await;
    let slot_id = seed_slot(&env.db, &resource_id).await;
    let alice = user("alice", "Alice");

    let outcome = env
        .manager
        .create_booking(&alice, create_req(&slot_id))
        .await
        .unwrap();
    assert!(!outcome.replayed);
    assert_eq!(outcome.booking.status, BookingStatus::Confirmed);
    // Denormalized fields come from the stored records, not the request
    assert_eq!(outcome.booking.user_name, "Alice");
    assert_eq!(outcome.booking.user_email, "alice@example.com");
    assert_eq!(outcome.booking.resource_name, "Court A");
    assert_eq!(outcome.booking.start_time, "2024-06-01T09:00:00.000Z");
    assert_eq!(outcome.booking.total_price, 50.0);
    assert!(!slot_available(&env.db, &slot_id).await);

    let booking_id = outcome.booking.id.unwrap().to_string();
    let cancelled = env.manager.cancel_booking(&alice, &booking_id).await.unwrap();
    assert!(cancelled.released);
    assert_eq!(cancelled.booking.status, BookingStatus::Cancelled);
    assert!(slot_available(&env.db, &slot_id).await);
}

#[tokio::test]
async fn double_cancel_is_a_noop_for_the_slot() {
    let env = setup().await;
    let resource_id = seed_resource(&env.db, true).await;
    let slot_id = seed_slot(&env.db, &resource_id).await;
    let alice = user("alice", "Alice");

    let outcome = env
        .manager
        .create_booking(&alice, create_req(&slot_id))
        .await
        .unwrap();
    let booking_id = outcome.booking.id.unwrap().to_string();

    let first = env.manager.cancel_booking(&alice, &booking_id).await.unwrap();
    assert!(first.released);

    let second = env.manager.cancel_booking(&alice, &booking_id).await.unwrap();
    assert!(!second.released);
    assert_eq!(second.booking.status, BookingStatus::Cancelled);
    // Not toggled twice into an inconsistent state
    assert!(slot_available(&env.db, &slot_id).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_creates_exactly_one_wins() {
    let env = setup().await;
    let resource_id = seed_resource(&env.db, true).await;
    let slot_id = seed_slot(&env.db, &resource_id).await;

    let m1 = env.manager.clone();
    let m2 = env.manager.clone();
    let s1 = slot_id.clone();
    let s2 = slot_id.clone();

    let t1 = tokio::spawn(async move { m1.create_booking(&user("alice", "Alice"), create_req(&s1)).await });
    let t2 = tokio::spawn(async move { m2.create_booking(&user("bob", "Bob"), create_req(&s2)).await });

    let r1 = t1.await.unwrap();
    let r2 = t2.await.unwrap();

    let wins = [r1.is_ok(), r2.is_ok()].iter().filter(|w| **w).count();
    assert_eq!(wins, 1, "exactly one claimant may win the slot");

    let loss = if r1.is_err() { r1.unwrap_err() } else { r2.unwrap_err() };
    assert!(
        matches!(
            loss,
            BookingError::SlotUnavailable(_) | BookingError::Conflict(_)
        ),
        "loser gets a conflict, got: {loss:?}"
    );

    assert!(!slot_available(&env.db, &slot_id).await);
    let bookings = BookingRepository::new(env.db.clone()).find_all().await.unwrap();
    assert_eq!(bookings.len(), 1);
}

#[tokio::test]
async fn sequential_second_create_gets_unavailable() {
    let env = setup().await;
    let resource_id = seed_resource(&env.db, true).await;
    let slot_id = seed_slot(&env.db, &resource_id).await;

    env.manager
        .create_booking(&user("alice", "Alice"), create_req(&slot_id))
        .await
        .unwrap();

    let err = env
        .manager
        .create_booking(&user("bob", "Bob"), create_req(&slot_id))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SlotUnavailable(_)));
}

#[tokio::test]
async fn inactive_resource_rejects_bookings() {
    let env = setup().await;
    let resource_id = seed_resource(&env.db, false).await;
    let slot_id = seed_slot(&env.db, &resource_id).await;

    let err = env
        .manager
        .create_booking(&user("alice", "Alice"), create_req(&slot_id))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::ResourceInactive(_)));
    assert!(slot_available(&env.db, &slot_id).await);
}

#[tokio::test]
async fn replayed_token_returns_original_booking() {
    let env = setup().await;
    let resource_id = seed_resource(&env.db, true).await;
    let slot_id = seed_slot(&env.db, &resource_id).await;
    let alice = user("alice", "Alice");

    let req = BookingCreate {
        slot_id: slot_id.clone(),
        notes: Some("window seat".to_string()),
        request_token: Some("tok-1".to_string()),
    };

    let first = env.manager.create_booking(&alice, req.clone()).await.unwrap();
    assert!(!first.replayed);

    let second = env.manager.create_booking(&alice, req).await.unwrap();
    assert!(second.replayed);
    assert_eq!(
        first.booking.id.as_ref().unwrap(),
        second.booking.id.as_ref().unwrap()
    );

    let bookings = BookingRepository::new(env.db.clone()).find_all().await.unwrap();
    assert_eq!(bookings.len(), 1, "replay must not write a second booking");
}

#[tokio::test]
async fn generated_grid_matches_parameters() {
    let env = setup().await;
    let resource_id = seed_resource(&env.db, true).await;

    let slots = env
        .manager
        .generate_slots(
            &admin(),
            GenerateSlotsParams {
                resource_id: resource_id.clone(),
                start_date: "2024-01-01".to_string(),
                end_date: "2024-01-02".to_string(),
                start_hour: 9,
                end_hour: 11,
                interval_minutes: 60,
                price: 50.0,
            },
        )
        .await
        .unwrap();

    assert_eq!(slots.len(), 4);
    assert!(slots.iter().all(|s| s.is_available));
    assert!(slots.iter().all(|s| s.price == 50.0));

    let mut starts: Vec<&str> = slots.iter().map(|s| s.start_time.as_str()).collect();
    starts.sort();
    assert_eq!(
        starts,
        vec![
            "2024-01-01T09:00:00.000Z",
            "2024-01-01T10:00:00.000Z",
            "2024-01-02T09:00:00.000Z",
            "2024-01-02T10:00:00.000Z",
        ]
    );
}

#[tokio::test]
async fn generated_grid_skips_slots_crossing_the_closing_hour() {
    let env = setup().await;
    let resource_id = seed_resource(&env.db, true).await;

    let slots = env
        .manager
        .generate_slots(
            &admin(),
            GenerateSlotsParams {
                resource_id,
                start_date: "2024-01-01".to_string(),
                end_date: "2024-01-02".to_string(),
                start_hour: 9,
                end_hour: 11,
                interval_minutes: 90,
                price: 50.0,
            },
        )
        .await
        .unwrap();

    // One slot per day: [09:00-10:30], the next would cross 11:00
    assert_eq!(slots.len(), 2);
    assert!(slots.iter().all(|s| s.end_time.contains("T10:30:00")));
}

#[tokio::test]
async fn generate_for_missing_resource_fails() {
    let env = setup().await;

    let err = env
        .manager
        .generate_slots(
            &admin(),
            GenerateSlotsParams {
                resource_id: "resources:nope".to_string(),
                start_date: "2024-01-01".to_string(),
                end_date: "2024-01-01".to_string(),
                start_hour: 9,
                end_hour: 11,
                interval_minutes: 60,
                price: 50.0,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::ResourceNotFound(_)));
}

#[tokio::test]
async fn admin_transitions_keep_the_slot_consistent() {
    let env = setup().await;
    let resource_id = seed_resource(&env.db, true).await;
    let slot_id = seed_slot(&env.db, &resource_id).await;
    let alice = user("alice", "Alice");

    let outcome = env
        .manager
        .create_booking(&alice, create_req(&slot_id))
        .await
        .unwrap();
    let booking_id = outcome.booking.id.unwrap().to_string();

    // confirmed -> pending leaves the claim in place
    let pending = env
        .manager
        .update_status(&admin(), &booking_id, BookingStatus::Pending)
        .await
        .unwrap();
    assert!(!pending.released && !pending.reclaimed);
    assert!(!slot_available(&env.db, &slot_id).await);

    // pending -> cancelled releases
    let cancelled = env
        .manager
        .update_status(&admin(), &booking_id, BookingStatus::Cancelled)
        .await
        .unwrap();
    assert!(cancelled.released);
    assert!(slot_available(&env.db, &slot_id).await);

    // cancelled -> confirmed re-claims
    let reinstated = env
        .manager
        .update_status(&admin(), &booking_id, BookingStatus::Confirmed)
        .await
        .unwrap();
    assert!(reinstated.reclaimed);
    assert!(!slot_available(&env.db, &slot_id).await);

    // confirmed -> completed is terminal, slot untouched
    let completed = env
        .manager
        .update_status(&admin(), &booking_id, BookingStatus::Completed)
        .await
        .unwrap();
    assert!(!completed.released && !completed.reclaimed);
    assert!(!slot_available(&env.db, &slot_id).await);

    // No way out of completed
    let err = env
        .manager
        .update_status(&admin(), &booking_id, BookingStatus::Pending)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::InvalidTransition { .. }));
}

#[tokio::test]
async fn reinstate_fails_when_the_slot_was_rebooked() {
    let env = setup().await;
    let resource_id = seed_resource(&env.db, true).await;
    let slot_id = seed_slot(&env.db, &resource_id).await;
    let alice = user("alice", "Alice");

    let first = env
        .manager
        .create_booking(&alice, create_req(&slot_id))
        .await
        .unwrap();
    let first_id = first.booking.id.unwrap().to_string();

    env.manager.cancel_booking(&alice, &first_id).await.unwrap();

    // Bob grabs the freed slot
    env.manager
        .create_booking(&user("bob", "Bob"), create_req(&slot_id))
        .await
        .unwrap();

    let err = env
        .manager
        .update_status(&admin(), &first_id, BookingStatus::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SlotUnavailable(_)));

    // Bob's claim survives
    assert!(!slot_available(&env.db, &slot_id).await);
}

#[tokio::test]
async fn only_the_owner_or_an_admin_may_cancel() {
    let env = setup().await;
    let resource_id = seed_resource(&env.db, true).await;
    let slot_id = seed_slot(&env.db, &resource_id).await;

    let outcome = env
        .manager
        .create_booking(&user("alice", "Alice"), create_req(&slot_id))
        .await
        .unwrap();
    let booking_id = outcome.booking.id.unwrap().to_string();

    let err = env
        .manager
        .cancel_booking(&user("bob", "Bob"), &booking_id)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden(_)));
    assert!(!slot_available(&env.db, &slot_id).await);

    let cancelled = env.manager.cancel_booking(&admin(), &booking_id).await.unwrap();
    assert!(cancelled.released);
}

#[tokio::test]
async fn delete_releases_an_active_claim() {
    let env = setup().await;
    let resource_id = seed_resource(&env.db, true).await;
    let slot_id = seed_slot(&env.db, &resource_id).await;

    let outcome = env
        .manager
        .create_booking(&user("alice", "Alice"), create_req(&slot_id))
        .await
        .unwrap();
    let booking_id = outcome.booking.id.unwrap().to_string();

    let deleted = env.manager.delete_booking(&admin(), &booking_id).await.unwrap();
    assert!(deleted.released);
    assert!(slot_available(&env.db, &slot_id).await);

    let bookings = BookingRepository::new(env.db.clone()).find_all().await.unwrap();
    assert!(bookings.is_empty());

    let err = env
        .manager
        .cancel_booking(&admin(), &booking_id)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::BookingNotFound(_)));
}

#[tokio::test]
async fn upcoming_lists_only_bookings_that_have_not_started() {
    let env = setup().await;
    let resource_id = seed_resource(&env.db, true).await;
    let running = seed_slot_at(
        &env.db,
        &resource_id,
        "2024-06-01T09:00:00.000Z",
        "2024-06-01T10:00:00.000Z",
    )
    .await;
    let later = seed_slot_at(
        &env.db,
        &resource_id,
        "2024-06-01T11:00:00.000Z",
        "2024-06-01T12:00:00.000Z",
    )
    .await;
    let alice = user("alice", "Alice");

    env.manager
        .create_booking(&alice, create_req(&running))
        .await
        .unwrap();
    env.manager
        .create_booking(&alice, create_req(&later))
        .await
        .unwrap();

    // 09:30: the first booking is underway, only the 11:00 one is upcoming
    let upcoming = BookingRepository::new(env.db.clone())
        .find_upcoming_by_user("users:alice", "2024-06-01T09:30:00.000Z")
        .await
        .unwrap();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].start_time, "2024-06-01T11:00:00.000Z");
}

#[tokio::test]
async fn generation_range_beyond_a_quarter_is_rejected() {
    let env = setup().await;
    let resource_id = seed_resource(&env.db, true).await;

    let err = env
        .manager
        .generate_slots(
            &admin(),
            GenerateSlotsParams {
                resource_id,
                start_date: "2024-01-01".to_string(),
                end_date: "2024-06-01".to_string(),
                start_hour: 9,
                end_hour: 10,
                interval_minutes: 60,
                price: 50.0,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));
}

#[tokio::test]
async fn claim_misses_once_the_resource_is_deactivated() {
    let env = setup().await;
    let resource_id = seed_resource(&env.db, true).await;
    let slot_id = seed_slot(&env.db, &resource_id).await;

    // Deactivation landing after a caller's pre-check: drive the claim
    // transaction directly against the now-inactive resource.
    ResourceRepository::new(env.db.clone())
        .set_active(&resource_id, false)
        .await
        .unwrap();

    let slot: RecordId = slot_id.parse().unwrap();
    let row = BookingRow {
        user_id: "users:alice".parse().unwrap(),
        user_name: "Alice".to_string(),
        user_email: "alice@example.com".to_string(),
        resource_id: resource_id.parse().unwrap(),
        resource_name: "Court A".to_string(),
        slot_id: slot.clone(),
        start_time: "2024-06-01T09:00:00.000Z".to_string(),
        end_time: "2024-06-01T10:00:00.000Z".to_string(),
        status: BookingStatus::Confirmed,
        notes: None,
        total_price: 50.0,
        request_token: None,
        created_at: "2024-05-01T00:00:00.000Z".to_string(),
    };

    let created = BookingRepository::new(env.db.clone())
        .create_claiming_slot(slot, row)
        .await
        .unwrap();
    assert!(created.is_none());
    assert!(slot_available(&env.db, &slot_id).await);
}

#[tokio::test]
async fn cancel_unknown_booking_is_not_found() {
    let env = setup().await;

    let err = env
        .manager
        .cancel_booking(&admin(), "bookings:missing")
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::BookingNotFound(_)));
}
