//! Database Module
//!
//! Embedded SurrealDB (RocksDB engine) plus schema bootstrap.

pub mod models;
pub mod repository;

use crate::utils::AppError;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, RocksDb};

const NAMESPACE: &str = "booking";
const DATABASE: &str = "booking";

/// Database service — owns the embedded SurrealDB handle
#[derive(Clone)]
pub struct DbService {
    pub db: Surreal<Db>,
}

impl DbService {
    /// Open the database at the given directory and apply the schema
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        std::fs::create_dir_all(db_path)
            .map_err(|e| AppError::database(format!("Failed to create database dir: {e}")))?;

        let db: Surreal<Db> = Surreal::new::<RocksDb>(db_path)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;

        tracing::info!(path = %db_path, "Database connection established (SurrealDB RocksDB)");

        let service = Self { db };
        service.define_schema().await?;
        tracing::info!("Database schema applied");

        Ok(service)
    }

    /// SCHEMAFULL definitions for all four tables.
    ///
    /// IF NOT EXISTS keeps restarts cheap; new fields need a migration,
    /// not a redefinition here.
    async fn define_schema(&self) -> Result<(), AppError> {
        let response = self
            .db
            .query(
                r#"
                DEFINE TABLE IF NOT EXISTS users SCHEMAFULL;
                DEFINE FIELD IF NOT EXISTS name ON users TYPE string;
                DEFINE FIELD IF NOT EXISTS email ON users TYPE string;
                DEFINE FIELD IF NOT EXISTS hash_pass ON users TYPE string;
                DEFINE FIELD IF NOT EXISTS role ON users TYPE string;
                DEFINE FIELD IF NOT EXISTS is_active ON users TYPE bool;
                DEFINE FIELD IF NOT EXISTS created_at ON users TYPE string;
                DEFINE INDEX IF NOT EXISTS idx_users_email ON users FIELDS email UNIQUE;

                DEFINE TABLE IF NOT EXISTS resources SCHEMAFULL;
                DEFINE FIELD IF NOT EXISTS name ON resources TYPE string;
                DEFINE FIELD IF NOT EXISTS description ON resources TYPE option<string>;
                DEFINE FIELD IF NOT EXISTS category ON resources TYPE string;
                DEFINE FIELD IF NOT EXISTS location ON resources TYPE option<string>;
                DEFINE FIELD IF NOT EXISTS capacity ON resources TYPE int;
                DEFINE FIELD IF NOT EXISTS image_url ON resources TYPE option<string>;
                DEFINE FIELD IF NOT EXISTS is_active ON resources TYPE bool;
                DEFINE FIELD IF NOT EXISTS amenities ON resources TYPE array<string>;
                DEFINE FIELD IF NOT EXISTS price_per_hour ON resources TYPE float;
                DEFINE FIELD IF NOT EXISTS owner_id ON resources TYPE record<users>;
                DEFINE FIELD IF NOT EXISTS created_at ON resources TYPE string;
                DEFINE INDEX IF NOT EXISTS idx_resources_category ON resources FIELDS category;

                DEFINE TABLE IF NOT EXISTS slots SCHEMAFULL;
                DEFINE FIELD IF NOT EXISTS resource_id ON slots TYPE record<resources>;
                DEFINE FIELD IF NOT EXISTS start_time ON slots TYPE string;
                DEFINE FIELD IF NOT EXISTS end_time ON slots TYPE string;
                DEFINE FIELD IF NOT EXISTS date ON slots TYPE string;
                DEFINE FIELD IF NOT EXISTS is_available ON slots TYPE bool;
                DEFINE FIELD IF NOT EXISTS price ON slots TYPE float;
                DEFINE INDEX IF NOT EXISTS idx_slots_resource_date ON slots FIELDS resource_id, date;

                DEFINE TABLE IF NOT EXISTS bookings SCHEMAFULL;
                DEFINE FIELD IF NOT EXISTS user_id ON bookings TYPE record<users>;
                DEFINE FIELD IF NOT EXISTS user_name ON bookings TYPE string;
                DEFINE FIELD IF NOT EXISTS user_email ON bookings TYPE string;
                DEFINE FIELD IF NOT EXISTS resource_id ON bookings TYPE record<resources>;
                DEFINE FIELD IF NOT EXISTS resource_name ON bookings TYPE string;
                DEFINE FIELD IF NOT EXISTS slot_id ON bookings TYPE record<slots>;
                DEFINE FIELD IF NOT EXISTS start_time ON bookings TYPE string;
                DEFINE FIELD IF NOT EXISTS end_time ON bookings TYPE string;
                DEFINE FIELD IF NOT EXISTS status ON bookings TYPE string;
                DEFINE FIELD IF NOT EXISTS notes ON bookings TYPE option<string>;
                DEFINE FIELD IF NOT EXISTS total_price ON bookings TYPE float;
                DEFINE FIELD IF NOT EXISTS request_token ON bookings TYPE option<string>;
                DEFINE FIELD IF NOT EXISTS created_at ON bookings TYPE string;
                DEFINE INDEX IF NOT EXISTS idx_bookings_user ON bookings FIELDS user_id;
                DEFINE INDEX IF NOT EXISTS idx_bookings_resource ON bookings FIELDS resource_id;
                DEFINE INDEX IF NOT EXISTS idx_bookings_status ON bookings FIELDS status;
                DEFINE INDEX IF NOT EXISTS idx_bookings_token ON bookings FIELDS request_token;
                "#,
            )
            .await
            .map_err(|e| AppError::database(format!("Failed to apply schema: {e}")))?;

        response
            .check()
            .map_err(|e| AppError::database(format!("Schema statement failed: {e}")))?;

        Ok(())
    }
}
