//! Test database setup and management
#![allow(dead_code)]

use sea_orm::{DatabaseConnection, DbErr};

/// Fresh in-memory SQLite database with the full schema.
///
/// Every call returns an isolated database, so tests can run in parallel.
pub async fn setup_test_database() -> Result<DatabaseConnection, DbErr> {
    let db = yamdb::db::connect("sqlite::memory:", 1).await?;
    yamdb::db::create_schema(&db).await?;
    Ok(db)
}
