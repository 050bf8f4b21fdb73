//! Database connection and schema bootstrap.

use crate::orm::{categories, comments, genres, reviews, title_genres, titles, users};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
    Statement,
};
use std::time::Duration;

/// Unique indexes that the entity definitions cannot express.
/// Each one backs an invariant that must hold under concurrent writes.
const UNIQUE_INDEXES: &[&str] = &[
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_users_username ON users (username)",
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_users_email ON users (email)",
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_categories_slug ON categories (slug)",
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_genres_slug ON genres (slug)",
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_title_genres_pair ON title_genres (genre_id, title_id)",
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_reviews_title_author ON reviews (title_id, author_id)",
    "CREATE INDEX IF NOT EXISTS ix_reviews_pub_date ON reviews (pub_date)",
    "CREATE INDEX IF NOT EXISTS ix_comments_pub_date ON comments (pub_date)",
];

/// Opens a connection pool.
///
/// In-memory SQLite databases live inside a single connection, so the pool is
/// pinned to exactly one connection for them.
pub async fn connect(url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(url.to_owned());

    if url.starts_with("sqlite") && url.contains(":memory:") {
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(max_connections)
            .connect_timeout(Duration::from_secs(8));
    }

    let db = Database::connect(opt).await?;
    log::info!("Connected to database ({:?})", db.get_database_backend());
    Ok(db)
}

/// Creates every table, then the unique indexes. Safe to run repeatedly.
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Parents before children so foreign keys resolve.
    create_table(db, users::Entity).await?;
    create_table(db, categories::Entity).await?;
    create_table(db, genres::Entity).await?;
    create_table(db, titles::Entity).await?;
    create_table(db, title_genres::Entity).await?;
    create_table(db, reviews::Entity).await?;
    create_table(db, comments::Entity).await?;

    let backend = db.get_database_backend();
    for sql in UNIQUE_INDEXES {
        db.execute(Statement::from_string(backend, sql.to_string()))
            .await?;
    }

    log::debug!("Database schema is up to date");
    Ok(())
}

async fn create_table<E>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let stmt = schema
        .create_table_from_entity(entity)
        .if_not_exists()
        .to_owned();

    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// Returns true if the error is a unique constraint violation.
///
/// Driver errors only carry the backend's message at this layer, so this
/// matches the wording used by PostgreSQL, SQLite and MySQL.
pub fn is_unique_violation(err: &DbErr) -> bool {
    let msg = match err {
        DbErr::Exec(msg) | DbErr::Query(msg) | DbErr::Custom(msg) => msg,
        _ => return false,
    };

    msg.contains("duplicate key value violates unique constraint")
        || msg.contains("UNIQUE constraint failed")
        || msg.contains("Duplicate entry")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_detection() {
        assert!(is_unique_violation(&DbErr::Exec(
            "error returned from database: UNIQUE constraint failed: reviews.title_id, reviews.author_id"
                .to_owned()
        )));
        assert!(is_unique_violation(&DbErr::Query(
            "duplicate key value violates unique constraint \"uq_users_username\"".to_owned()
        )));
        assert!(!is_unique_violation(&DbErr::Exec(
            "FOREIGN KEY constraint failed".to_owned()
        )));
        assert!(!is_unique_violation(&DbErr::RecordNotFound(
            "users".to_owned()
        )));
    }
}
