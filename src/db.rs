//! SQLite connection setup and schema migration.

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{path::Path, str::FromStr};

/// Schema applied by [`run_migrations`]. Every statement is idempotent.
pub const INIT_SCHEMA: &str = include_str!("../migrations/0001_init.sql");

/// Open a pool for `database_url`, creating the database file (and its parent
/// directory) if missing.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let db_path = options.get_filename();
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() && db_path != Path::new(":memory:") {
            std::fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

/// Single-connection in-memory database with the schema applied.
///
/// The pool never recycles its connection, otherwise the database would vanish.
pub async fn open_in_memory() -> Result<SqlitePool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Run the embedded schema statement by statement.
pub async fn run_migrations(db: &SqlitePool) -> Result<(), sqlx::Error> {
    let statements = INIT_SCHEMA
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(())
}

/// Return true if SQLx error indicates a unique constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = open_in_memory().await.unwrap();
        run_migrations(&pool).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(tables, vec!["bookings", "users", "vehicles"]);
    }
}
