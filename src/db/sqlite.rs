use crate::db::schema::SQLITE_INIT;
use crate::error::CatalogError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use tracing::info;

pub type SqlitePool = Pool<Sqlite>;

/// Constraint class of a failed statement, used to translate storage errors
/// into domain errors at the store boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Violation {
    Unique,
    ForeignKey,
}

pub(crate) fn violation(err: &sqlx::Error) -> Option<Violation> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    if db_err.is_unique_violation() {
        Some(Violation::Unique)
    } else if db_err.is_foreign_key_violation() {
        Some(Violation::ForeignKey)
    } else {
        None
    }
}

/// Open a pool for `database_url` and make sure the schema exists.
pub async fn connect(database_url: &str) -> Result<SqlitePool, CatalogError> {
    let connect_opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
    init_schema(&pool).await?;
    info!(database_url = %database_url, "catalog database ready");
    Ok(pool)
}

/// Single-connection in-memory database. The connection is never recycled,
/// since dropping it would drop the database with it.
pub async fn connect_in_memory() -> Result<SqlitePool, CatalogError> {
    let connect_opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(connect_opts)
        .await?;
    init_schema(&pool).await?;
    Ok(pool)
}

/// Initialize the schema by executing the bundled DDL.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), CatalogError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_init_is_idempotent() {
        let pool = connect_in_memory().await.unwrap();
        init_schema(&pool).await.unwrap();
        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        assert_eq!(
            names,
            ["category", "product", "product_category", "session", "users"]
        );
    }

    #[tokio::test]
    async fn unique_violation_is_classified() {
        let pool = connect_in_memory().await.unwrap();
        sqlx::query("INSERT INTO category (name) VALUES ('phone')")
            .execute(&pool)
            .await
            .unwrap();
        let err = sqlx::query("INSERT INTO category (name) VALUES ('phone')")
            .execute(&pool)
            .await
            .unwrap_err();
        assert_eq!(violation(&err), Some(Violation::Unique));
    }

    #[tokio::test]
    async fn foreign_key_violation_is_classified() {
        let pool = connect_in_memory().await.unwrap();
        let err = sqlx::query("INSERT INTO product_category (product_id, category_id) VALUES (1, 1)")
            .execute(&pool)
            .await
            .unwrap_err();
        assert_eq!(violation(&err), Some(Violation::ForeignKey));
    }
}
