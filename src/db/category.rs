use crate::db::models::Category;
use crate::db::sqlite::{SqlitePool, Violation, violation};
use crate::db::storage::CategoryStorage;
use crate::error::CatalogError;
use async_trait::async_trait;
use tracing::debug;

#[derive(Clone)]
pub struct SqliteCategories {
    pool: SqlitePool,
}

impl SqliteCategories {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn unique_as_exists(e: sqlx::Error) -> CatalogError {
    match violation(&e) {
        Some(Violation::Unique) => CatalogError::AlreadyExists,
        _ => e.into(),
    }
}

#[async_trait]
impl CategoryStorage for SqliteCategories {
    async fn add_category(&self, name: &str) -> Result<Category, CatalogError> {
        let category: Category =
            sqlx::query_as("INSERT INTO category (name) VALUES (?) RETURNING id, name")
                .bind(name)
                .fetch_one(&self.pool)
                .await
                .map_err(unique_as_exists)?;
        debug!(id = category.id, name, "category added");
        Ok(category)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        let categories: Vec<Category> = sqlx::query_as("SELECT id, name FROM category ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    async fn rename_category(&self, id: i64, new_name: &str) -> Result<(), CatalogError> {
        let res = sqlx::query("UPDATE category SET name = ? WHERE id = ?")
            .bind(new_name)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unique_as_exists)?;
        if res.rows_affected() == 0 {
            return Err(CatalogError::NotFound);
        }
        Ok(())
    }

    /// Association rows go with the category; the products stay.
    async fn delete_category(&self, id: i64) -> Result<(), CatalogError> {
        let res = sqlx::query("DELETE FROM category WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(CatalogError::NotFound);
        }
        Ok(())
    }
}
