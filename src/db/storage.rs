//! Capability traits for the persistence layer.
//!
//! Each trait has one SQLite implementation (`db::product`, `db::category`,
//! `db::session`, `db::user`) and one in-memory fake (`db::memory`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::models::{Category, FeedProduct, NewUser, Product, Session, User};
use crate::error::CatalogError;

#[async_trait]
pub trait ProductStorage: Send + Sync {
    /// Upsert one feed page in a single transaction: categories, products,
    /// then association rows. All-or-nothing; an empty batch is a no-op.
    async fn reconcile_batch(&self, items: &[FeedProduct]) -> Result<(), CatalogError>;

    async fn add_product(&self, name: &str, category_id: i64) -> Result<Product, CatalogError>;

    async fn products_by_category(&self, category_id: i64) -> Result<Vec<Product>, CatalogError>;

    async fn rename_product(&self, id: i64, new_name: &str) -> Result<(), CatalogError>;

    /// Move the `(product_id, old_category_id)` association to `new_category_id`.
    async fn recategorize_product(
        &self,
        product_id: i64,
        old_category_id: i64,
        new_category_id: i64,
    ) -> Result<(), CatalogError>;

    async fn delete_product(&self, id: i64) -> Result<(), CatalogError>;
}

#[async_trait]
pub trait CategoryStorage: Send + Sync {
    async fn add_category(&self, name: &str) -> Result<Category, CatalogError>;

    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError>;

    async fn rename_category(&self, id: i64, new_name: &str) -> Result<(), CatalogError>;

    async fn delete_category(&self, id: i64) -> Result<(), CatalogError>;
}

#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Fails with `AlreadyExists` when the token is taken.
    async fn create_session(&self, session: &Session) -> Result<(), CatalogError>;

    async fn session_by_token(&self, token: &str) -> Result<Session, CatalogError>;

    async fn delete_session(&self, token: &str) -> Result<(), CatalogError>;

    /// Remove every session whose expiry is at or before `now`. Returns the number removed.
    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, CatalogError>;
}

#[async_trait]
pub trait UserStorage: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, CatalogError>;

    async fn user_by_login(&self, login: &str) -> Result<User, CatalogError>;
}
