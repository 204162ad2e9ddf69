//! In-memory implementation of every storage trait.
//!
//! Mirrors the SQLite constraints (unique names, foreign keys, cascades) so
//! services can be exercised without a database. Faults can be injected to
//! drive error paths: forced session-token collisions and failing
//! reconciliations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::db::models::{Category, FeedProduct, NewUser, Product, Session, User};
use crate::db::storage::{CategoryStorage, ProductStorage, SessionStorage, UserStorage};
use crate::error::CatalogError;

#[derive(Debug, Clone, Default)]
struct Catalog {
    categories: BTreeMap<i64, String>,
    products: BTreeMap<i64, String>,
    links: BTreeSet<(i64, i64)>,
    next_category_id: i64,
    next_product_id: i64,
}

impl Catalog {
    fn category_id(&self, name: &str) -> Option<i64> {
        self.categories
            .iter()
            .find_map(|(id, n)| (n == name).then_some(*id))
    }

    fn product_id(&self, name: &str) -> Option<i64> {
        self.products
            .iter()
            .find_map(|(id, n)| (n == name).then_some(*id))
    }

    fn upsert_category(&mut self, name: &str) -> i64 {
        if let Some(id) = self.category_id(name) {
            return id;
        }
        self.next_category_id += 1;
        self.categories.insert(self.next_category_id, name.to_string());
        self.next_category_id
    }

    fn upsert_product(&mut self, name: &str) -> i64 {
        if let Some(id) = self.product_id(name) {
            return id;
        }
        self.next_product_id += 1;
        self.products.insert(self.next_product_id, name.to_string());
        self.next_product_id
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    catalog: Catalog,
    users: BTreeMap<i64, User>,
    next_user_id: i64,
    sessions: HashMap<String, Session>,
    forced_collisions: usize,
    fail_reconcile: bool,
    reconciled_batches: Vec<Vec<FeedProduct>>,
}

#[derive(Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` session inserts fail as token collisions.
    pub async fn force_session_collisions(&self, n: usize) {
        self.state.lock().await.forced_collisions = n;
    }

    /// Make every following `reconcile_batch` fail with a storage error.
    pub async fn fail_reconcile(&self, fail: bool) {
        self.state.lock().await.fail_reconcile = fail;
    }

    /// Batches committed so far, in order.
    pub async fn reconciled_batches(&self) -> Vec<Vec<FeedProduct>> {
        self.state.lock().await.reconciled_batches.clone()
    }

    /// Every (product, category) association by name, sorted.
    pub async fn links(&self) -> Vec<(String, String)> {
        let state = self.state.lock().await;
        let catalog = &state.catalog;
        let mut links: Vec<(String, String)> = catalog
            .links
            .iter()
            .filter_map(|(p, c)| Some((catalog.products.get(p)?.clone(), catalog.categories.get(c)?.clone())))
            .collect();
        links.sort();
        links
    }

    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }
}

#[async_trait]
impl ProductStorage for MemoryStorage {
    async fn reconcile_batch(&self, items: &[FeedProduct]) -> Result<(), CatalogError> {
        if items.is_empty() {
            return Ok(());
        }
        let mut state = self.state.lock().await;
        if state.fail_reconcile {
            return Err(sqlx::Error::Protocol("injected reconcile failure".to_string()).into());
        }

        // one link per product; a repeated product keeps its last category
        let mut latest: Vec<(&str, &str)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for item in items {
            let product = item.product_name.as_str();
            let category = item.category_name.as_str();
            match index.get(product) {
                Some(&i) => latest[i].1 = category,
                None => {
                    index.insert(product, latest.len());
                    latest.push((product, category));
                }
            }
        }

        let mut staged = state.catalog.clone();
        for item in items {
            staged.upsert_category(&item.category_name);
        }
        for (product, category) in latest {
            let category_id = staged.upsert_category(category);
            let product_id = staged.upsert_product(product);
            staged.links.insert((product_id, category_id));
        }
        state.catalog = staged;
        state.reconciled_batches.push(items.to_vec());
        Ok(())
    }

    async fn add_product(&self, name: &str, category_id: i64) -> Result<Product, CatalogError> {
        let mut state = self.state.lock().await;
        let catalog = &mut state.catalog;
        if !catalog.categories.contains_key(&category_id) {
            return Err(CatalogError::CategoryNotFound);
        }
        if catalog.product_id(name).is_some() {
            return Err(CatalogError::AlreadyExists);
        }
        let id = catalog.upsert_product(name);
        catalog.links.insert((id, category_id));
        Ok(Product {
            id,
            name: name.to_string(),
        })
    }

    async fn products_by_category(&self, category_id: i64) -> Result<Vec<Product>, CatalogError> {
        let state = self.state.lock().await;
        let catalog = &state.catalog;
        if !catalog.categories.contains_key(&category_id) {
            return Err(CatalogError::CategoryNotFound);
        }
        let mut products: Vec<Product> = catalog
            .links
            .iter()
            .filter(|(_, c)| *c == category_id)
            .filter_map(|(p, _)| {
                catalog.products.get(p).map(|name| Product {
                    id: *p,
                    name: name.clone(),
                })
            })
            .collect();
        products.sort_by_key(|p| p.id);
        Ok(products)
    }

    async fn rename_product(&self, id: i64, new_name: &str) -> Result<(), CatalogError> {
        let mut state = self.state.lock().await;
        let catalog = &mut state.catalog;
        if catalog.product_id(new_name).is_some_and(|other| other != id) {
            return Err(CatalogError::AlreadyExists);
        }
        let name = catalog.products.get_mut(&id).ok_or(CatalogError::NotFound)?;
        *name = new_name.to_string();
        Ok(())
    }

    async fn recategorize_product(
        &self,
        product_id: i64,
        old_category_id: i64,
        new_category_id: i64,
    ) -> Result<(), CatalogError> {
        let mut state = self.state.lock().await;
        let catalog = &mut state.catalog;
        if !catalog.links.contains(&(product_id, old_category_id)) {
            return Err(CatalogError::NotFound);
        }
        if old_category_id == new_category_id {
            return Ok(());
        }
        if catalog.links.contains(&(product_id, new_category_id)) {
            return Err(CatalogError::AlreadyExists);
        }
        if !catalog.categories.contains_key(&new_category_id) {
            return Err(CatalogError::CategoryNotFound);
        }
        catalog.links.remove(&(product_id, old_category_id));
        catalog.links.insert((product_id, new_category_id));
        Ok(())
    }

    async fn delete_product(&self, id: i64) -> Result<(), CatalogError> {
        let mut state = self.state.lock().await;
        let catalog = &mut state.catalog;
        catalog.products.remove(&id).ok_or(CatalogError::NotFound)?;
        catalog.links.retain(|(p, _)| *p != id);
        Ok(())
    }
}

#[async_trait]
impl CategoryStorage for MemoryStorage {
    async fn add_category(&self, name: &str) -> Result<Category, CatalogError> {
        let mut state = self.state.lock().await;
        let catalog = &mut state.catalog;
        if catalog.category_id(name).is_some() {
            return Err(CatalogError::AlreadyExists);
        }
        let id = catalog.upsert_category(name);
        Ok(Category {
            id,
            name: name.to_string(),
        })
    }

    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        let state = self.state.lock().await;
        Ok(state
            .catalog
            .categories
            .iter()
            .map(|(id, name)| Category {
                id: *id,
                name: name.clone(),
            })
            .collect())
    }

    async fn rename_category(&self, id: i64, new_name: &str) -> Result<(), CatalogError> {
        let mut state = self.state.lock().await;
        let catalog = &mut state.catalog;
        if catalog.category_id(new_name).is_some_and(|other| other != id) {
            return Err(CatalogError::AlreadyExists);
        }
        let name = catalog.categories.get_mut(&id).ok_or(CatalogError::NotFound)?;
        *name = new_name.to_string();
        Ok(())
    }

    async fn delete_category(&self, id: i64) -> Result<(), CatalogError> {
        let mut state = self.state.lock().await;
        let catalog = &mut state.catalog;
        catalog.categories.remove(&id).ok_or(CatalogError::NotFound)?;
        catalog.links.retain(|(_, c)| *c != id);
        Ok(())
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn create_session(&self, session: &Session) -> Result<(), CatalogError> {
        let mut state = self.state.lock().await;
        if state.forced_collisions > 0 {
            state.forced_collisions -= 1;
            return Err(CatalogError::AlreadyExists);
        }
        if state.sessions.contains_key(&session.token) {
            return Err(CatalogError::AlreadyExists);
        }
        state
            .sessions
            .insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn session_by_token(&self, token: &str) -> Result<Session, CatalogError> {
        let state = self.state.lock().await;
        state
            .sessions
            .get(token)
            .cloned()
            .ok_or(CatalogError::NotFound)
    }

    async fn delete_session(&self, token: &str) -> Result<(), CatalogError> {
        let mut state = self.state.lock().await;
        state
            .sessions
            .remove(token)
            .map(|_| ())
            .ok_or(CatalogError::NotFound)
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, CatalogError> {
        let mut state = self.state.lock().await;
        let before = state.sessions.len();
        state.sessions.retain(|_, s| !s.is_expired_at(now));
        Ok((before - state.sessions.len()) as u64)
    }
}

#[async_trait]
impl UserStorage for MemoryStorage {
    async fn create_user(&self, user: NewUser) -> Result<User, CatalogError> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.login == user.login) {
            return Err(CatalogError::AlreadyExists);
        }
        state.next_user_id += 1;
        let created = User {
            id: state.next_user_id,
            login: user.login,
            password_hash: user.password_hash,
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn user_by_login(&self, login: &str) -> Result<User, CatalogError> {
        let state = self.state.lock().await;
        state
            .users
            .values()
            .find(|u| u.login == login)
            .cloned()
            .ok_or(CatalogError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reconcile_matches_sqlite_semantics() {
        let store = MemoryStorage::new();
        store
            .reconcile_batch(&[
                FeedProduct::new("iphone", "phone"),
                FeedProduct::new("redmi", "phone"),
            ])
            .await
            .unwrap();
        store
            .reconcile_batch(&[FeedProduct::new("redmi", "tablet")])
            .await
            .unwrap();

        assert_eq!(store.list_categories().await.unwrap().len(), 2);
        assert_eq!(
            store.links().await,
            vec![
                ("iphone".to_string(), "phone".to_string()),
                ("redmi".to_string(), "phone".to_string()),
                ("redmi".to_string(), "tablet".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn product_listed_twice_keeps_last_category() {
        let store = MemoryStorage::new();
        store
            .reconcile_batch(&[
                FeedProduct::new("redmi", "phone"),
                FeedProduct::new("redmi", "tablet"),
            ])
            .await
            .unwrap();

        assert_eq!(store.list_categories().await.unwrap().len(), 2);
        assert_eq!(
            store.links().await,
            vec![("redmi".to_string(), "tablet".to_string())]
        );
    }

    #[tokio::test]
    async fn failing_reconcile_leaves_catalog_untouched() {
        let store = MemoryStorage::new();
        store.fail_reconcile(true).await;
        let err = store
            .reconcile_batch(&[FeedProduct::new("iphone", "phone")])
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Database(_)));
        assert!(store.list_categories().await.unwrap().is_empty());
        assert!(store.reconciled_batches().await.is_empty());
    }

    #[tokio::test]
    async fn recategorize_mirrors_constraints() {
        let store = MemoryStorage::new();
        store
            .reconcile_batch(&[FeedProduct::new("iphone", "phone")])
            .await
            .unwrap();
        assert!(matches!(
            store.recategorize_product(1, 1, 5).await,
            Err(CatalogError::CategoryNotFound)
        ));
        assert!(matches!(
            store.recategorize_product(1, 2, 1).await,
            Err(CatalogError::NotFound)
        ));
        assert_eq!(store.products_by_category(1).await.unwrap().len(), 1);
    }
}
