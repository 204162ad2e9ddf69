use crate::db::storage::{CategoryStorage, ProductStorage};
use crate::handlers::{auth, category, product};
use crate::service::Accounts;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct CatalogState {
    pub accounts: Accounts,
    pub categories: Arc<dyn CategoryStorage>,
    pub products: Arc<dyn ProductStorage>,
    pub insecure_cookie: bool,
}

impl CatalogState {
    pub fn new(
        accounts: Accounts,
        categories: Arc<dyn CategoryStorage>,
        products: Arc<dyn ProductStorage>,
        insecure_cookie: bool,
    ) -> Self {
        Self {
            accounts,
            categories,
            products,
            insecure_cookie,
        }
    }
}

pub fn catalog_router(state: CatalogState) -> Router {
    let api = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/category/getAll", get(category::get_all))
        .route("/category/add", post(category::add))
        .route("/category/updateName", post(category::update_name))
        .route("/category/delete/{id}", post(category::delete))
        .route("/product/get/{categoryId}", get(product::get_by_category))
        .route("/product/add", post(product::add))
        .route("/product/updateName", post(product::update_name))
        .route("/product/updateCategory", post(product::update_category))
        .route("/product/delete/{id}", post(product::delete));

    Router::new().nest("/api/v1", api).with_state(state)
}
