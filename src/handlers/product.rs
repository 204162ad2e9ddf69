use crate::db::models::Product;
use crate::error::CatalogError;
use crate::handlers::{json_body, path_id, require_id, require_name};
use crate::middleware::CurrentSession;
use crate::router::CatalogState;
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddProductRequest {
    pub product_name: String,
    pub category_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductNameRequest {
    pub product_id: i64,
    pub new_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductCategoryRequest {
    pub product_id: i64,
    pub old_category_id: i64,
    pub new_category_id: i64,
}

/// GET /api/v1/product/get/{categoryId}
pub async fn get_by_category(
    State(state): State<CatalogState>,
    category_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<Product>>, CatalogError> {
    let category_id = path_id(category_id)?;
    Ok(Json(state.products.products_by_category(category_id).await?))
}

/// POST /api/v1/product/add
pub async fn add(
    State(state): State<CatalogState>,
    CurrentSession(session): CurrentSession,
    payload: Result<Json<AddProductRequest>, JsonRejection>,
) -> Result<Json<Product>, CatalogError> {
    let req = json_body(payload)?;
    require_name("productName", &req.product_name)?;
    require_id("categoryId", req.category_id)?;

    let product = state
        .products
        .add_product(&req.product_name, req.category_id)
        .await?;
    info!(
        product_id = product.id,
        category_id = req.category_id,
        user_id = session.user_id,
        "product added"
    );
    Ok(Json(product))
}

/// POST /api/v1/product/updateName
pub async fn update_name(
    State(state): State<CatalogState>,
    _session: CurrentSession,
    payload: Result<Json<UpdateProductNameRequest>, JsonRejection>,
) -> Result<StatusCode, CatalogError> {
    let req = json_body(payload)?;
    require_id("productId", req.product_id)?;
    require_name("newName", &req.new_name)?;

    state
        .products
        .rename_product(req.product_id, &req.new_name)
        .await?;
    Ok(StatusCode::OK)
}

/// POST /api/v1/product/updateCategory
pub async fn update_category(
    State(state): State<CatalogState>,
    _session: CurrentSession,
    payload: Result<Json<UpdateProductCategoryRequest>, JsonRejection>,
) -> Result<StatusCode, CatalogError> {
    let req = json_body(payload)?;
    require_id("productId", req.product_id)?;
    require_id("oldCategoryId", req.old_category_id)?;
    require_id("newCategoryId", req.new_category_id)?;

    state
        .products
        .recategorize_product(req.product_id, req.old_category_id, req.new_category_id)
        .await?;
    Ok(StatusCode::OK)
}

/// POST /api/v1/product/delete/{id}
pub async fn delete(
    State(state): State<CatalogState>,
    _session: CurrentSession,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, CatalogError> {
    let id = path_id(id)?;
    state.products.delete_product(id).await?;
    info!(product_id = id, "product deleted");
    Ok(StatusCode::OK)
}
