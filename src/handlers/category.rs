use crate::db::models::Category;
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
pub struct AddCategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryNameRequest {
    pub category_id: i64,
    pub new_name: String,
}

/// GET /api/v1/category/getAll
pub async fn get_all(State(state): State<CatalogState>) -> Result<Json<Vec<Category>>, CatalogError> {
    Ok(Json(state.categories.list_categories().await?))
}

/// POST /api/v1/category/add
pub async fn add(
    State(state): State<CatalogState>,
    CurrentSession(session): CurrentSession,
    payload: Result<Json<AddCategoryRequest>, JsonRejection>,
) -> Result<Json<Category>, CatalogError> {
    let req = json_body(payload)?;
    require_name("name", &req.name)?;

    let category = state.categories.add_category(&req.name).await?;
    info!(category_id = category.id, user_id = session.user_id, "category added");
    Ok(Json(category))
}

/// POST /api/v1/category/updateName
pub async fn update_name(
    State(state): State<CatalogState>,
    _session: CurrentSession,
    payload: Result<Json<UpdateCategoryNameRequest>, JsonRejection>,
) -> Result<StatusCode, CatalogError> {
    let req = json_body(payload)?;
    require_id("categoryId", req.category_id)?;
    require_name("newName", &req.new_name)?;

    state
        .categories
        .rename_category(req.category_id, &req.new_name)
        .await?;
    Ok(StatusCode::OK)
}

/// POST /api/v1/category/delete/{id}
pub async fn delete(
    State(state): State<CatalogState>,
    _session: CurrentSession,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, CatalogError> {
    let id = path_id(id)?;
    state.categories.delete_category(id).await?;
    info!(category_id = id, "category deleted");
    Ok(StatusCode::OK)
}
