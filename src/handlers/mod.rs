pub mod auth;
pub mod category;
pub mod product;

use axum::Json;
use axum::extract::Path;
use axum::extract::rejection::{JsonRejection, PathRejection};

use crate::error::CatalogError;

/// Unwrap a JSON body, turning decode failures into the API's 400 envelope.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, CatalogError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| CatalogError::BadRequest(e.body_text()))
}

pub(crate) fn path_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, CatalogError> {
    let Path(id) = path.map_err(|e| CatalogError::BadRequest(e.body_text()))?;
    require_id("id", id)?;
    Ok(id)
}

pub(crate) fn require_name(field: &str, value: &str) -> Result<(), CatalogError> {
    if value.trim().is_empty() {
        return Err(CatalogError::BadRequest(format!("`{field}` must not be empty")));
    }
    Ok(())
}

pub(crate) fn require_id(field: &str, id: i64) -> Result<(), CatalogError> {
    if id <= 0 {
        return Err(CatalogError::BadRequest(format!("`{field}` must be a positive id")));
    }
    Ok(())
}
