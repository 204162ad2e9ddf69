use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::error;

#[derive(Debug, ThisError)]
pub enum CatalogError {
    #[error("no data found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("category doesn't exist")]
    CategoryNotFound,

    #[error("unauthorized")]
    Unauthorized,

    #[error("session token is expired")]
    SessionExpired,

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("Feed request error: {0}")]
    Feed(#[from] reqwest::Error),

    #[error("Feed responded with status: {0}")]
    FeedStatus(StatusCode),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task error: {0}")]
    TaskJoin(String),
}

impl CatalogError {
    /// Unique-constraint collisions; the only kind the session retry loop reacts to.
    pub fn is_collision(&self) -> bool {
        matches!(self, CatalogError::AlreadyExists)
    }
}

impl From<figment::Error> for CatalogError {
    fn from(e: figment::Error) -> Self {
        CatalogError::Config(Box::new(e))
    }
}

impl From<tokio::task::JoinError> for CatalogError {
    fn from(e: tokio::task::JoinError) -> Self {
        CatalogError::TaskJoin(e.to_string())
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match &self {
            CatalogError::AlreadyExists => (
                StatusCode::CONFLICT,
                "ALREADY_EXISTS",
                "Resource already exists.".to_string(),
            ),
            CatalogError::NotFound => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Resource not found.".to_string(),
            ),
            CatalogError::CategoryNotFound => (
                StatusCode::BAD_REQUEST,
                "CATEGORY_NOT_FOUND",
                "Category doesn't exist.".to_string(),
            ),
            CatalogError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
            CatalogError::Unauthorized | CatalogError::SessionExpired => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required.".to_string(),
            ),
            CatalogError::Feed(_) | CatalogError::FeedStatus(_) => (
                StatusCode::BAD_GATEWAY,
                "BAD_GATEWAY",
                "Upstream feed is unavailable.".to_string(),
            ),
            CatalogError::Database(_)
            | CatalogError::UrlParse(_)
            | CatalogError::Json(_)
            | CatalogError::PasswordHash(_)
            | CatalogError::Config(_)
            | CatalogError::Io(_)
            | CatalogError::TaskJoin(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred.".to_string(),
            ),
        };
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = ApiErrorResponse {
            error: ApiErrorBody {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
