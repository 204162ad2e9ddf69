use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
}

/// One record of a feed page: a product name and the category it is listed under.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct FeedProduct {
    #[serde(rename = "title")]
    pub product_name: String,
    #[serde(rename = "category")]
    pub category_name: String,
}

impl FeedProduct {
    pub fn new(product_name: impl Into<String>, category_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            category_name: category_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub login: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub expiry: DateTime<Utc>,
}

impl Session {
    /// A session is valid only while `now < expiry`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry
    }
}

/// Raw `session` row; `expires_at` is unix milliseconds.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct DbSession {
    pub token: String,
    pub user_id: i64,
    pub expires_at: i64,
}

impl From<DbSession> for Session {
    fn from(d: DbSession) -> Self {
        Session {
            token: d.token,
            user_id: d.user_id,
            expiry: DateTime::from_timestamp_millis(d.expires_at).unwrap_or(DateTime::UNIX_EPOCH),
        }
    }
}
