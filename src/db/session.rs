use crate::db::models::{DbSession, Session};
use crate::db::sqlite::{SqlitePool, Violation, violation};
use crate::db::storage::SessionStorage;
use crate::error::CatalogError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, error};

#[derive(Clone)]
pub struct SqliteSessions {
    pool: SqlitePool,
}

impl SqliteSessions {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStorage for SqliteSessions {
    async fn create_session(&self, session: &Session) -> Result<(), CatalogError> {
        sqlx::query("INSERT INTO session (token, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(&session.token)
            .bind(session.user_id)
            .bind(session.expiry.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| match violation(&e) {
                Some(Violation::Unique) => CatalogError::AlreadyExists,
                _ => {
                    error!(error = %e, "error adding new session to db");
                    e.into()
                }
            })?;
        Ok(())
    }

    async fn session_by_token(&self, token: &str) -> Result<Session, CatalogError> {
        let row: Option<DbSession> =
            sqlx::query_as("SELECT token, user_id, expires_at FROM session WHERE token = ?")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Session::from).ok_or(CatalogError::NotFound)
    }

    async fn delete_session(&self, token: &str) -> Result<(), CatalogError> {
        let res = sqlx::query("DELETE FROM session WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(CatalogError::NotFound);
        }
        Ok(())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, CatalogError> {
        let res = sqlx::query("DELETE FROM session WHERE expires_at <= ?")
            .bind(now.timestamp_millis())
            .execute(&self.pool)
            .await
            .inspect_err(|e| error!(error = %e, "error deleting expired sessions"))?;
        let swept = res.rows_affected();
        if swept > 0 {
            debug!(swept, "expired sessions removed");
        }
        Ok(swept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::NewUser;
    use crate::db::sqlite::connect_in_memory;
    use crate::db::storage::UserStorage;
    use crate::db::user::SqliteUsers;
    use chrono::TimeDelta;

    async fn setup() -> (SqliteSessions, i64) {
        let pool = connect_in_memory().await.unwrap();
        let user = SqliteUsers::new(pool.clone())
            .create_user(NewUser {
                login: "gleb".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        (SqliteSessions::new(pool), user.id)
    }

    fn session(token: &str, user_id: i64, expiry: DateTime<Utc>) -> Session {
        Session {
            token: token.to_string(),
            user_id,
            expiry,
        }
    }

    #[tokio::test]
    async fn create_and_fetch() {
        let (store, user_id) = setup().await;
        let expiry = DateTime::from_timestamp_millis(Utc::now().timestamp_millis()).unwrap()
            + TimeDelta::hours(24);
        let s = session("abc", user_id, expiry);
        store.create_session(&s).await.unwrap();

        assert_eq!(store.session_by_token("abc").await.unwrap(), s);
        let missing = store.session_by_token("nope").await.unwrap_err();
        assert!(matches!(missing, CatalogError::NotFound));
    }

    #[tokio::test]
    async fn duplicate_token_is_a_collision() {
        let (store, user_id) = setup().await;
        let expiry = Utc::now() + TimeDelta::hours(1);
        store
            .create_session(&session("abc", user_id, expiry))
            .await
            .unwrap();
        let err = store
            .create_session(&session("abc", user_id, expiry))
            .await
            .unwrap_err();
        assert!(err.is_collision());
    }

    #[tokio::test]
    async fn sweep_removes_only_expired() {
        let (store, user_id) = setup().await;
        let now = Utc::now();
        store
            .create_session(&session("old", user_id, now - TimeDelta::minutes(1)))
            .await
            .unwrap();
        store
            .create_session(&session("fresh", user_id, now + TimeDelta::minutes(1)))
            .await
            .unwrap();

        assert_eq!(store.delete_expired_sessions(now).await.unwrap(), 1);
        assert!(store.session_by_token("fresh").await.is_ok());
        assert!(matches!(
            store.session_by_token("old").await,
            Err(CatalogError::NotFound)
        ));
    }

    #[tokio::test]
    async fn delete_reports_missing_token() {
        let (store, user_id) = setup().await;
        store
            .create_session(&session("abc", user_id, Utc::now() + TimeDelta::hours(1)))
            .await
            .unwrap();
        store.delete_session("abc").await.unwrap();
        let err = store.delete_session("abc").await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound));
    }
}
