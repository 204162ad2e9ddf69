use crate::db::models::{NewUser, User};
use crate::db::sqlite::SqlitePool;
use crate::db::storage::UserStorage;
use crate::error::CatalogError;
use async_trait::async_trait;

#[derive(Clone)]
pub struct SqliteUsers {
    pool: SqlitePool,
}

impl SqliteUsers {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStorage for SqliteUsers {
    async fn create_user(&self, user: NewUser) -> Result<User, CatalogError> {
        let created: Option<User> = sqlx::query_as(
            r#"INSERT INTO users (login, password_hash) VALUES (?, ?)
               ON CONFLICT(login) DO NOTHING
               RETURNING id, login, password_hash"#,
        )
        .bind(user.login)
        .bind(user.password_hash)
        .fetch_optional(&self.pool)
        .await?;
        created.ok_or(CatalogError::AlreadyExists)
    }

    async fn user_by_login(&self, login: &str) -> Result<User, CatalogError> {
        let user: Option<User> =
            sqlx::query_as("SELECT id, login, password_hash FROM users WHERE login = ?")
                .bind(login)
                .fetch_optional(&self.pool)
                .await?;
        user.ok_or(CatalogError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::connect_in_memory;

    #[tokio::test]
    async fn login_is_unique() {
        let store = SqliteUsers::new(connect_in_memory().await.unwrap());
        let new_user = NewUser {
            login: "gleb".into(),
            password_hash: "hash".into(),
        };
        let user = store.create_user(new_user.clone()).await.unwrap();
        assert_eq!(store.user_by_login("gleb").await.unwrap(), user);

        let err = store.create_user(new_user).await.unwrap_err();
        assert!(matches!(err, CatalogError::AlreadyExists));
        assert!(matches!(
            store.user_by_login("nobody").await,
            Err(CatalogError::NotFound)
        ));
    }
}
