use crate::db::models::{NewUser, Session};
use crate::db::storage::UserStorage;
use crate::error::CatalogError;
use crate::service::session_manager::SessionManager;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use std::sync::Arc;
use tracing::info;

fn hash_password(plain: &str) -> Result<String, CatalogError> {
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
        .map_err(|e| CatalogError::PasswordHash(e.to_string()))?;
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CatalogError::PasswordHash(e.to_string()))
}

fn verify_password(plain: &str, stored: &str) -> Result<bool, CatalogError> {
    let parsed = PasswordHash::new(stored).map_err(|e| CatalogError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Registration and login on top of the user store and session manager.
#[derive(Clone)]
pub struct Accounts {
    users: Arc<dyn UserStorage>,
    sessions: SessionManager,
}

impl Accounts {
    pub fn new(users: Arc<dyn UserStorage>, sessions: SessionManager) -> Self {
        Self { users, sessions }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Create a user and log them in. Duplicate logins fail with `AlreadyExists`.
    pub async fn register(&self, login: &str, password: &str) -> Result<Session, CatalogError> {
        let plain = password.to_owned();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&plain)).await??;
        let user = self
            .users
            .create_user(NewUser {
                login: login.to_owned(),
                password_hash,
            })
            .await?;
        info!(user_id = user.id, "user registered");
        self.sessions.create_session(user.id).await
    }

    /// Unknown logins and wrong passwords both fail with `Unauthorized`.
    pub async fn login(&self, login: &str, password: &str) -> Result<Session, CatalogError> {
        let user = match self.users.user_by_login(login).await {
            Ok(user) => user,
            Err(CatalogError::NotFound) => return Err(CatalogError::Unauthorized),
            Err(e) => return Err(e),
        };

        let plain = password.to_owned();
        let stored = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&plain, &stored)).await??;
        if !matches {
            return Err(CatalogError::Unauthorized);
        }
        self.sessions.create_session(user.id).await
    }

    pub async fn logout(&self, token: &str) -> Result<(), CatalogError> {
        self.sessions.delete_session(token).await
    }
}
