use crate::db::models::Session;
use crate::db::storage::SessionStorage;
use crate::error::CatalogError;
use backon::{ConstantBuilder, Retryable};
use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const TOKEN_LEN: usize = 64;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Creates, validates and deletes login sessions.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStorage>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStorage>, ttl: TimeDelta) -> Self {
        Self::with_clock(store, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn SessionStorage>, ttl: TimeDelta, clock: Arc<dyn Clock>) -> Self {
        Self { store, ttl, clock }
    }

    /// Persist a fresh session for `user_id`.
    ///
    /// A token collision regenerates the token and tries again, with no delay
    /// and no attempt cap. Any other storage error is returned as is.
    pub async fn create_session(&self, user_id: i64) -> Result<Session, CatalogError> {
        let policy = ConstantBuilder::default()
            .with_delay(Duration::ZERO)
            .without_max_times();

        (|| async {
            let session = Session {
                token: generate_token(),
                user_id,
                expiry: self.clock.now() + self.ttl,
            };
            self.store.create_session(&session).await?;
            Ok::<_, CatalogError>(session)
        })
        .retry(policy)
        .when(CatalogError::is_collision)
        .notify(|err, _| {
            warn!(user_id, "session token collision, regenerating: {}", err);
        })
        .await
    }

    /// Sweep expired sessions, then look `token` up.
    ///
    /// A session that expires between the sweep and the read is reported as
    /// `SessionExpired`; the next lookup sweeps it and reports `NotFound`.
    pub async fn get_valid_session(&self, token: &str) -> Result<Session, CatalogError> {
        self.store.delete_expired_sessions(self.clock.now()).await?;

        let session = self.store.session_by_token(token).await?;
        if session.is_expired_at(self.clock.now()) {
            return Err(CatalogError::SessionExpired);
        }
        Ok(session)
    }

    pub async fn delete_session(&self, token: &str) -> Result<(), CatalogError> {
        self.store.delete_session(token).await
    }
}
