use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use crate::db::models::Session;
use crate::error::CatalogError;
use crate::router::CatalogState;

pub const SESSION_COOKIE: &str = "sessionToken";

/// A request authenticated by a live `sessionToken` cookie.
///
/// Missing, unknown or expired tokens are all rejected with 401 before the
/// handler runs.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

impl FromRequestParts<CatalogState> for CurrentSession {
    type Rejection = CatalogError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &CatalogState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_owned())
            .filter(|t| !t.is_empty())
            .ok_or(CatalogError::Unauthorized)?;

        match state.accounts.sessions().get_valid_session(&token).await {
            Ok(session) => Ok(Self(session)),
            Err(CatalogError::NotFound) | Err(CatalogError::SessionExpired) => {
                debug!("rejected stale session cookie");
                Err(CatalogError::Unauthorized)
            }
            Err(e) => Err(e),
        }
    }
}
