use crate::db::models::Session;
use crate::error::CatalogError;
use crate::handlers::{json_body, require_name};
use crate::middleware::{CurrentSession, SESSION_COOKIE};
use crate::router::CatalogState;
use axum::{Json, extract::State, extract::rejection::JsonRejection, http::StatusCode};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::Deserialize;
use time::Duration;
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    fn validate(&self) -> Result<(), CatalogError> {
        require_name("login", &self.login)?;
        require_name("password", &self.password)
    }
}

fn session_cookie(session: &Session, insecure: bool) -> Cookie<'static> {
    let remaining = (session.expiry - Utc::now()).num_seconds().max(0);
    Cookie::build(Cookie::new(SESSION_COOKIE, session.token.clone()))
        .path("/")
        .http_only(true)
        .secure(!insecure)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(remaining))
        .build()
}

fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build(Cookie::new(SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// POST /api/v1/register -> creates the user and sets the session cookie.
pub async fn register(
    State(state): State<CatalogState>,
    jar: CookieJar,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<(CookieJar, StatusCode), CatalogError> {
    let creds = json_body(payload)?;
    creds.validate()?;

    let session = state.accounts.register(&creds.login, &creds.password).await?;
    Ok((
        jar.add(session_cookie(&session, state.insecure_cookie)),
        StatusCode::OK,
    ))
}

/// POST /api/v1/login -> verifies credentials and sets a fresh session cookie.
pub async fn login(
    State(state): State<CatalogState>,
    jar: CookieJar,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<(CookieJar, StatusCode), CatalogError> {
    let creds = json_body(payload)?;
    creds.validate()?;

    let session = state.accounts.login(&creds.login, &creds.password).await?;
    info!(user_id = session.user_id, "user logged in");
    Ok((
        jar.add(session_cookie(&session, state.insecure_cookie)),
        StatusCode::OK,
    ))
}

/// POST /api/v1/logout -> deletes the current session and clears the cookie.
pub async fn logout(
    State(state): State<CatalogState>,
    CurrentSession(session): CurrentSession,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), CatalogError> {
    state.accounts.logout(&session.token).await?;
    Ok((jar.remove(clear_session_cookie()), StatusCode::OK))
}
