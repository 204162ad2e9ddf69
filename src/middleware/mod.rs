pub mod auth;

pub use auth::{CurrentSession, SESSION_COOKIE};
