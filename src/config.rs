//! Layered service configuration.
//!
//! Sources, lowest priority first:
//! - built-in defaults (`Config::default()`)
//! - `config.toml` in the working directory, if present
//! - environment variables prefixed with `CATALOG_`, nested keys split by `__`
//!   (e.g. `CATALOG_SYNC__INTERVAL_SECS=60`)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::CatalogError;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
pub const ENV_PREFIX: &str = "CATALOG_";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub basic: BasicConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub loglevel: String,
    pub database_url: String,
    /// Drop the `Secure` attribute from the session cookie (plain-HTTP deployments).
    pub insecure_cookie: bool,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            loglevel: "info".to_string(),
            database_url: "sqlite://catalog.sqlite".to_string(),
            insecure_cookie: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    pub feed_url: Url,
    pub interval_secs: u64,
    pub page_size: u64,
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            feed_url: Url::parse("https://dummyjson.com").expect("static feed url is valid"),
            interval_secs: 3600,
            page_size: 10,
            request_timeout_secs: 15,
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    pub ttl_hours: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl_hours: 24 }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::hours(self.ttl_hours)
    }
}

impl Config {
    /// Load from defaults, `config.toml` and the environment.
    pub fn load() -> Result<Self, CatalogError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    pub fn load_from(path: &str) -> Result<Self, CatalogError> {
        let cfg: Config = Self::figment(path).extract()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Values that deserialize fine but would stall the sync loop or mint
    /// sessions that are already expired.
    pub fn validate(&self) -> Result<(), figment::Error> {
        if self.sync.page_size == 0 {
            return Err(figment::Error::from("sync.page_size must be at least 1".to_string()));
        }
        if self.session.ttl_hours <= 0 {
            return Err(figment::Error::from(format!(
                "session.ttl_hours must be positive, got {}",
                self.session.ttl_hours
            )));
        }
        Ok(())
    }

    pub fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_feed_contract() {
        let cfg = Config::default();
        assert_eq!(cfg.sync.page_size, 10);
        assert_eq!(cfg.sync.interval(), Duration::from_secs(3600));
        assert_eq!(cfg.session.ttl(), chrono::TimeDelta::hours(24));
        assert_eq!(cfg.sync.feed_url.as_str(), "https://dummyjson.com/");
    }

    #[test]
    fn toml_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "catalog.toml",
                r#"
                [basic]
                listen_addr = "127.0.0.1:9000"

                [sync]
                page_size = 25
                "#,
            )?;
            jail.set_env("CATALOG_SYNC__INTERVAL_SECS", "60");

            let cfg: Config = Config::figment("catalog.toml").extract()?;
            assert_eq!(cfg.basic.listen_addr, "127.0.0.1:9000");
            assert_eq!(cfg.basic.loglevel, "info");
            assert_eq!(cfg.sync.page_size, 25);
            assert_eq!(cfg.sync.interval_secs, 60);
            Ok(())
        });
    }

    #[test]
    fn defaults_pass_validation() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn zero_page_size_is_rejected() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("catalog.toml", "[sync]\npage_size = 0\n")?;
            let err = Config::load_from("catalog.toml").unwrap_err();
            assert!(matches!(err, CatalogError::Config(_)));
            assert!(err.to_string().contains("page_size"));
            Ok(())
        });
    }

    #[test]
    fn non_positive_ttl_is_rejected() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("catalog.toml", "[session]\nttl_hours = 0\n")?;
            assert!(matches!(
                Config::load_from("catalog.toml"),
                Err(CatalogError::Config(_))
            ));

            jail.set_env("CATALOG_SESSION__TTL_HOURS", "-3");
            let err = Config::load_from("catalog.toml").unwrap_err();
            assert!(err.to_string().contains("ttl_hours"));
            Ok(())
        });
    }
}
