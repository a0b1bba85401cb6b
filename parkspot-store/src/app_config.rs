use parkspot_booking::BookingPolicy;
use parkspot_catalog::{LotSpec, PricingConfig};
use parkspot_core::RetryConfig;
use serde::Deserialize;
use std::env;

use crate::StoreError;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_durations")]
    pub offered_durations: Vec<u32>,
    #[serde(default = "default_true")]
    pub allow_cancel_completed: bool,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Requests per client IP per minute; only enforced when Redis is configured.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: i64,
    /// Window length used for the "free slots" badge on lot listings.
    #[serde(default = "default_summary_hours")]
    pub summary_window_hours: u32,
}

fn default_durations() -> Vec<u32> {
    PricingConfig::default().offered_durations
}

fn default_true() -> bool { true }

fn default_rate_limit() -> i64 { 100 }

fn default_summary_hours() -> u32 { 1 }

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            offered_durations: default_durations(),
            allow_cancel_completed: true,
            retry: RetryConfig::default(),
            rate_limit_per_minute: default_rate_limit(),
            summary_window_hours: default_summary_hours(),
        }
    }
}

impl BusinessRules {
    pub fn pricing(&self) -> PricingConfig {
        PricingConfig {
            offered_durations: self.offered_durations.clone(),
        }
    }

    pub fn booking_policy(&self) -> BookingPolicy {
        BookingPolicy {
            allow_cancel_completed: self.allow_cancel_completed,
            retry: self.retry.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    pub lots: Vec<LotSpec>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

/// No url means reservations live in process memory.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedisConfig {
    pub url: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, StoreError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `PARKSPOT__SERVER__PORT=9000`
            .add_source(config::Environment::with_prefix("PARKSPOT").separator("__"))
            .build()?;

        Ok(s.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_TOML: &str = include_str!("../../config/default.toml");

    fn parse(extra: &str) -> Config {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_TOML, config::FileFormat::Toml))
            .add_source(config::File::from_str(extra, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_default_config_parses() {
        let config = parse("");

        assert_eq!(config.server.port, 8080);
        assert!(config.database.url.is_none());
        assert!(config.redis.url.is_none());
        assert_eq!(config.business_rules.offered_durations, vec![1, 2, 3, 4, 5, 6, 8, 10, 12, 24]);
        assert!(config.business_rules.allow_cancel_completed);
        assert_eq!(config.catalog.lots.len(), 4);
        assert_eq!(config.catalog.lots[0].price_per_hour, 50);
    }

    #[test]
    fn test_missing_default_file_is_a_config_error() {
        // tests run from the crate directory, which has no config/ folder
        assert!(matches!(Config::load(), Err(StoreError::Config(_))));
    }

    #[test]
    fn test_overrides_layer_on_top() {
        let config = parse(
            r#"
            [business_rules]
            allow_cancel_completed = false
            [business_rules.retry]
            max_attempts = 5
            "#,
        );

        let policy = config.business_rules.booking_policy();
        assert!(!policy.allow_cancel_completed);
        assert_eq!(policy.retry.max_attempts, 5);
        assert_eq!(policy.retry.initial_delay_ms, 100);
    }
}
