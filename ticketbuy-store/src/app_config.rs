use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub backend: Backend,
}

fn default_max_connections() -> u32 { 5 }

/// Rate limiting is disabled when `url` is unset.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedisConfig {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingConfig {
    #[serde(default = "default_max_seats")]
    pub max_seats_per_booking: i32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self { max_seats_per_booking: default_max_seats() }
    }
}

fn default_max_seats() -> i32 { 10 }

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "default_requests_per_window")]
    pub requests_per_window: i64,
    #[serde(default = "default_window_seconds")]
    pub window_seconds: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: default_requests_per_window(),
            window_seconds: default_window_seconds(),
        }
    }
}

fn default_requests_per_window() -> i64 { 120 }
fn default_window_seconds() -> i64 { 60 }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `TICKETBUY__DATABASE__URL=postgres://...` sets `database.url`
            .add_source(config::Environment::with_prefix("TICKETBUY").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_sections_fall_back_to_defaults() {
        let cfg: Config = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                port = 8080

                [database]
                backend = "memory"

                [auth]
                jwt_secret = "dev"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.database.backend, Backend::Memory);
        assert_eq!(cfg.database.max_connections, 5);
        assert!(cfg.redis.url.is_none());
        assert_eq!(cfg.booking.max_seats_per_booking, 10);
        assert_eq!(cfg.rate_limit.window_seconds, 60);
    }
}
