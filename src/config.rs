use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub db_max_connections: u32,
    pub price_provider: String,
    pub price_provider_timeout: Duration,
    /// Passive refresh pacing: concurrent quote calls and calls per minute.
    pub quote_max_concurrent: usize,
    pub quote_requests_per_minute: u32,
    pub jwt_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup so tests don't touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid { name: "BIND_ADDR", reason: e.to_string() })?;

        let db_max_connections = lookup("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()
            .map_err(|e| ConfigError::Invalid { name: "DB_MAX_CONNECTIONS", reason: e.to_string() })?;

        let timeout_secs = lookup("PRICE_PROVIDER_TIMEOUT_SECS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u64>()
            .map_err(|e| ConfigError::Invalid {
                name: "PRICE_PROVIDER_TIMEOUT_SECS",
                reason: e.to_string(),
            })?;

        let quote_max_concurrent = lookup("QUOTE_MAX_CONCURRENT")
            .unwrap_or_else(|| "3".to_string())
            .parse::<usize>()
            .map_err(|e| ConfigError::Invalid { name: "QUOTE_MAX_CONCURRENT", reason: e.to_string() })?;

        let quote_requests_per_minute = lookup("QUOTE_REQUESTS_PER_MINUTE")
            .unwrap_or_else(|| "8".to_string())
            .parse::<u32>()
            .map_err(|e| ConfigError::Invalid {
                name: "QUOTE_REQUESTS_PER_MINUTE",
                reason: e.to_string(),
            })?;

        let config = Self {
            database_url,
            bind_addr,
            db_max_connections,
            price_provider: lookup("PRICE_PROVIDER")
                .unwrap_or_else(|| "multi".to_string())
                .to_lowercase(),
            price_provider_timeout: Duration::from_secs(timeout_secs),
            quote_max_concurrent,
            quote_requests_per_minute,
            jwt_secret,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.price_provider.as_str(), "alphavantage" | "twelvedata" | "multi") {
            return Err(ConfigError::Invalid {
                name: "PRICE_PROVIDER",
                reason: format!(
                    "'{}' must be 'alphavantage', 'twelvedata', or 'multi'",
                    self.price_provider
                ),
            });
        }
        if self.jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                name: "JWT_SECRET",
                reason: "must be at least 32 bytes".to_string(),
            });
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::Invalid {
                name: "DB_MAX_CONNECTIONS",
                reason: "must be > 0".to_string(),
            });
        }
        if self.quote_max_concurrent == 0 || self.quote_requests_per_minute == 0 {
            return Err(ConfigError::Invalid {
                name: "QUOTE_MAX_CONCURRENT / QUOTE_REQUESTS_PER_MINUTE",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }
}
