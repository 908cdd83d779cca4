use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("LOKI_ENABLED is true but LOKI_URL is not set")]
    MissingLokiUrl,
    #[error("invalid LOKI_URL: {0}")]
    InvalidLokiUrl(String),
    #[error("logging feature unavailable: {0}")]
    Unsupported(&'static str),
    #[error("failed to install subscriber: {0}")]
    Init(String),
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub loki_enabled: bool,
    pub loki_url: Option<String>,
    pub service_name: String,
    pub environment: String,
    pub log_level: String,
}

/// Where log lines go once the config is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Console,
    Loki(url::Url),
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let loki_enabled = lookup("LOKI_ENABLED")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            loki_enabled,
            loki_url: lookup("LOKI_URL").filter(|v| !v.trim().is_empty()),
            service_name: lookup("SERVICE_NAME").unwrap_or_else(|| "lotfolio".to_string()),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        }
    }

    pub fn target(&self) -> Result<LogTarget, LoggingError> {
        if !self.loki_enabled {
            return Ok(LogTarget::Console);
        }
        let raw = self.loki_url.as_deref().ok_or(LoggingError::MissingLokiUrl)?;
        let url = url::Url::parse(raw).map_err(|e| LoggingError::InvalidLokiUrl(e.to_string()))?;
        Ok(LogTarget::Loki(url))
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

pub fn init_logging(config: LoggingConfig) -> Result<(), LoggingError> {
    match config.target()? {
        LogTarget::Console => {
            tracing_subscriber::registry()
                .with(config.filter())
                .with(tracing_subscriber::fmt::layer())
                .try_init()
                .map_err(|e| LoggingError::Init(e.to_string()))?;
            tracing::info!("📊 Console logging at level {}", config.log_level);
            Ok(())
        }
        LogTarget::Loki(url) => init_with_loki(&config, url),
    }
}

#[cfg(feature = "loki")]
fn init_with_loki(config: &LoggingConfig, url: url::Url) -> Result<(), LoggingError> {
    let shown = url.to_string();
    let (loki_layer, task) = tracing_loki::builder()
        .label("service", &config.service_name)
        .and_then(|b| b.label("environment", &config.environment))
        .and_then(|b| b.build_url(url))
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    // Ships log batches in the background.
    tokio::spawn(task);

    tracing_subscriber::registry()
        .with(config.filter())
        .with(tracing_subscriber::fmt::layer())
        .with(loki_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    tracing::info!("✅ Loki logging for {} ({}) at {}", config.service_name, config.environment, shown);
    Ok(())
}

#[cfg(not(feature = "loki"))]
fn init_with_loki(_config: &LoggingConfig, _url: url::Url) -> Result<(), LoggingError> {
    Err(LoggingError::Unsupported("built without the `loki` feature"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> LoggingConfig {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        LoggingConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_to_console() {
        let config = config(&[]);
        assert_eq!(config.service_name, "lotfolio");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.target().unwrap(), LogTarget::Console);
    }

    #[test]
    fn test_loki_requires_url() {
        let config = config(&[("LOKI_ENABLED", "true")]);
        assert!(matches!(config.target(), Err(LoggingError::MissingLokiUrl)));
    }

    #[test]
    fn test_loki_rejects_bad_url() {
        let config = config(&[("LOKI_ENABLED", "1"), ("LOKI_URL", "not a url")]);
        assert!(matches!(config.target(), Err(LoggingError::InvalidLokiUrl(_))));
    }

    #[test]
    fn test_loki_target_parsed() {
        let config = config(&[("LOKI_ENABLED", "TRUE"), ("LOKI_URL", "http://loki:3100")]);
        match config.target().unwrap() {
            LogTarget::Loki(url) => assert_eq!(url.host_str(), Some("loki")),
            LogTarget::Console => panic!("expected loki target"),
        }
    }

    #[test]
    fn test_unparseable_level_falls_back() {
        let config = config(&[("RUST_LOG", "[[[")]);
        // Must not panic.
        let _ = config.filter();
    }
}
