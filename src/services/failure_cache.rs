use std::sync::Arc;
use chrono::{DateTime, Utc, Duration};
use dashmap::DashMap;

use crate::external::price_provider::PriceProviderError;

/// Information about a failed quote for a symbol
#[derive(Debug, Clone)]
pub struct FailureInfo {
    pub failed_at: DateTime<Utc>,
    pub error_type: FailureType,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FailureType {
    NotFound,       // Symbol unknown to the provider
    RateLimited,    // Temporary rate limit
    ApiError,       // Other API errors
}

impl From<&PriceProviderError> for FailureType {
    fn from(value: &PriceProviderError) -> Self {
        match value {
            PriceProviderError::NotFound(_) => FailureType::NotFound,
            PriceProviderError::RateLimited => FailureType::RateLimited,
            _ => FailureType::ApiError,
        }
    }
}

/// Thread-safe cache of symbols whose last quote failed.
/// Only the passive refresh path consults it; buy and sell always query the provider.
#[derive(Clone, Default)]
pub struct FailureCache {
    cache: Arc<DashMap<String, FailureInfo>>,
}

impl FailureCache {
    pub fn new() -> Self {
        Self {
            cache: Arc::new(DashMap::new()),
        }
    }

    /// Returns the failure if the symbol is still inside its TTL
    pub fn is_failed(&self, symbol: &str) -> Option<FailureInfo> {
        self.is_failed_at(symbol, Utc::now())
    }

    fn is_failed_at(&self, symbol: &str, now: DateTime<Utc>) -> Option<FailureInfo> {
        if let Some(entry) = self.cache.get(symbol) {
            let info = entry.value().clone();
            let expiry = info.failed_at + Duration::hours(info.ttl_hours);

            if now < expiry {
                return Some(info);
            }
            drop(entry); // release the read guard before removing
            self.cache.remove(symbol);
        }
        None
    }

    pub fn record_failure(&self, symbol: &str, error_type: FailureType) {
        self.record_failure_at(symbol, error_type, Utc::now());
    }

    fn record_failure_at(&self, symbol: &str, error_type: FailureType, failed_at: DateTime<Utc>) {
        let ttl_hours = match error_type {
            FailureType::NotFound => 24,
            FailureType::RateLimited => 1,
            FailureType::ApiError => 6,
        };

        self.cache.insert(
            symbol.to_string(),
            FailureInfo {
                failed_at,
                error_type,
                ttl_hours,
            },
        );
    }

    /// Clear a symbol after a successful quote
    pub fn clear(&self, symbol: &str) {
        self.cache.remove(symbol);
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
