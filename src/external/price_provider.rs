use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct ExternalQuote {
    pub symbol: String,
    pub price: BigDecimal,
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Error)]
pub enum PriceProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("symbol not found: {0}")]
    NotFound(String),

    #[error("rate limited")]
    RateLimited,
}

/// Source of the current market price for a symbol.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<ExternalQuote, PriceProviderError>;
}
