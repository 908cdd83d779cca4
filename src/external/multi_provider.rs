use crate::external::price_provider::{ExternalQuote, PriceProvider, PriceProviderError};
use async_trait::async_trait;
use tracing::{info, warn};

/// MultiProvider asks the primary provider first and falls back to the
/// secondary on any failure.
///
/// A not-found answer from the primary still goes to the fallback, since the
/// two providers cover different exchanges on their free tiers.
pub struct MultiProvider {
    primary: Box<dyn PriceProvider>,
    fallback: Box<dyn PriceProvider>,
}

impl MultiProvider {
    pub fn new(primary: Box<dyn PriceProvider>, fallback: Box<dyn PriceProvider>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl PriceProvider for MultiProvider {
    async fn fetch_quote(&self, symbol: &str) -> Result<ExternalQuote, PriceProviderError> {
        match self.primary.fetch_quote(symbol).await {
            Ok(quote) => return Ok(quote),
            Err(PriceProviderError::RateLimited) => {
                info!("⚠️ Primary provider rate limited, trying fallback for {}", symbol);
            }
            Err(e) => {
                warn!("Primary provider error for {}: {}", symbol, e);
            }
        }

        match self.fallback.fetch_quote(symbol).await {
            Ok(quote) => {
                info!("✓ Fetched {} from fallback provider", symbol);
                Ok(quote)
            }
            Err(e) => {
                warn!("Fallback provider failed for {}: {}", symbol, e);
                Err(e)
            }
        }
    }
}
