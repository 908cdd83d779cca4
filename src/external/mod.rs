pub mod alphavantage;
pub mod multi_provider;
pub mod price_provider;
pub mod twelvedata;

use std::sync::Arc;

use tracing::info;

use crate::config::AppConfig;
use crate::external::alphavantage::AlphaVantageProvider;
use crate::external::multi_provider::MultiProvider;
use crate::external::price_provider::{PriceProvider, PriceProviderError};
use crate::external::twelvedata::TwelveDataProvider;

/// Selects the price provider named by `PRICE_PROVIDER`.
pub fn build_provider(config: &AppConfig) -> Result<Arc<dyn PriceProvider>, PriceProviderError> {
    let timeout = config.price_provider_timeout;
    let provider: Arc<dyn PriceProvider> = match config.price_provider.as_str() {
        "alphavantage" => {
            info!("📊 Using price provider: Alpha Vantage only");
            Arc::new(AlphaVantageProvider::from_env(timeout)?)
        },
        "twelvedata" => {
            info!("📊 Using price provider: Twelve Data only");
            Arc::new(TwelveDataProvider::from_env(timeout)?)
        },
        _ => {
            info!("📊 Using price provider: Multi-provider (Twelve Data + Alpha Vantage fallback)");
            let primary = Box::new(TwelveDataProvider::from_env(timeout)?);
            let fallback = Box::new(AlphaVantageProvider::from_env(timeout)?);
            Arc::new(MultiProvider::new(primary, fallback))
        },
    };
    Ok(provider)
}
