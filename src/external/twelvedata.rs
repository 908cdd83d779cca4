use std::time::Duration;

use crate::external::price_provider::{ExternalQuote, PriceProvider, PriceProviderError};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::Deserialize;

pub struct TwelveDataProvider {
    client: reqwest::Client,
    api_key: String,
}

impl TwelveDataProvider {
    pub fn from_env(timeout: Duration) -> Result<Self, PriceProviderError> {
        let api_key = std::env::var("TWELVEDATA_API_KEY")
            .map_err(|_| PriceProviderError::BadResponse("TWELVEDATA_API_KEY not set".into()))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        Ok(Self { client, api_key })
    }
}

// Success: {"price":"182.31000"}
// Failure: {"code":400,"message":"...","status":"error"}
#[derive(Debug, Deserialize)]
struct TwelveDataPriceResponse {
    price: Option<String>,
    status: Option<String>,
    message: Option<String>,
    code: Option<u32>,
}

fn parse_price_response(
    symbol: &str,
    body: TwelveDataPriceResponse,
) -> Result<ExternalQuote, PriceProviderError> {
    if body.status.as_deref() == Some("error") || body.price.is_none() {
        let msg = body.message.unwrap_or_else(|| "missing price in response".to_string());
        if msg.contains("API rate limit") || msg.contains("credits") || body.code == Some(429) {
            return Err(PriceProviderError::RateLimited);
        }
        if body.code == Some(404) || msg.contains("not found") {
            return Err(PriceProviderError::NotFound(symbol.to_string()));
        }
        return Err(PriceProviderError::BadResponse(msg));
    }

    let raw = body.price.unwrap_or_default();
    let price = raw
        .trim()
        .parse::<BigDecimal>()
        .map_err(|e| PriceProviderError::Parse(e.to_string()))?;

    Ok(ExternalQuote { symbol: symbol.to_string(), price, as_of: None })
}

#[async_trait]
impl PriceProvider for TwelveDataProvider {
    async fn fetch_quote(&self, symbol: &str) -> Result<ExternalQuote, PriceProviderError> {
        let url = "https://api.twelvedata.com/price";

        let resp = self
            .client
            .get(url)
            .query(&[("symbol", symbol), ("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        let body: TwelveDataPriceResponse = resp
            .json()
            .await
            .map_err(|e| PriceProviderError::Parse(e.to_string()))?;

        parse_price_response(symbol, body)
    }
}
