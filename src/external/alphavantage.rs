use std::time::Duration;

use crate::external::price_provider::{ExternalQuote, PriceProvider, PriceProviderError};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::Deserialize;

pub struct AlphaVantageProvider {
    client: reqwest::Client,
    api_key: String,
}

impl AlphaVantageProvider {
    pub fn from_env(timeout: Duration) -> Result<Self, PriceProviderError> {
        let api_key = std::env::var("ALPHAVANTAGE_API_KEY")
            .map_err(|_| PriceProviderError::BadResponse("ALPHAVANTAGE_API_KEY not set".into()))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        Ok(Self { client, api_key })
    }
}

#[derive(Debug, Deserialize)]
struct AvQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<AvGlobalQuote>,

    // When rate-limited Alpha Vantage returns:
    // { "Note": "Thank you for using Alpha Vantage! ... 5 calls per minute ..." }
    #[serde(rename = "Note")]
    note: Option<String>,

    // Newer throttle responses use "Information" instead of "Note"
    #[serde(rename = "Information")]
    information: Option<String>,

    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

// An unknown symbol comes back as an empty object: { "Global Quote": {} }
#[derive(Debug, Deserialize)]
struct AvGlobalQuote {
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "07. latest trading day")]
    latest_trading_day: Option<String>,
}

fn parse_quote_response(symbol: &str, body: AvQuoteResponse) -> Result<ExternalQuote, PriceProviderError> {
    if body.note.is_some() || body.information.is_some() {
        return Err(PriceProviderError::RateLimited);
    }

    if let Some(msg) = body.error_message {
        return Err(PriceProviderError::BadResponse(msg));
    }

    let quote = body
        .global_quote
        .ok_or_else(|| PriceProviderError::BadResponse("missing Global Quote".into()))?;

    let raw_price = quote
        .price
        .ok_or_else(|| PriceProviderError::NotFound(symbol.to_string()))?;

    let price = raw_price
        .trim()
        .parse::<BigDecimal>()
        .map_err(|e| PriceProviderError::Parse(e.to_string()))?;

    let as_of = quote
        .latest_trading_day
        .as_deref()
        .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
        .transpose()
        .map_err(|e| PriceProviderError::Parse(e.to_string()))?;

    Ok(ExternalQuote { symbol: symbol.to_string(), price, as_of })
}

#[async_trait]
impl PriceProvider for AlphaVantageProvider {
    async fn fetch_quote(&self, symbol: &str) -> Result<ExternalQuote, PriceProviderError> {
        let url = "https://www.alphavantage.co/query";

        let resp = self
            .client
            .get(url)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        let body = resp
            .json::<AvQuoteResponse>()
            .await
            .map_err(|e| PriceProviderError::Parse(e.to_string()))?;

        parse_quote_response(symbol, body)
    }
}
