use std::sync::Arc;
use sqlx::PgPool;
use crate::auth::TokenVerifier;
use crate::external::price_provider::PriceProvider;
use crate::services::failure_cache::FailureCache;
use crate::services::rate_limiter::QuoteRateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub price_provider: Arc<dyn PriceProvider>,
    pub failure_cache: FailureCache,
    pub quote_limiter: Arc<QuoteRateLimiter>,
    pub token_verifier: Arc<TokenVerifier>,
}
