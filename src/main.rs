use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use lotfolio::app;
use lotfolio::auth::TokenVerifier;
use lotfolio::config::AppConfig;
use lotfolio::db;
use lotfolio::external;
use lotfolio::logging::{init_logging, LoggingConfig};
use lotfolio::services::failure_cache::FailureCache;
use lotfolio::services::rate_limiter::QuoteRateLimiter;
use lotfolio::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env())?;

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to DATABASE_URL")?;

    db::MIGRATOR.run(&pool).await.context("failed to run migrations")?;
    tracing::info!("✓ Database migrations applied");

    let price_provider = external::build_provider(&config)
        .context("failed to create price provider (check API keys)")?;

    let state = AppState {
        pool,
        price_provider,
        failure_cache: FailureCache::new(),
        quote_limiter: Arc::new(QuoteRateLimiter::new(
            config.quote_max_concurrent,
            config.quote_requests_per_minute,
        )),
        token_verifier: Arc::new(TokenVerifier::new(config.jwt_secret.as_bytes())),
    };
    let app = app::create_app(state);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("🚀 Lotfolio backend running at http://{}/", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
