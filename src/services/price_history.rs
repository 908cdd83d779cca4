use std::collections::{BTreeSet, HashMap};

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::OwnerContext;
use crate::db;
use crate::errors::AppError;
use crate::external::price_provider::{ExternalQuote, PriceProvider};
use crate::models::{Lot, OpenPosition, PriceSnapshot, PRICE_HISTORY_CAPACITY};
use crate::services::failure_cache::{FailureCache, FailureType};
use crate::services::rate_limiter::QuoteRateLimiter;

/// Appends a snapshot and evicts from the front once over capacity.
pub fn push_bounded(history: &mut Vec<PriceSnapshot>, snapshot: PriceSnapshot) {
    history.push(snapshot);
    if history.len() > PRICE_HISTORY_CAPACITY {
        let excess = history.len() - PRICE_HISTORY_CAPACITY;
        history.drain(..excess);
    }
}

/// Applies a quoted price to an open lot. Returns whether anything changed.
pub fn record_price(lot: &mut OpenPosition, price: BigDecimal, at: DateTime<Utc>) -> bool {
    if lot.current_price == price {
        return false;
    }
    lot.current_price = price.clone();
    push_bounded(&mut lot.price_history, PriceSnapshot { date: at, price });
    true
}

/// Quote for the buy and sell paths, where a missing price is fatal.
pub async fn fetch_required_quote(
    provider: &dyn PriceProvider,
    symbol: &str,
) -> Result<ExternalQuote, AppError> {
    provider.fetch_quote(symbol).await.map_err(|e| {
        error!("✗ Price unavailable for {}: {}", symbol, e);
        AppError::from(e)
    })
}

/// Quote for the passive path. Cached failures are skipped and provider
/// errors are tolerated; either way `None` leaves the lot as it was.
async fn passive_quote(
    provider: &dyn PriceProvider,
    failure_cache: &FailureCache,
    limiter: &QuoteRateLimiter,
    symbol: &str,
) -> Result<Option<BigDecimal>, AppError> {
    if let Some(failure) = failure_cache.is_failed(symbol) {
        info!(
            "⚠️ Skipping refresh of {} - symbol is in failure cache ({:?})",
            symbol, failure.error_type
        );
        return Ok(None);
    }

    let _permit = limiter.acquire().await?;
    match provider.fetch_quote(symbol).await {
        Ok(quote) => {
            failure_cache.clear(symbol);
            Ok(Some(quote.price))
        }
        Err(e) => {
            warn!("Keeping last known price for {}: {}", symbol, e);
            failure_cache.record_failure(symbol, FailureType::from(&e));
            Ok(None)
        }
    }
}

/// Writes a refreshed price, only when it moved, guarded by the lot's version.
async fn store_price(pool: &PgPool, lot: OpenPosition, price: BigDecimal) -> Result<Lot, AppError> {
    let expected_version = lot.version;
    let (user_id, lot_id) = (lot.user_id, lot.id);
    let mut updated = lot;
    if !record_price(&mut updated, price, Utc::now()) {
        return Ok(Lot::Open(updated));
    }

    match db::lot_queries::update_open(pool, &updated, expected_version).await? {
        Some(row) => Lot::try_from(row),
        None => {
            // Lost the race against a sell or another refresh; report what is stored now.
            warn!("Lot {} changed during refresh, skipping price write", lot_id);
            db::lot_queries::fetch_one(pool, user_id, lot_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Lot {} not found", lot_id)))
                .and_then(Lot::try_from)
        }
    }
}

/// Passive refresh of one open lot.
pub async fn refresh_position(
    pool: &PgPool,
    provider: &dyn PriceProvider,
    failure_cache: &FailureCache,
    limiter: &QuoteRateLimiter,
    lot: OpenPosition,
) -> Result<Lot, AppError> {
    match passive_quote(provider, failure_cache, limiter, &lot.symbol).await? {
        Some(price) => store_price(pool, lot, price).await,
        None => Ok(Lot::Open(lot)),
    }
}

/// Passive refresh of many open lots. Each distinct symbol is quoted once
/// and its price applied to every lot holding it.
pub async fn refresh_positions(
    pool: &PgPool,
    provider: &dyn PriceProvider,
    failure_cache: &FailureCache,
    limiter: &QuoteRateLimiter,
    lots: Vec<OpenPosition>,
) -> Result<Vec<Lot>, AppError> {
    let symbols: BTreeSet<String> = lots.iter().map(|lot| lot.symbol.clone()).collect();

    let quoted = join_all(symbols.into_iter().map(|symbol| async move {
        let price = passive_quote(provider, failure_cache, limiter, &symbol).await;
        (symbol, price)
    }))
    .await;

    let mut prices = HashMap::with_capacity(quoted.len());
    for (symbol, price) in quoted {
        if let Some(price) = price? {
            prices.insert(symbol, price);
        }
    }

    let mut refreshed = Vec::with_capacity(lots.len());
    for lot in lots {
        let lot = match prices.get(&lot.symbol) {
            Some(price) => store_price(pool, lot, price.clone()).await?,
            None => Lot::Open(lot),
        };
        refreshed.push(lot);
    }
    Ok(refreshed)
}

pub async fn refresh(
    pool: &PgPool,
    provider: &dyn PriceProvider,
    failure_cache: &FailureCache,
    limiter: &QuoteRateLimiter,
    owner: &OwnerContext,
    lot_id: Uuid,
) -> Result<Lot, AppError> {
    let row = db::lot_queries::fetch_one(pool, owner.user_id, lot_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lot {} not found", lot_id)))?;

    match Lot::try_from(row)? {
        Lot::Open(open) => refresh_position(pool, provider, failure_cache, limiter, open).await,
        realized @ Lot::Realized(_) => Ok(realized),
    }
}

/// Passive refresh across every open lot of the owner.
pub async fn refresh_all(
    pool: &PgPool,
    provider: &dyn PriceProvider,
    failure_cache: &FailureCache,
    limiter: &QuoteRateLimiter,
    owner: &OwnerContext,
) -> Result<Vec<Lot>, AppError> {
    let rows = db::lot_queries::fetch_all(pool, owner.user_id, Some(false)).await?;
    let mut open = Vec::with_capacity(rows.len());
    for row in rows {
        if let Lot::Open(lot) = Lot::try_from(row)? {
            open.push(lot);
        }
    }

    refresh_positions(pool, provider, failure_cache, limiter, open).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::price_provider::PriceProviderError;
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate};
    use sqlx::postgres::PgPoolOptions;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticPrice(Option<i32>);

    #[async_trait]
    impl PriceProvider for StaticPrice {
        async fn fetch_quote(&self, symbol: &str) -> Result<ExternalQuote, PriceProviderError> {
            match self.0 {
                Some(p) => Ok(ExternalQuote { symbol: symbol.into(), price: BigDecimal::from(p), as_of: None }),
                None => Err(PriceProviderError::Network("connection refused".into())),
            }
        }
    }

    /// Counts quote calls and answers with a fixed price.
    struct CountingPrice {
        price: i32,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PriceProvider for CountingPrice {
        async fn fetch_quote(&self, symbol: &str) -> Result<ExternalQuote, PriceProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ExternalQuote { symbol: symbol.into(), price: BigDecimal::from(self.price), as_of: None })
        }
    }

    fn open_lot_of(symbol: &str, price: i32) -> OpenPosition {
        OpenPosition { symbol: symbol.into(), ..open_lot(price) }
    }

    fn open_lot(price: i32) -> OpenPosition {
        OpenPosition {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Infosys".into(),
            symbol: "INFY".into(),
            quantity: BigDecimal::from(10),
            purchase_price: BigDecimal::from(100),
            purchase_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            current_price: BigDecimal::from(price),
            price_history: vec![PriceSnapshot { date: Utc::now(), price: BigDecimal::from(price) }],
            version: 0,
            created_at: Utc::now(),
        }
    }

    fn limiter() -> QuoteRateLimiter {
        QuoteRateLimiter::new(3, 6000)
    }

    // Never connects; the paths under test must not reach the database.
    fn lazy_pool() -> PgPool {
        PgPoolOptions::new()
            .connect_lazy("postgres://localhost/lotfolio_unused")
            .unwrap()
    }

    #[test]
    fn test_unchanged_price_is_not_recorded() {
        let mut lot = open_lot(100);
        assert!(!record_price(&mut lot, BigDecimal::from(100), Utc::now()));
        assert_eq!(lot.price_history.len(), 1);
    }

    #[test]
    fn test_changed_price_is_appended() {
        let mut lot = open_lot(100);
        assert!(record_price(&mut lot, BigDecimal::from(105), Utc::now()));
        assert_eq!(lot.current_price, BigDecimal::from(105));
        assert_eq!(lot.price_history.len(), 2);
        assert_eq!(lot.price_history.last().unwrap().price, BigDecimal::from(105));
    }

    #[test]
    fn test_history_keeps_most_recent_hundred() {
        let mut lot = open_lot(0);
        lot.price_history.clear();
        let start = Utc::now();
        for i in 1..=150 {
            record_price(&mut lot, BigDecimal::from(i), start + Duration::minutes(i as i64));
        }

        assert_eq!(lot.price_history.len(), PRICE_HISTORY_CAPACITY);
        assert_eq!(lot.price_history.first().unwrap().price, BigDecimal::from(51));
        assert_eq!(lot.price_history.last().unwrap().price, BigDecimal::from(150));
        assert!(lot.price_history.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[tokio::test]
    async fn test_required_quote_fails_when_provider_down() {
        let err = fetch_required_quote(&StaticPrice(None), "INFY").await.unwrap_err();
        assert!(matches!(err, AppError::External(_)));
    }

    #[tokio::test]
    async fn test_passive_refresh_tolerates_provider_failure() {
        let cache = FailureCache::new();
        let lot = open_lot(100);

        let result = refresh_position(&lazy_pool(), &StaticPrice(None), &cache, &limiter(), lot.clone())
            .await
            .unwrap();

        match result {
            Lot::Open(unchanged) => {
                assert_eq!(unchanged.current_price, lot.current_price);
                assert_eq!(unchanged.price_history.len(), 1);
            }
            Lot::Realized(_) => panic!("expected open lot"),
        }
        assert!(cache.is_failed("INFY").is_some());
    }

    #[tokio::test]
    async fn test_passive_refresh_skips_cached_failures() {
        let cache = FailureCache::new();
        cache.record_failure("INFY", FailureType::NotFound);

        // Provider would return a new price, but the cached failure wins.
        let result = refresh_position(&lazy_pool(), &StaticPrice(Some(120)), &cache, &limiter(), open_lot(100))
            .await
            .unwrap();
        if let Lot::Open(lot) = result {
            assert_eq!(lot.current_price, BigDecimal::from(100));
        }
    }

    #[tokio::test]
    async fn test_passive_refresh_same_price_skips_write() {
        let cache = FailureCache::new();
        let result = refresh_position(&lazy_pool(), &StaticPrice(Some(100)), &cache, &limiter(), open_lot(100))
            .await
            .unwrap();
        if let Lot::Open(lot) = result {
            assert_eq!(lot.version, 0);
            assert_eq!(lot.price_history.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_refresh_quotes_each_symbol_once() {
        let cache = FailureCache::new();
        let provider = CountingPrice { price: 100, calls: AtomicUsize::new(0) };
        let lots = vec![
            open_lot_of("INFY", 100),
            open_lot_of("INFY", 100),
            open_lot_of("INFY", 100),
            open_lot_of("TCS", 100),
        ];

        // Unchanged prices, so no lot is written.
        let refreshed = refresh_positions(&lazy_pool(), &provider, &cache, &limiter(), lots)
            .await
            .unwrap();

        assert_eq!(refreshed.len(), 4);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_many_tolerates_provider_failure() {
        let cache = FailureCache::new();
        let lots = vec![open_lot_of("INFY", 100), open_lot_of("WIPRO", 50)];

        let refreshed = refresh_positions(&lazy_pool(), &StaticPrice(None), &cache, &limiter(), lots)
            .await
            .unwrap();

        assert_eq!(refreshed.len(), 2);
        assert!(cache.is_failed("INFY").is_some());
        assert!(cache.is_failed("WIPRO").is_some());
    }
}
