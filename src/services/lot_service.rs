use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::OwnerContext;
use crate::db;
use crate::errors::AppError;
use crate::external::price_provider::PriceProvider;
use crate::models::{BuyLotRequest, Lot, LotFilter, NewTransaction, OpenPosition, Transaction};
use crate::services::price_history;

#[derive(Debug, Serialize)]
pub struct BuyOutcome {
    pub lot: Lot,
    pub transaction: Transaction,
}

pub async fn buy(
    pool: &PgPool,
    provider: &dyn PriceProvider,
    owner: &OwnerContext,
    request: BuyLotRequest,
) -> Result<BuyOutcome, AppError> {
    let input = request.validate()?;

    // No quote, no lot.
    let quote = price_history::fetch_required_quote(provider, &input.symbol).await?;

    let lot = OpenPosition::new(owner.user_id, input, quote.price, Utc::now());
    let buy = NewTransaction::buy(lot.id, &lot.quantity, &lot.purchase_price, lot.purchase_date);

    let mut tx = pool.begin().await?;

    let row = db::lot_queries::insert_open(&mut *tx, &lot).await.map_err(|e| {
        error!("Failed to insert lot for {}: {}", lot.symbol, e);
        AppError::Db(e)
    })?;
    let transaction = db::transaction_queries::insert(&mut *tx, owner.user_id, &buy)
        .await
        .map_err(|e| {
            error!("Failed to record BUY for lot {}: {}", lot.id, e);
            AppError::Db(e)
        })?;

    tx.commit().await?;

    info!(
        "✓ Bought {} {} @ {} (lot {})",
        lot.quantity, lot.symbol, lot.purchase_price, lot.id
    );

    Ok(BuyOutcome {
        lot: Lot::try_from(row)?,
        transaction,
    })
}

pub async fn get_lot(pool: &PgPool, owner: &OwnerContext, lot_id: Uuid) -> Result<Lot, AppError> {
    let row = db::lot_queries::fetch_one(pool, owner.user_id, lot_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lot {} not found", lot_id)))?;
    Lot::try_from(row)
}

pub async fn list_lots(pool: &PgPool, owner: &OwnerContext, filter: LotFilter) -> Result<Vec<Lot>, AppError> {
    db::lot_queries::fetch_all(pool, owner.user_id, filter.sold_flag())
        .await?
        .into_iter()
        .map(Lot::try_from)
        .collect()
}

pub async fn list_transactions(
    pool: &PgPool,
    owner: &OwnerContext,
    lot_id: Option<Uuid>,
) -> Result<Vec<Transaction>, AppError> {
    Ok(db::transaction_queries::fetch_all(pool, owner.user_id, lot_id).await?)
}
