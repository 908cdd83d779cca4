use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::OwnerContext;
use crate::db;
use crate::errors::AppError;
use crate::external::price_provider::PriceProvider;
use crate::models::{Lot, NewTransaction, OpenPosition, RealizedSale, SaleOrder, SellLotRequest, Transaction};
use crate::services::gains_classifier::{classify, Classification};
use crate::services::price_history;

#[derive(Debug, Clone, PartialEq)]
pub enum SaleKind {
    Full,
    Partial { remaining: BigDecimal },
}

#[derive(Debug, Clone)]
pub struct SalePlan {
    pub kind: SaleKind,
    pub transaction_amount: BigDecimal,
    pub capital_gains: BigDecimal,
    pub short_term_gain: BigDecimal,
    pub long_term_gain: BigDecimal,
    pub classification: Classification,
}

#[derive(Debug, Clone, Serialize)]
pub struct SellOutcome {
    /// The sold lot after the sale: closed on a full sell, the open remainder otherwise.
    pub lot: Lot,
    /// The closed copy created by a partial sell.
    pub realized_copy: Option<RealizedSale>,
    pub transaction: Transaction,
    pub classification: Classification,
}

/// Validates an order against an open lot and computes the sale figures.
pub fn plan_sale(lot: &OpenPosition, order: &SaleOrder) -> Result<SalePlan, AppError> {
    let zero = BigDecimal::from(0);
    if order.quantity <= zero {
        return Err(AppError::Validation("quantity must be > 0".into()));
    }
    if order.sale_price <= zero {
        return Err(AppError::Validation("sale_price must be > 0".into()));
    }
    if order.sale_date < lot.purchase_date {
        return Err(AppError::Validation(format!(
            "sale_date {} is before purchase_date {}",
            order.sale_date, lot.purchase_date
        )));
    }
    if order.quantity > lot.quantity {
        return Err(AppError::Conflict(format!(
            "insufficient quantity: lot {} holds {}, requested {}",
            lot.id, lot.quantity, order.quantity
        )));
    }

    let transaction_amount = &order.sale_price * &order.quantity;
    let capital_gains = (&order.sale_price - &lot.purchase_price) * &order.quantity;
    let classification = classify(lot.purchase_date, order.sale_date);
    let (short_term_gain, long_term_gain) = classification.split(&capital_gains);

    let kind = if order.quantity == lot.quantity {
        SaleKind::Full
    } else {
        SaleKind::Partial { remaining: &lot.quantity - &order.quantity }
    };

    Ok(SalePlan {
        kind,
        transaction_amount,
        capital_gains,
        short_term_gain,
        long_term_gain,
        classification,
    })
}

fn realize(
    lot: &OpenPosition,
    id: Uuid,
    source_lot_id: Option<Uuid>,
    order: &SaleOrder,
    plan: &SalePlan,
    created_at: DateTime<Utc>,
) -> RealizedSale {
    RealizedSale {
        id,
        user_id: lot.user_id,
        source_lot_id,
        name: lot.name.clone(),
        symbol: lot.symbol.clone(),
        quantity: order.quantity.clone(),
        purchase_price: lot.purchase_price.clone(),
        purchase_date: lot.purchase_date,
        current_price: lot.current_price.clone(),
        price_history: lot.price_history.clone(),
        sale_price: order.sale_price.clone(),
        sale_date: order.sale_date,
        capital_gains: plan.capital_gains.clone(),
        short_term_gain: plan.short_term_gain.clone(),
        long_term_gain: plan.long_term_gain.clone(),
        created_at,
    }
}

/// Applies a plan to the lot. A full sell closes the lot itself; a partial
/// sell shrinks it and returns a closed copy holding the sold quantity.
pub fn apply_sale(
    mut lot: OpenPosition,
    order: &SaleOrder,
    plan: &SalePlan,
    copy_id: Uuid,
    now: DateTime<Utc>,
) -> (Lot, Option<RealizedSale>) {
    match &plan.kind {
        SaleKind::Full => {
            let closed = realize(&lot, lot.id, None, order, plan, lot.created_at);
            (Lot::Realized(closed), None)
        }
        SaleKind::Partial { remaining } => {
            let copy = realize(&lot, copy_id, Some(lot.id), order, plan, now);
            lot.quantity = remaining.clone();
            lot.version += 1;
            (Lot::Open(lot), Some(copy))
        }
    }
}

pub async fn sell(
    pool: &PgPool,
    provider: &dyn PriceProvider,
    owner: &OwnerContext,
    lot_id: Uuid,
    request: SellLotRequest,
) -> Result<SellOutcome, AppError> {
    let order = request.validate()?;
    let not_found = || AppError::NotFound(format!("Open lot {} not found", lot_id));

    let row = db::lot_queries::fetch_one(pool, owner.user_id, lot_id)
        .await?
        .ok_or_else(not_found)?;
    let Lot::Open(lot) = Lot::try_from(row)? else {
        return Err(not_found());
    };

    // Reject bad orders before spending a provider call.
    plan_sale(&lot, &order)?;
    let quote = price_history::fetch_required_quote(provider, &lot.symbol).await?;

    let mut tx = pool.begin().await?;

    // Re-read under a row lock: concurrent sells on this lot queue here.
    let row = db::lot_queries::lock_open(&mut *tx, owner.user_id, lot_id)
        .await?
        .ok_or_else(not_found)?;
    let Lot::Open(mut lot) = Lot::try_from(row)? else {
        return Err(not_found());
    };
    let expected_version = lot.version;

    let now = Utc::now();
    price_history::record_price(&mut lot, quote.price, now);
    let plan = plan_sale(&lot, &order)?;
    let (position, realized_copy) = apply_sale(lot, &order, &plan, Uuid::new_v4(), now);

    let stored = match &position {
        Lot::Open(open) => db::lot_queries::update_open(&mut *tx, open, expected_version).await?,
        Lot::Realized(closed) => db::lot_queries::close(&mut *tx, closed, expected_version).await?,
    }
    .ok_or_else(|| AppError::Conflict(format!("Lot {} was modified concurrently", lot_id)))?;
    let position = Lot::try_from(stored)?;

    let realized_copy = match realized_copy {
        Some(copy) => match Lot::try_from(db::lot_queries::insert_realized(&mut *tx, &copy).await?)? {
            Lot::Realized(sale) => Some(sale),
            Lot::Open(_) => {
                error!("Realized copy of lot {} was stored as open", lot_id);
                return Err(AppError::Data(format!("realized copy of lot {} stored as open", lot_id)));
            }
        },
        None => None,
    };

    let transaction = db::transaction_queries::insert(
        &mut *tx,
        owner.user_id,
        &NewTransaction::sell(lot_id, &order.quantity, plan.transaction_amount.clone(), order.sale_date),
    )
    .await?;

    tx.commit().await?;

    info!(
        "✓ Sold {} of {} (lot {}): gain {} ({:?}, {} days)",
        order.quantity,
        position.symbol(),
        lot_id,
        plan.capital_gains,
        plan.classification.term,
        plan.classification.days_held
    );

    Ok(SellOutcome {
        lot: position,
        realized_copy,
        transaction,
        classification: plan.classification,
    })
}
