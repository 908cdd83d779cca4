use bigdecimal::BigDecimal;
use chrono::Datelike;
use sqlx::PgPool;

use crate::auth::OwnerContext;
use crate::db;
use crate::errors::AppError;
use crate::models::{GainsSummary, Lot, RealizedSale};

/// Totals realized gains, optionally restricted to sales in one calendar year.
pub fn summarize(sales: &[RealizedSale], year: Option<i32>) -> GainsSummary {
    let mut summary = GainsSummary {
        year,
        realized_lots: 0,
        capital_gains: BigDecimal::from(0),
        short_term_gains: BigDecimal::from(0),
        long_term_gains: BigDecimal::from(0),
    };

    for sale in sales
        .iter()
        .filter(|s| year.map_or(true, |y| s.sale_date.year() == y))
    {
        summary.realized_lots += 1;
        summary.capital_gains += &sale.capital_gains;
        summary.short_term_gains += &sale.short_term_gain;
        summary.long_term_gains += &sale.long_term_gain;
    }

    summary
}

pub async fn gains_summary(
    pool: &PgPool,
    owner: &OwnerContext,
    year: Option<i32>,
) -> Result<GainsSummary, AppError> {
    let mut sales = Vec::new();
    for row in db::lot_queries::fetch_all(pool, owner.user_id, Some(true)).await? {
        if let Lot::Realized(sale) = Lot::try_from(row)? {
            sales.push(sale);
        }
    }
    Ok(summarize(&sales, year))
}
