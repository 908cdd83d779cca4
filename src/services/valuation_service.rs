use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::auth::OwnerContext;
use crate::db;
use crate::errors::AppError;
use crate::models::{Lot, ValuationMeta, ValuationPoint, ValuationResponse};

/// Daily portfolio value from every lot's price history, open and realized.
///
/// Each snapshot is weighted by the lot's quantity as it is now, not the
/// quantity held on the snapshot's day. After a partial sell, older days are
/// valued with the reduced remainder plus the realized copy, which carries
/// the same history.
pub fn aggregate(lots: &[Lot]) -> Vec<ValuationPoint> {
    let mut by_day: BTreeMap<NaiveDate, BigDecimal> = BTreeMap::new();

    for lot in lots {
        let quantity = lot.quantity();
        for snapshot in lot.price_history() {
            let value = &snapshot.price * quantity;
            *by_day
                .entry(snapshot.date.date_naive())
                .or_insert_with(|| BigDecimal::from(0)) += value;
        }
    }

    by_day
        .into_iter()
        .map(|(date, total_value)| ValuationPoint { date, total_value })
        .collect()
}

pub async fn history(pool: &PgPool, owner: &OwnerContext) -> Result<ValuationResponse, AppError> {
    let lots = db::lot_queries::fetch_all(pool, owner.user_id, None)
        .await?
        .into_iter()
        .map(Lot::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    let series = aggregate(&lots);
    let meta = ValuationMeta {
        points: series.len(),
        start: series.first().map(|p| p.date),
        end: series.last().map(|p| p.date),
    };

    Ok(ValuationResponse { series, meta })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OpenPosition, PriceSnapshot, RealizedSale};
    use chrono::{Datelike, TimeZone, Utc};
    use uuid::Uuid;

    fn snap(day: u32, hour: u32, price: i32) -> PriceSnapshot {
        PriceSnapshot {
            date: Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap(),
            price: BigDecimal::from(price),
        }
    }

    fn open(quantity: i32, history: Vec<PriceSnapshot>) -> Lot {
        Lot::Open(OpenPosition {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Tata Motors".into(),
            symbol: "TATAMOTORS".into(),
            quantity: BigDecimal::from(quantity),
            purchase_price: BigDecimal::from(10),
            purchase_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            current_price: history.last().map(|s| s.price.clone()).unwrap_or_default(),
            price_history: history,
            version: 0,
            created_at: Utc::now(),
        })
    }

    fn realized(quantity: i32, history: Vec<PriceSnapshot>) -> Lot {
        Lot::Realized(RealizedSale {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            source_lot_id: None,
            name: "Tata Motors".into(),
            symbol: "TATAMOTORS".into(),
            quantity: BigDecimal::from(quantity),
            purchase_price: BigDecimal::from(10),
            purchase_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            current_price: BigDecimal::from(12),
            price_history: history,
            sale_price: BigDecimal::from(12),
            sale_date: NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
            capital_gains: BigDecimal::from(2 * quantity),
            short_term_gain: BigDecimal::from(2 * quantity),
            long_term_gain: BigDecimal::from(0),
            created_at: Utc::now(),
        })
    }

    #[test]
    fn test_groups_by_day_and_sorts_ascending() {
        let lots = vec![
            open(2, vec![snap(3, 9, 10), snap(1, 9, 5)]),
            realized(3, vec![snap(1, 15, 4), snap(2, 10, 6)]),
        ];

        let series = aggregate(&lots);
        let dates: Vec<u32> = series.iter().map(|p| p.date.day()).collect();
        assert_eq!(dates, vec![1, 2, 3]);

        // day 1: 2*5 + 3*4, day 2: 3*6, day 3: 2*10
        assert_eq!(series[0].total_value, BigDecimal::from(22));
        assert_eq!(series[1].total_value, BigDecimal::from(18));
        assert_eq!(series[2].total_value, BigDecimal::from(20));
    }

    #[test]
    fn test_multiple_snapshots_same_day_are_summed() {
        let lots = vec![open(1, vec![snap(4, 9, 10), snap(4, 16, 11)])];
        let series = aggregate(&lots);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].total_value, BigDecimal::from(21));
    }

    #[test]
    fn test_uses_current_quantity() {
        // The snapshot predates a partial sell from 10 to 6 units; it is valued at 6.
        let lots = vec![open(6, vec![snap(1, 9, 100)])];
        assert_eq!(aggregate(&lots)[0].total_value, BigDecimal::from(600));
    }

    #[test]
    fn test_empty_portfolio() {
        assert!(aggregate(&[]).is_empty());
    }
}
