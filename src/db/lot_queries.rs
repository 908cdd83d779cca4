use sqlx::types::Json;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::models::{LotRow, OpenPosition, RealizedSale};

const LOT_COLUMNS: &str = "id, user_id, source_lot_id, name, symbol, quantity, purchase_price, \
     purchase_date, current_price, price_history, sold, sale_price, sale_date, capital_gains, \
     short_term_gain, long_term_gain, version, created_at";

pub async fn fetch_one(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<LotRow>, sqlx::Error> {
    let sql = format!("SELECT {} FROM lots WHERE id = $1 AND user_id = $2", LOT_COLUMNS);
    sqlx::query_as::<_, LotRow>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// `sold = None` returns every lot; `Some(flag)` filters on the sold flag.
pub async fn fetch_all(
    pool: &PgPool,
    user_id: Uuid,
    sold: Option<bool>,
) -> Result<Vec<LotRow>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM lots
         WHERE user_id = $1 AND ($2::BOOLEAN IS NULL OR sold = $2)
         ORDER BY created_at ASC, id ASC",
        LOT_COLUMNS
    );
    sqlx::query_as::<_, LotRow>(&sql)
        .bind(user_id)
        .bind(sold)
        .fetch_all(pool)
        .await
}

/// Row-locks an open lot for the rest of the surrounding transaction.
pub async fn lock_open<'e, E>(
    executor: E,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<LotRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        "SELECT {} FROM lots WHERE id = $1 AND user_id = $2 AND sold = FALSE FOR UPDATE",
        LOT_COLUMNS
    );
    sqlx::query_as::<_, LotRow>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

pub async fn insert_open<'e, E>(executor: E, lot: &OpenPosition) -> Result<LotRow, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        "INSERT INTO lots (id, user_id, name, symbol, quantity, purchase_price, purchase_date,
                           current_price, price_history, sold, version, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, FALSE, $10, $11)
         RETURNING {}",
        LOT_COLUMNS
    );
    sqlx::query_as::<_, LotRow>(&sql)
        .bind(lot.id)
        .bind(lot.user_id)
        .bind(&lot.name)
        .bind(&lot.symbol)
        .bind(&lot.quantity)
        .bind(&lot.purchase_price)
        .bind(lot.purchase_date)
        .bind(&lot.current_price)
        .bind(Json(&lot.price_history))
        .bind(lot.version)
        .bind(lot.created_at)
        .fetch_one(executor)
        .await
}

pub async fn insert_realized<'e, E>(executor: E, sale: &RealizedSale) -> Result<LotRow, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        "INSERT INTO lots (id, user_id, source_lot_id, name, symbol, quantity, purchase_price,
                           purchase_date, current_price, price_history, sold, sale_price, sale_date,
                           capital_gains, short_term_gain, long_term_gain, version, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, TRUE, $11, $12, $13, $14, $15, 0, $16)
         RETURNING {}",
        LOT_COLUMNS
    );
    sqlx::query_as::<_, LotRow>(&sql)
        .bind(sale.id)
        .bind(sale.user_id)
        .bind(sale.source_lot_id)
        .bind(&sale.name)
        .bind(&sale.symbol)
        .bind(&sale.quantity)
        .bind(&sale.purchase_price)
        .bind(sale.purchase_date)
        .bind(&sale.current_price)
        .bind(Json(&sale.price_history))
        .bind(&sale.sale_price)
        .bind(sale.sale_date)
        .bind(&sale.capital_gains)
        .bind(&sale.short_term_gain)
        .bind(&sale.long_term_gain)
        .bind(sale.created_at)
        .fetch_one(executor)
        .await
}

/// Writes quantity and price fields of an open lot if it is still at
/// `expected_version`. Returns `None` when the lot moved on or was sold.
pub async fn update_open<'e, E>(
    executor: E,
    lot: &OpenPosition,
    expected_version: i64,
) -> Result<Option<LotRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        "UPDATE lots
         SET quantity = $3, current_price = $4, price_history = $5,
             version = version + 1, updated_at = now()
         WHERE id = $1 AND user_id = $2 AND sold = FALSE AND version = $6
         RETURNING {}",
        LOT_COLUMNS
    );
    sqlx::query_as::<_, LotRow>(&sql)
        .bind(lot.id)
        .bind(lot.user_id)
        .bind(&lot.quantity)
        .bind(&lot.current_price)
        .bind(Json(&lot.price_history))
        .bind(expected_version)
        .fetch_optional(executor)
        .await
}

/// Closes an open lot in place with its sale fields.
pub async fn close<'e, E>(
    executor: E,
    sale: &RealizedSale,
    expected_version: i64,
) -> Result<Option<LotRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        "UPDATE lots
         SET sold = TRUE, sale_price = $3, sale_date = $4, capital_gains = $5,
             short_term_gain = $6, long_term_gain = $7, current_price = $8, price_history = $9,
             version = version + 1, updated_at = now()
         WHERE id = $1 AND user_id = $2 AND sold = FALSE AND version = $10
         RETURNING {}",
        LOT_COLUMNS
    );
    sqlx::query_as::<_, LotRow>(&sql)
        .bind(sale.id)
        .bind(sale.user_id)
        .bind(&sale.sale_price)
        .bind(sale.sale_date)
        .bind(&sale.capital_gains)
        .bind(&sale.short_term_gain)
        .bind(&sale.long_term_gain)
        .bind(&sale.current_price)
        .bind(Json(&sale.price_history))
        .bind(expected_version)
        .fetch_optional(executor)
        .await
}
