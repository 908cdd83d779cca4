use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::models::{NewTransaction, Transaction};

pub async fn insert<'e, E>(
    executor: E,
    user_id: Uuid,
    input: &NewTransaction,
) -> Result<Transaction, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Transaction>(
        "INSERT INTO transactions (id, user_id, lot_id, kind, quantity, amount, transaction_date)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING id, user_id, lot_id, kind, quantity, amount, transaction_date, created_at"
    )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(input.lot_id)
        .bind(input.kind.as_str())
        .bind(&input.quantity)
        .bind(&input.amount)
        .bind(input.transaction_date)
        .fetch_one(executor)
        .await
}

pub async fn fetch_all(
    pool: &PgPool,
    user_id: Uuid,
    lot_id: Option<Uuid>,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        "SELECT id, user_id, lot_id, kind, quantity, amount, transaction_date, created_at
         FROM transactions
         WHERE user_id = $1 AND ($2::UUID IS NULL OR lot_id = $2)
         ORDER BY created_at ASC, id ASC"
    )
        .bind(user_id)
        .bind(lot_id)
        .fetch_all(pool)
        .await
}
