use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{TaxInputs, TaxRecord};

/// Single-statement upsert keyed on the (user_id, tax_year) unique constraint,
/// so concurrent writers for the same year cannot produce two rows.
pub async fn upsert(
    pool: &PgPool,
    user_id: Uuid,
    tax_year: i32,
    inputs: &TaxInputs,
    total_tax: &BigDecimal,
) -> Result<TaxRecord, sqlx::Error> {
    sqlx::query_as::<_, TaxRecord>(
        "INSERT INTO tax_records
         (id, user_id, tax_year, income, deductions, long_term_gains, short_term_gains,
          dividend_income, total_tax)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT (user_id, tax_year)
         DO UPDATE SET
             income = EXCLUDED.income,
             deductions = EXCLUDED.deductions,
             long_term_gains = EXCLUDED.long_term_gains,
             short_term_gains = EXCLUDED.short_term_gains,
             dividend_income = EXCLUDED.dividend_income,
             total_tax = EXCLUDED.total_tax,
             updated_at = now()
         RETURNING id, user_id, tax_year, income, deductions, long_term_gains, short_term_gains,
                   dividend_income, total_tax, created_at, updated_at"
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(tax_year)
    .bind(&inputs.income)
    .bind(&inputs.deductions)
    .bind(&inputs.long_term_gains)
    .bind(&inputs.short_term_gains)
    .bind(&inputs.dividend_income)
    .bind(total_tax)
    .fetch_one(pool)
    .await
}

pub async fn fetch_one(
    pool: &PgPool,
    user_id: Uuid,
    tax_year: i32,
) -> Result<Option<TaxRecord>, sqlx::Error> {
    sqlx::query_as::<_, TaxRecord>(
        "SELECT id, user_id, tax_year, income, deductions, long_term_gains, short_term_gains,
                dividend_income, total_tax, created_at, updated_at
         FROM tax_records
         WHERE user_id = $1 AND tax_year = $2"
    )
    .bind(user_id)
    .bind(tax_year)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_all(pool: &PgPool, user_id: Uuid) -> Result<Vec<TaxRecord>, sqlx::Error> {
    sqlx::query_as::<_, TaxRecord>(
        "SELECT id, user_id, tax_year, income, deductions, long_term_gains, short_term_gains,
                dividend_income, total_tax, created_at, updated_at
         FROM tax_records
         WHERE user_id = $1
         ORDER BY tax_year DESC"
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
