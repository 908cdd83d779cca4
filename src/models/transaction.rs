use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Buy,
    Sell,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Buy => "BUY",
            TransactionKind::Sell => "SELL",
        }
    }
}

// Append-only record of a buy or sell event against a lot.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lot_id: Uuid,
    pub kind: String, // BUY or SELL, see TransactionKind
    pub quantity: BigDecimal,
    pub amount: BigDecimal,
    pub transaction_date: NaiveDate,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub lot_id: Uuid,
    pub kind: TransactionKind,
    pub quantity: BigDecimal,
    pub amount: BigDecimal,
    pub transaction_date: NaiveDate,
}

impl NewTransaction {
    pub fn buy(lot_id: Uuid, quantity: &BigDecimal, price: &BigDecimal, date: NaiveDate) -> Self {
        Self {
            lot_id,
            kind: TransactionKind::Buy,
            quantity: quantity.clone(),
            amount: price * quantity,
            transaction_date: date,
        }
    }

    pub fn sell(lot_id: Uuid, quantity: &BigDecimal, amount: BigDecimal, date: NaiveDate) -> Self {
        Self {
            lot_id,
            kind: TransactionKind::Sell,
            quantity: quantity.clone(),
            amount,
            transaction_date: date,
        }
    }
}
