use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;
use crate::utils::parsing::{date_field, positive_decimal_field, required_text};

/// Maximum number of snapshots kept per lot; older entries are evicted first.
pub const PRICE_HISTORY_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub date: DateTime<Utc>,
    pub price: BigDecimal,
}

// An open holding of one security bought at one price and date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenPosition {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub symbol: String,
    pub quantity: BigDecimal,
    pub purchase_price: BigDecimal,
    pub purchase_date: NaiveDate,
    pub current_price: BigDecimal,
    pub price_history: Vec<PriceSnapshot>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

// A closed lot carrying a realized gain. Never mutated once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealizedSale {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Set when this record was split off an open lot by a partial sell.
    pub source_lot_id: Option<Uuid>,
    pub name: String,
    pub symbol: String,
    pub quantity: BigDecimal,
    pub purchase_price: BigDecimal,
    pub purchase_date: NaiveDate,
    pub current_price: BigDecimal,
    pub price_history: Vec<PriceSnapshot>,
    pub sale_price: BigDecimal,
    pub sale_date: NaiveDate,
    pub capital_gains: BigDecimal,
    pub short_term_gain: BigDecimal,
    pub long_term_gain: BigDecimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Lot {
    Open(OpenPosition),
    Realized(RealizedSale),
}

impl Lot {
    pub fn id(&self) -> Uuid {
        match self {
            Lot::Open(lot) => lot.id,
            Lot::Realized(sale) => sale.id,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Lot::Open(lot) => &lot.symbol,
            Lot::Realized(sale) => &sale.symbol,
        }
    }

    pub fn quantity(&self) -> &BigDecimal {
        match self {
            Lot::Open(lot) => &lot.quantity,
            Lot::Realized(sale) => &sale.quantity,
        }
    }

    pub fn price_history(&self) -> &[PriceSnapshot] {
        match self {
            Lot::Open(lot) => &lot.price_history,
            Lot::Realized(sale) => &sale.price_history,
        }
    }

    pub fn is_sold(&self) -> bool {
        matches!(self, Lot::Realized(_))
    }
}

impl OpenPosition {
    pub fn new(user_id: Uuid, input: NewLot, current_price: BigDecimal, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: input.name,
            symbol: input.symbol,
            quantity: input.quantity,
            purchase_price: input.purchase_price,
            purchase_date: input.purchase_date,
            price_history: vec![PriceSnapshot { date: now, price: current_price.clone() }],
            current_price,
            version: 0,
            created_at: now,
        }
    }
}

/// Flat row shape of the `lots` table.
#[derive(Debug, Clone, FromRow)]
pub struct LotRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub source_lot_id: Option<Uuid>,
    pub name: String,
    pub symbol: String,
    pub quantity: BigDecimal,
    pub purchase_price: BigDecimal,
    pub purchase_date: NaiveDate,
    pub current_price: BigDecimal,
    pub price_history: Json<Vec<PriceSnapshot>>,
    pub sold: bool,
    pub sale_price: Option<BigDecimal>,
    pub sale_date: Option<NaiveDate>,
    pub capital_gains: Option<BigDecimal>,
    pub short_term_gain: Option<BigDecimal>,
    pub long_term_gain: Option<BigDecimal>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<LotRow> for Lot {
    type Error = AppError;

    fn try_from(row: LotRow) -> Result<Self, Self::Error> {
        if !row.sold {
            return Ok(Lot::Open(OpenPosition {
                id: row.id,
                user_id: row.user_id,
                name: row.name,
                symbol: row.symbol,
                quantity: row.quantity,
                purchase_price: row.purchase_price,
                purchase_date: row.purchase_date,
                current_price: row.current_price,
                price_history: row.price_history.0,
                version: row.version,
                created_at: row.created_at,
            }));
        }

        let id = row.id;
        let missing = |field: &str| AppError::Data(format!("sold lot {} has no {}", id, field));
        Ok(Lot::Realized(RealizedSale {
            sale_price: row.sale_price.ok_or_else(|| missing("sale_price"))?,
            sale_date: row.sale_date.ok_or_else(|| missing("sale_date"))?,
            capital_gains: row.capital_gains.ok_or_else(|| missing("capital_gains"))?,
            short_term_gain: row.short_term_gain.ok_or_else(|| missing("short_term_gain"))?,
            long_term_gain: row.long_term_gain.ok_or_else(|| missing("long_term_gain"))?,
            id,
            user_id: row.user_id,
            source_lot_id: row.source_lot_id,
            name: row.name,
            symbol: row.symbol,
            quantity: row.quantity,
            purchase_price: row.purchase_price,
            purchase_date: row.purchase_date,
            current_price: row.current_price,
            price_history: row.price_history.0,
            created_at: row.created_at,
        }))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LotFilter {
    #[default]
    All,
    Open,
    Sold,
}

impl LotFilter {
    pub fn sold_flag(&self) -> Option<bool> {
        match self {
            LotFilter::All => None,
            LotFilter::Open => Some(false),
            LotFilter::Sold => Some(true),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewLot {
    pub symbol: String,
    pub name: String,
    pub quantity: BigDecimal,
    pub purchase_price: BigDecimal,
    pub purchase_date: NaiveDate,
}

// Numeric fields arrive as JSON numbers or strings and are parsed strictly.
#[derive(Debug, Default, Deserialize)]
pub struct BuyLotRequest {
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub quantity: Option<Value>,
    pub purchase_price: Option<Value>,
    pub purchase_date: Option<String>,
}

impl BuyLotRequest {
    pub fn validate(self) -> Result<NewLot, AppError> {
        Ok(NewLot {
            symbol: required_text("symbol", self.symbol)?.to_uppercase(),
            name: required_text("name", self.name)?,
            quantity: positive_decimal_field("quantity", self.quantity.as_ref())?,
            purchase_price: positive_decimal_field("purchase_price", self.purchase_price.as_ref())?,
            purchase_date: date_field("purchase_date", self.purchase_date.as_deref())?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SaleOrder {
    pub quantity: BigDecimal,
    pub sale_price: BigDecimal,
    pub sale_date: NaiveDate,
}

#[derive(Debug, Default, Deserialize)]
pub struct SellLotRequest {
    pub quantity: Option<Value>,
    pub sale_price: Option<Value>,
    pub sale_date: Option<String>,
}

impl SellLotRequest {
    pub fn validate(self) -> Result<SaleOrder, AppError> {
        Ok(SaleOrder {
            quantity: positive_decimal_field("quantity", self.quantity.as_ref())?,
            sale_price: positive_decimal_field("sale_price", self.sale_price.as_ref())?,
            sale_date: date_field("sale_date", self.sale_date.as_deref())?,
        })
    }
}
