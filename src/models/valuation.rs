use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationPoint {
    pub date: NaiveDate,
    pub total_value: BigDecimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationMeta {
    pub points: usize,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationResponse {
    pub series: Vec<ValuationPoint>,
    pub meta: ValuationMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GainsSummary {
    pub year: Option<i32>,
    pub realized_lots: usize,
    pub capital_gains: BigDecimal,
    pub short_term_gains: BigDecimal,
    pub long_term_gains: BigDecimal,
}
