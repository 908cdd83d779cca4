use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;
use crate::utils::parsing::{decimal_field, optional_decimal_field};

pub const MIN_TAX_YEAR: i32 = 1900;
pub const MAX_TAX_YEAR: i32 = 2100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxInputs {
    pub income: BigDecimal,
    pub deductions: BigDecimal,
    pub long_term_gains: BigDecimal,
    pub short_term_gains: BigDecimal,
    pub dividend_income: BigDecimal,
}

// One row per (user, tax year); enforced by a unique constraint.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaxRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tax_year: i32,
    pub income: BigDecimal,
    pub deductions: BigDecimal,
    pub long_term_gains: BigDecimal,
    pub short_term_gains: BigDecimal,
    pub dividend_income: BigDecimal,
    pub total_tax: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TaxRequest {
    pub income: Option<Value>,
    pub deductions: Option<Value>,
    pub long_term_gains: Option<Value>,
    pub short_term_gains: Option<Value>,
    pub dividend_income: Option<Value>,
}

impl TaxRequest {
    /// Income is required; the other inputs default to zero when omitted.
    pub fn validate(self) -> Result<TaxInputs, AppError> {
        let inputs = TaxInputs {
            income: decimal_field("income", self.income.as_ref())?,
            deductions: optional_decimal_field("deductions", self.deductions.as_ref())?,
            long_term_gains: optional_decimal_field("long_term_gains", self.long_term_gains.as_ref())?,
            short_term_gains: optional_decimal_field("short_term_gains", self.short_term_gains.as_ref())?,
            dividend_income: optional_decimal_field("dividend_income", self.dividend_income.as_ref())?,
        };

        let zero = BigDecimal::from(0);
        for (field, value) in [
            ("income", &inputs.income),
            ("deductions", &inputs.deductions),
            ("long_term_gains", &inputs.long_term_gains),
            ("short_term_gains", &inputs.short_term_gains),
            ("dividend_income", &inputs.dividend_income),
        ] {
            if value < &zero {
                return Err(AppError::Validation(format!("{} cannot be negative", field)));
            }
        }
        Ok(inputs)
    }
}

#[derive(Debug, Deserialize)]
pub struct CalculateTaxRequest {
    pub year: i32,
    #[serde(flatten)]
    pub inputs: TaxRequest,
}

pub fn validate_year(year: i32) -> Result<i32, AppError> {
    if !(MIN_TAX_YEAR..=MAX_TAX_YEAR).contains(&year) {
        return Err(AppError::Validation(format!(
            "tax year must be between {} and {}",
            MIN_TAX_YEAR, MAX_TAX_YEAR
        )));
    }
    Ok(year)
}

/// Progressive slab thresholds plus the fixed tax owed at the start of
/// the third and fourth brackets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlabTable {
    pub slab1: i64,
    pub slab2: i64,
    pub slab3: i64,
    pub bracket3_base: i64,
    pub bracket4_base: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaxBreakdown {
    pub year: i32,
    pub slabs: SlabTable,
    pub baseline_slabs: bool,
    pub taxable_income: BigDecimal,
    pub base_tax: BigDecimal,
    pub ltcg_tax: BigDecimal,
    pub stcg_tax: BigDecimal,
    pub dividend_tax: BigDecimal,
    pub total_tax: BigDecimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tax_request_defaults_optional_fields() {
        let request = TaxRequest { income: Some(json!(600000)), ..Default::default() };
        let inputs = request.validate().unwrap();
        assert_eq!(inputs.income, BigDecimal::from(600000));
        assert_eq!(inputs.dividend_income, BigDecimal::from(0));
    }

    #[test]
    fn test_tax_request_requires_income() {
        let request = TaxRequest { deductions: Some(json!(5)), ..Default::default() };
        assert!(matches!(request.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_tax_request_rejects_negative_and_text() {
        let request = TaxRequest {
            income: Some(json!(100)),
            dividend_income: Some(json!(-1)),
            ..Default::default()
        };
        assert!(request.validate().is_err());

        let request = TaxRequest { income: Some(json!("lots")), ..Default::default() };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_tax_request_rejects_huge_exponent_income() {
        let request = TaxRequest { income: Some(json!("1e2000000")), ..Default::default() };
        assert!(matches!(request.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_calculate_request_flattens_inputs() {
        let request: CalculateTaxRequest =
            serde_json::from_value(json!({ "year": 2024, "income": "600000" })).unwrap();
        assert_eq!(request.year, 2024);
        assert!(request.inputs.validate().is_ok());
    }

    #[test]
    fn test_validate_year_bounds() {
        assert!(validate_year(2024).is_ok());
        assert!(validate_year(1899).is_err());
        assert!(validate_year(2101).is_err());
    }
}
