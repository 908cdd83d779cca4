use bigdecimal::BigDecimal;
use sqlx::PgPool;
use tracing::{error, info};

use crate::auth::OwnerContext;
use crate::db;
use crate::errors::AppError;
use crate::models::{validate_year, SlabTable, TaxBreakdown, TaxInputs, TaxRecord, TaxRequest};

pub const BASELINE_SLABS: SlabTable = SlabTable {
    slab1: 250_000,
    slab2: 500_000,
    slab3: 1_000_000,
    bracket3_base: 12_500,
    bracket4_base: 112_500,
};

/// Years with a published slab table. Anything else uses `BASELINE_SLABS`.
const SLAB_TABLES: &[(i32, SlabTable)] = &[
    (2020, BASELINE_SLABS),
    (2021, BASELINE_SLABS),
    (2022, BASELINE_SLABS),
    (2023, BASELINE_SLABS),
    (2024, BASELINE_SLABS),
];

pub const LTCG_EXEMPTION: i64 = 100_000;

fn rate(percent: u32) -> BigDecimal {
    BigDecimal::from(percent) / BigDecimal::from(100)
}

/// Returns the slab table for `year` and whether the baseline was used.
pub fn slabs_for_year(year: i32) -> (SlabTable, bool) {
    SLAB_TABLES
        .iter()
        .find(|(y, _)| *y == year)
        .map(|(_, table)| (*table, false))
        .unwrap_or((BASELINE_SLABS, true))
}

pub fn base_tax(taxable_income: &BigDecimal, slabs: &SlabTable) -> BigDecimal {
    let slab1 = BigDecimal::from(slabs.slab1);
    let slab2 = BigDecimal::from(slabs.slab2);
    let slab3 = BigDecimal::from(slabs.slab3);

    if taxable_income <= &slab1 {
        BigDecimal::from(0)
    } else if taxable_income <= &slab2 {
        rate(5) * (taxable_income - &slab1)
    } else if taxable_income <= &slab3 {
        BigDecimal::from(slabs.bracket3_base) + rate(20) * (taxable_income - &slab2)
    } else {
        BigDecimal::from(slabs.bracket4_base) + rate(30) * (taxable_income - &slab3)
    }
}

pub fn calculate_tax(inputs: &TaxInputs, year: i32) -> TaxBreakdown {
    let zero = BigDecimal::from(0);
    let (slabs, baseline_slabs) = slabs_for_year(year);

    let taxable_income = &inputs.income - &inputs.deductions;
    let base_tax = base_tax(&taxable_income, &slabs);

    let ltcg_above_exemption = &inputs.long_term_gains - BigDecimal::from(LTCG_EXEMPTION);
    let ltcg_tax = if ltcg_above_exemption > zero {
        rate(10) * ltcg_above_exemption
    } else {
        zero.clone()
    };
    let stcg_tax = rate(15) * &inputs.short_term_gains;
    let dividend_tax = rate(10) * &inputs.dividend_income;

    let total_tax = &base_tax + &ltcg_tax + &stcg_tax + &dividend_tax;

    TaxBreakdown {
        year,
        slabs,
        baseline_slabs,
        taxable_income,
        base_tax,
        ltcg_tax,
        stcg_tax,
        dividend_tax,
        total_tax,
    }
}

pub fn calculate(year: i32, request: TaxRequest) -> Result<TaxBreakdown, AppError> {
    let year = validate_year(year)?;
    let inputs = request.validate()?;
    Ok(calculate_tax(&inputs, year))
}

pub async fn create_or_update_tax(
    pool: &PgPool,
    owner: &OwnerContext,
    year: i32,
    request: TaxRequest,
) -> Result<TaxRecord, AppError> {
    let year = validate_year(year)?;
    let inputs = request.validate()?;
    let breakdown = calculate_tax(&inputs, year);

    let record = db::tax_queries::upsert(pool, owner.user_id, year, &inputs, &breakdown.total_tax)
        .await
        .map_err(|e| {
            error!("Failed to upsert tax record for {} / {}: {}", owner.user_id, year, e);
            AppError::Db(e)
        })?;

    info!("✓ Tax record for {} saved: total {}", year, record.total_tax);
    Ok(record)
}

pub async fn get_tax_record(pool: &PgPool, owner: &OwnerContext, year: i32) -> Result<TaxRecord, AppError> {
    db::tax_queries::fetch_one(pool, owner.user_id, year)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No tax record for {}", year)))
}

pub async fn list_tax_records(pool: &PgPool, owner: &OwnerContext) -> Result<Vec<TaxRecord>, AppError> {
    Ok(db::tax_queries::fetch_all(pool, owner.user_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(income: i64, deductions: i64, ltcg: i64, stcg: i64, dividend: i64) -> TaxInputs {
        TaxInputs {
            income: BigDecimal::from(income),
            deductions: BigDecimal::from(deductions),
            long_term_gains: BigDecimal::from(ltcg),
            short_term_gains: BigDecimal::from(stcg),
            dividend_income: BigDecimal::from(dividend),
        }
    }

    #[test]
    fn test_bracket_one_is_tax_free() {
        let result = calculate_tax(&inputs(200_000, 0, 0, 0, 0), 2024);
        assert_eq!(result.total_tax, BigDecimal::from(0));
    }

    #[test]
    fn test_bracket_two() {
        // 0.05 * (400000 - 250000)
        let result = calculate_tax(&inputs(400_000, 0, 0, 0, 0), 2024);
        assert_eq!(result.base_tax, BigDecimal::from(7_500));
    }

    #[test]
    fn test_bracket_three() {
        let result = calculate_tax(&inputs(600_000, 0, 0, 0, 0), 2024);
        assert_eq!(result.base_tax, BigDecimal::from(32_500));
        assert_eq!(result.total_tax, BigDecimal::from(32_500));
    }

    #[test]
    fn test_bracket_four() {
        // 112500 + 0.30 * (1500000 - 1000000)
        let result = calculate_tax(&inputs(1_500_000, 0, 0, 0, 0), 2024);
        assert_eq!(result.total_tax, BigDecimal::from(262_500));
    }

    #[test]
    fn test_bracket_edges_are_inclusive() {
        assert_eq!(calculate_tax(&inputs(250_000, 0, 0, 0, 0), 2024).total_tax, BigDecimal::from(0));
        assert_eq!(calculate_tax(&inputs(500_000, 0, 0, 0, 0), 2024).total_tax, BigDecimal::from(12_500));
        assert_eq!(calculate_tax(&inputs(1_000_000, 0, 0, 0, 0), 2024).total_tax, BigDecimal::from(112_500));
    }

    #[test]
    fn test_deductions_reduce_taxable_income() {
        let result = calculate_tax(&inputs(650_000, 150_000, 0, 0, 0), 2024);
        assert_eq!(result.taxable_income, BigDecimal::from(500_000));
        assert_eq!(result.base_tax, BigDecimal::from(12_500));
    }

    #[test]
    fn test_deductions_above_income_give_zero_base() {
        let result = calculate_tax(&inputs(100_000, 300_000, 0, 0, 0), 2024);
        assert_eq!(result.taxable_income, BigDecimal::from(-200_000));
        assert_eq!(result.base_tax, BigDecimal::from(0));
    }

    #[test]
    fn test_gains_and_dividends() {
        // ltcg: 0.10 * (250000 - 100000), stcg: 0.15 * 40000, dividend: 0.10 * 10000
        let result = calculate_tax(&inputs(0, 0, 250_000, 40_000, 10_000), 2024);
        assert_eq!(result.ltcg_tax, BigDecimal::from(15_000));
        assert_eq!(result.stcg_tax, BigDecimal::from(6_000));
        assert_eq!(result.dividend_tax, BigDecimal::from(1_000));
        assert_eq!(result.total_tax, BigDecimal::from(22_000));
    }

    #[test]
    fn test_ltcg_within_exemption_is_untaxed() {
        let result = calculate_tax(&inputs(0, 0, 90_000, 0, 0), 2024);
        assert_eq!(result.ltcg_tax, BigDecimal::from(0));
    }

    #[test]
    fn test_unknown_year_uses_baseline() {
        let (table, baseline) = slabs_for_year(1999);
        assert!(baseline);
        assert_eq!(table, BASELINE_SLABS);

        let (_, baseline) = slabs_for_year(2024);
        assert!(!baseline);
        assert_eq!(
            calculate_tax(&inputs(600_000, 0, 0, 0, 0), 1999).total_tax,
            calculate_tax(&inputs(600_000, 0, 0, 0, 0), 2024).total_tax
        );
    }

    #[test]
    fn test_calculate_validates_year() {
        let request = TaxRequest { income: Some(serde_json::json!(1)), ..Default::default() };
        assert!(matches!(calculate(3000, request), Err(AppError::Validation(_))));
    }
}
