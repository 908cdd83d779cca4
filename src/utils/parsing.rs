use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde_json::Value;

use crate::errors::AppError;

/// Digits accepted on each side of the decimal point. Both fit comfortably
/// in a Postgres NUMERIC column.
pub const MAX_INTEGER_DIGITS: usize = 20;
pub const MAX_FRACTION_DIGITS: usize = 18;

/// Strict decimal parsing. Only plain `[+-]digits[.digits]` text is accepted:
/// no exponents, no blanks coerced to zero, and bounded digit counts.
pub fn parse_decimal(field: &str, raw: &str) -> Result<BigDecimal, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    let not_a_number = || AppError::Validation(format!("{} must be a number, got '{}'", field, trimmed));

    let unsigned = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(integer) || !fraction.map_or(true, all_digits) {
        return Err(not_a_number());
    }
    if integer.len() > MAX_INTEGER_DIGITS || fraction.map_or(0, str::len) > MAX_FRACTION_DIGITS {
        return Err(AppError::Validation(format!(
            "{} is out of range: at most {} integer and {} fractional digits",
            field, MAX_INTEGER_DIGITS, MAX_FRACTION_DIGITS
        )));
    }

    BigDecimal::from_str(trimmed).map_err(|_| not_a_number())
}

/// Accepts a JSON number or a numeric string.
pub fn decimal_field(field: &str, value: Option<&Value>) -> Result<BigDecimal, AppError> {
    match value {
        None | Some(Value::Null) => Err(AppError::Validation(format!("{} is required", field))),
        Some(Value::Number(n)) => parse_decimal(field, &json_number_text(n)),
        Some(Value::String(s)) => parse_decimal(field, s),
        Some(other) => Err(AppError::Validation(format!(
            "{} must be a number, got {}",
            field, other
        ))),
    }
}

// serde_json prints some floats with an exponent (`1e-7`); f64's Display never does.
fn json_number_text(n: &serde_json::Number) -> String {
    match (n.as_i64(), n.as_u64(), n.as_f64()) {
        (Some(i), _, _) => i.to_string(),
        (None, Some(u), _) => u.to_string(),
        (None, None, Some(f)) => f.to_string(),
        (None, None, None) => n.to_string(),
    }
}

/// Like `decimal_field` but absent values default to zero.
pub fn optional_decimal_field(field: &str, value: Option<&Value>) -> Result<BigDecimal, AppError> {
    match value {
        None | Some(Value::Null) => Ok(BigDecimal::from(0)),
        some => decimal_field(field, some),
    }
}

pub fn positive_decimal_field(field: &str, value: Option<&Value>) -> Result<BigDecimal, AppError> {
    let parsed = decimal_field(field, value)?;
    if parsed <= BigDecimal::from(0) {
        return Err(AppError::Validation(format!("{} must be > 0", field)));
    }
    Ok(parsed)
}

pub fn date_field(field: &str, value: Option<&str>) -> Result<NaiveDate, AppError> {
    let raw = value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{} is required", field)))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("{} must be a YYYY-MM-DD date, got '{}'", field, raw)))
}

pub fn required_text(field: &str, value: Option<String>) -> Result<String, AppError> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{} cannot be empty", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_decimal_accepts_numeric_text() {
        assert_eq!(parse_decimal("price", " 101.25 ").unwrap(), BigDecimal::from_str("101.25").unwrap());
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        let err = parse_decimal("price", "12abc").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(parse_decimal("price", "").is_err());
        assert!(parse_decimal("price", "NaN").is_err());
        assert!(parse_decimal("price", "1.").is_err());
        assert!(parse_decimal("price", ".5").is_err());
        assert!(parse_decimal("price", "-").is_err());
    }

    #[test]
    fn test_parse_decimal_rejects_exponents() {
        for raw in ["1e-9223372036854775808", "1e2000000", "1e-100000", "1E5", "2.5e3"] {
            let err = parse_decimal("quantity", raw).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{} should be rejected", raw);
        }
    }

    #[test]
    fn test_parse_decimal_bounds_digit_counts() {
        assert!(parse_decimal("income", "99999999999999999999").is_ok());
        assert!(parse_decimal("income", "999999999999999999999").is_err());
        assert!(parse_decimal("price", "0.000000000000000001").is_ok());
        assert!(parse_decimal("price", "0.0000000000000000001").is_err());
        assert_eq!(parse_decimal("price", "-3.5").unwrap(), BigDecimal::from_str("-3.5").unwrap());
        assert_eq!(parse_decimal("price", "+7").unwrap(), BigDecimal::from(7));
    }

    #[test]
    fn test_json_float_numbers_are_parsed_without_exponent() {
        assert_eq!(
            decimal_field("quantity", Some(&json!(0.0000001))).unwrap(),
            BigDecimal::from_str("0.0000001").unwrap()
        );
        assert_eq!(decimal_field("price", Some(&json!(101.25))).unwrap(), BigDecimal::from_str("101.25").unwrap());
        assert!(decimal_field("income", Some(&json!(1e300))).is_err());
        assert!(positive_decimal_field("quantity", Some(&json!("1e-100000"))).is_err());
    }

    #[test]
    fn test_decimal_field_accepts_numbers_and_strings() {
        let body = json!({ "a": 10, "b": "4.5", "c": true });
        assert_eq!(decimal_field("a", body.get("a")).unwrap(), BigDecimal::from(10));
        assert_eq!(decimal_field("b", body.get("b")).unwrap(), BigDecimal::from_str("4.5").unwrap());
        assert!(decimal_field("c", body.get("c")).is_err());
        assert!(decimal_field("missing", body.get("missing")).is_err());
    }

    #[test]
    fn test_optional_decimal_defaults_to_zero() {
        assert_eq!(optional_decimal_field("x", None).unwrap(), BigDecimal::from(0));
        assert!(optional_decimal_field("x", Some(&json!("ten"))).is_err());
    }

    #[test]
    fn test_positive_decimal_rejects_zero_and_negative() {
        assert!(positive_decimal_field("quantity", Some(&json!(0))).is_err());
        assert!(positive_decimal_field("quantity", Some(&json!("-3"))).is_err());
        assert!(positive_decimal_field("quantity", Some(&json!(3))).is_ok());
    }

    #[test]
    fn test_date_field() {
        assert_eq!(
            date_field("purchase_date", Some("2024-01-15")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
        assert!(date_field("purchase_date", Some("15/01/2024")).is_err());
        assert!(date_field("purchase_date", None).is_err());
    }

    #[test]
    fn test_required_text_trims() {
        assert_eq!(required_text("symbol", Some("  INFY ".into())).unwrap(), "INFY");
        assert!(required_text("symbol", Some("   ".into())).is_err());
        assert!(required_text("symbol", None).is_err());
    }
}
