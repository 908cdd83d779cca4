use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::Serialize;

/// Holdings strictly longer than this many days are long-term.
pub const LONG_TERM_THRESHOLD_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GainTerm {
    ShortTerm,
    LongTerm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub term: GainTerm,
    pub days_held: i64,
    pub threshold_days: i64,
}

impl Classification {
    /// Routes a gain (or loss) into `(short_term_gain, long_term_gain)`; the other side is zero.
    pub fn split(&self, gain: &BigDecimal) -> (BigDecimal, BigDecimal) {
        match self.term {
            GainTerm::ShortTerm => (gain.clone(), BigDecimal::from(0)),
            GainTerm::LongTerm => (BigDecimal::from(0), gain.clone()),
        }
    }
}

pub fn classify(purchase_date: NaiveDate, sale_date: NaiveDate) -> Classification {
    let days_held = (sale_date - purchase_date).num_days();
    let term = if days_held > LONG_TERM_THRESHOLD_DAYS {
        GainTerm::LongTerm
    } else {
        GainTerm::ShortTerm
    };

    Classification {
        term,
        days_held,
        threshold_days: LONG_TERM_THRESHOLD_DAYS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn bought() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 3, 1).unwrap()
    }

    #[test]
    fn test_365_days_is_short_term() {
        let c = classify(bought(), bought() + Duration::days(365));
        assert_eq!(c.days_held, 365);
        assert_eq!(c.term, GainTerm::ShortTerm);
    }

    #[test]
    fn test_366_days_is_long_term() {
        let c = classify(bought(), bought() + Duration::days(366));
        assert_eq!(c.term, GainTerm::LongTerm);
        assert_eq!(c.threshold_days, 365);
    }

    #[test]
    fn test_same_day_sale_is_short_term() {
        assert_eq!(classify(bought(), bought()).term, GainTerm::ShortTerm);
    }

    #[test]
    fn test_leap_year_counts_calendar_days() {
        // 2024 is a leap year: 2024-01-01 -> 2024-12-31 is 365 days
        let c = classify(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        );
        assert_eq!(c.days_held, 365);
        assert_eq!(c.term, GainTerm::ShortTerm);
    }

    #[test]
    fn test_split_routes_loss_to_long_term() {
        let c = classify(bought(), bought() + Duration::days(400));
        let (short, long) = c.split(&BigDecimal::from(-120));
        assert_eq!(short, BigDecimal::from(0));
        assert_eq!(long, BigDecimal::from(-120));
    }
}
