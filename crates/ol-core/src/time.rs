//! Year fractions.

use chrono::NaiveDate;

use crate::{ensure, Result, Time};

/// Actual/365 Fixed year fraction from `start` to `end`.
///
/// Returns `InvalidParameter` when `end` precedes `start`.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use ol_core::year_fraction;
/// let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
/// assert_eq!(year_fraction(start, end).unwrap(), 1.0);
/// ```
pub fn year_fraction(start: NaiveDate, end: NaiveDate) -> Result<Time> {
    let days = (end - start).num_days();
    ensure!(days >= 0, "end date {end} precedes start date {start}");
    Ok(days as Time / 365.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn leap_year_counts_actual_days() {
        let t = year_fraction(date(2024, 1, 1), date(2025, 1, 1)).unwrap();
        assert_relative_eq!(t, 366.0 / 365.0);
    }

    #[test]
    fn same_day_is_zero() {
        assert_eq!(year_fraction(date(2025, 6, 30), date(2025, 6, 30)).unwrap(), 0.0);
    }

    #[test]
    fn reversed_dates_are_rejected() {
        assert!(year_fraction(date(2025, 6, 30), date(2025, 1, 1)).is_err());
    }
}
