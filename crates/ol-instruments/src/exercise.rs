//! Exercise styles.
//!
//! An [`ExerciseStyle`] defines *when* an option can be exercised. Times are
//! year fractions from the valuation date; [`ExerciseStyle::bermudan_dates`]
//! converts calendar dates.

use std::fmt;

use chrono::NaiveDate;
use ol_core::{errors::Result, year_fraction, Time};

/// Exercise rights of an option.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExerciseStyle {
    /// Exercise only at maturity.
    European,
    /// Exercise at any time up to maturity.
    American,
    /// Exercise on a discrete set of times.
    Bermudan {
        /// Sorted exercise times in years, each in `(0, T]`.
        exercise_times: Vec<Time>,
    },
    /// American exercise with no maturity.
    Perpetual,
}

impl ExerciseStyle {
    /// Bermudan style from exercise times; sorts and deduplicates.
    pub fn bermudan(mut exercise_times: Vec<Time>) -> Self {
        exercise_times.sort_by(|a, b| a.total_cmp(b));
        exercise_times.dedup();
        ExerciseStyle::Bermudan { exercise_times }
    }

    /// Bermudan style from calendar dates, measured Act/365F from
    /// `valuation_date`.
    pub fn bermudan_dates(valuation_date: NaiveDate, dates: &[NaiveDate]) -> Result<Self> {
        let times = dates
            .iter()
            .map(|&d| year_fraction(valuation_date, d))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::bermudan(times))
    }

    /// Whether the holder may exercise before maturity.
    pub fn allows_early_exercise(&self) -> bool {
        !matches!(self, ExerciseStyle::European)
    }
}

impl fmt::Display for ExerciseStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExerciseStyle::European => write!(f, "European"),
            ExerciseStyle::American => write!(f, "American"),
            ExerciseStyle::Bermudan { exercise_times } => {
                write!(f, "Bermudan({} dates)", exercise_times.len())
            }
            ExerciseStyle::Perpetual => write!(f, "Perpetual"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bermudan_sorts_and_dedups() {
        let ex = ExerciseStyle::bermudan(vec![0.75, 0.25, 0.5, 0.25]);
        assert_eq!(
            ex,
            ExerciseStyle::Bermudan {
                exercise_times: vec![0.25, 0.5, 0.75]
            }
        );
        assert_eq!(ex.to_string(), "Bermudan(3 dates)");
    }

    #[test]
    fn bermudan_from_dates() {
        let val = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let dates = [
            NaiveDate::from_ymd_opt(2025, 7, 2).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        ];
        let ExerciseStyle::Bermudan { exercise_times } =
            ExerciseStyle::bermudan_dates(val, &dates).unwrap()
        else {
            panic!("expected Bermudan");
        };
        assert!((exercise_times[0] - 182.0 / 365.0).abs() < 1e-15);
        assert!((exercise_times[1] - 1.0).abs() < 1e-15);
    }

    #[test]
    fn dates_before_valuation_fail() {
        let val = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let past = [NaiveDate::from_ymd_opt(2024, 12, 1).unwrap()];
        assert!(ExerciseStyle::bermudan_dates(val, &past).is_err());
    }
}
