use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::error::{FinanceError, Result};

const MONTH_NAMES: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

/// Year-month bucket key, written as "YYYY-MM".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthYear {
    year: i32,
    month: u32,
}

impl MonthYear {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) || !(0..=9999).contains(&year) {
            return Err(FinanceError::Validation(format!(
                "Invalid month {:04}-{:02}",
                year, month
            )));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Inclusive "YYYY-MM-DD" text bounds of the month. Stored dates compare as
    /// text, so `date BETWEEN first AND last` selects the month and can use the
    /// date index.
    pub fn date_bounds(&self) -> (String, String) {
        (format!("{}-01", self), format!("{}-31", self))
    }

    /// Spanish month name and year, e.g. "Marzo 2024".
    pub fn display_name(&self) -> String {
        format!("{} {}", MONTH_NAMES[(self.month - 1) as usize], self.year)
    }
}

impl fmt::Display for MonthYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthYear {
    type Err = FinanceError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || FinanceError::Validation(format!("Invalid month '{}'. Use YYYY-MM.", s));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        MonthYear::new(year, month).map_err(|_| invalid())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyBalance {
    pub month: MonthYear,
    pub balance: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month_year() {
        let month: MonthYear = "2024-03".parse().unwrap();
        assert_eq!(month, MonthYear::new(2024, 3).unwrap());
        assert_eq!(month.to_string(), "2024-03");
    }

    #[test]
    fn test_parse_month_year_rejects_bad_input() {
        for input in ["2024-3", "2024-13", "2024-00", "24-03", "2024/03", "2024-03-01", "abcd-ef", ""] {
            assert!(input.parse::<MonthYear>().is_err(), "accepted {input}");
        }
    }

    #[test]
    fn test_previous_wraps_year() {
        let january = MonthYear::new(2024, 1).unwrap();
        assert_eq!(january.previous(), MonthYear::new(2023, 12).unwrap());
        assert_eq!(MonthYear::new(2024, 5).unwrap().previous().to_string(), "2024-04");
    }

    #[test]
    fn test_from_date() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
        assert_eq!(MonthYear::from_date(date).to_string(), "2025-11");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(MonthYear::new(2024, 3).unwrap().display_name(), "Marzo 2024");
        assert_eq!(MonthYear::new(2023, 12).unwrap().display_name(), "Diciembre 2023");
    }

    #[test]
    fn test_ordering_is_chronological() {
        let mut months = vec![
            MonthYear::new(2024, 2).unwrap(),
            MonthYear::new(2023, 12).unwrap(),
            MonthYear::new(2024, 1).unwrap(),
        ];
        months.sort();
        let keys: Vec<String> = months.iter().map(|m| m.to_string()).collect();
        assert_eq!(keys, vec!["2023-12", "2024-01", "2024-02"]);
    }

    #[test]
    fn test_date_bounds_cover_the_month_only() {
        let (first, last) = MonthYear::new(2024, 2).unwrap().date_bounds();
        assert_eq!((first.as_str(), last.as_str()), ("2024-02-01", "2024-02-31"));
        for inside in ["2024-02-01", "2024-02-29"] {
            assert!(first.as_str() <= inside && inside <= last.as_str());
        }
        for outside in ["2024-01-31", "2024-03-01", "2024-10-01"] {
            assert!(!(first.as_str() <= outside && outside <= last.as_str()));
        }
    }
}
