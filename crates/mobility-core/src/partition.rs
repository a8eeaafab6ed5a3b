use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};

/// Year-month shard identifier, rendered as `{year}_{month:02}`.
///
/// Only constructible from a calendar date, so the rendered form is always
/// digits and an underscore and is safe to splice into a schema identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey {
    year: i32,
    month: u32,
}

impl PartitionKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The schema name as a double-quoted identifier.
    pub fn quoted_schema(&self) -> String {
        format!("\"{self}\"")
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{:02}", self.year, self.month)
    }
}

impl Serialize for PartitionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(date: &str) -> String {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        PartitionKey::from_date(date).to_string()
    }

    #[test]
    fn pads_single_digit_months() {
        assert_eq!(key("2024-03-15"), "2024_03");
        assert_eq!(key("2024-01-05"), "2024_01");
        assert_eq!(key("2023-12-31"), "2023_12");
    }

    #[test]
    fn same_month_same_key() {
        assert_eq!(key("2024-06-01"), key("2024-06-30"));
        assert_ne!(key("2024-06-30"), key("2024-07-01"));
    }

    #[test]
    fn quotes_schema_identifier() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(PartitionKey::from_date(date).quoted_schema(), "\"2024_06\"");
    }
}
