//! Per-dataset row normalization.
//!
//! A [`Normalizer`] walks the source rows lazily. For every row it parses the
//! dataset's date column and checks the row against the batch partition
//! before looking at the polygon, so a malformed date aborts the batch even
//! on rows that would otherwise be dropped.

use std::iter::Enumerate;
use std::slice::Iter;

use chrono::NaiveDate;
use mobility_parser::{Dataset, RawRow, Scalar};
use serde::Serialize;

use crate::datasets::{DatasetKind, POLYGON_COLUMN};
use crate::error::{Result, TransformError};
use crate::partition::PartitionKey;
use crate::statement::SqlValue;

const DATE_FORMAT: &str = "%Y-%m-%d";

const REACH_MONTHLY_COLUMNS: [&str; 8] = [
    "IMPRESSIONS",
    "USER_REACH",
    "DAILY_AVERAGE_IMPRESSIONS",
    "DAILY_AVERAGE_USER_REACH",
    "WEEKDAYS_IMPRESSIONS",
    "WEEKDAYS_USER_REACH",
    "WEEKENDS_IMPRESSIONS",
    "WEEKENDS_USER_REACH",
];

/// The dataset columns of one retained row, after null substitution.
#[derive(Debug, Clone, PartialEq)]
pub enum Fields {
    /// Values in destination column order (after `date, polygon`).
    Columns(Vec<SqlValue>),
    /// A measure destined for one value column of a folded record.
    Slot { slot: usize, measure: SqlValue },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub index: usize,
    pub date: NaiveDate,
    pub polygon: String,
    pub fields: Fields,
}

/// Counts describing what happened to the rows of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransformReport {
    pub rows_read: usize,
    pub dropped_missing_polygon: usize,
    pub dropped_missing_metric: usize,
    pub records: usize,
    pub partition: Option<PartitionKey>,
}

impl TransformReport {
    pub fn dropped(&self) -> usize {
        self.dropped_missing_polygon + self.dropped_missing_metric
    }
}

pub struct Normalizer<'a> {
    kind: DatasetKind,
    rows: Enumerate<Iter<'a, RawRow>>,
    report: TransformReport,
    failed: bool,
}

impl<'a> Normalizer<'a> {
    pub fn new(kind: DatasetKind, dataset: &'a Dataset) -> Self {
        Self {
            kind,
            rows: dataset.rows().iter().enumerate(),
            report: TransformReport::default(),
            failed: false,
        }
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    pub fn report(&self) -> &TransformReport {
        &self.report
    }

    pub fn into_report(self) -> TransformReport {
        self.report
    }

    fn normalize(&mut self, index: usize, row: &RawRow) -> Result<Option<NormalizedRow>> {
        self.report.rows_read += 1;

        let date = parse_date(self.kind.date_column(), index, row)?;
        let partition = PartitionKey::from_date(date);
        match self.report.partition {
            None => self.report.partition = Some(partition),
            Some(expected) if expected != partition => {
                return Err(TransformError::MixedPartitions {
                    row: index,
                    expected,
                    found: partition,
                });
            }
            Some(_) => {}
        }

        let Some(polygon) = row.text(POLYGON_COLUMN) else {
            self.report.dropped_missing_polygon += 1;
            return Ok(None);
        };

        let Some(fields) = normalize_fields(self.kind, row) else {
            self.report.dropped_missing_metric += 1;
            return Ok(None);
        };

        Ok(Some(NormalizedRow {
            index,
            date,
            polygon,
            fields,
        }))
    }
}

impl Iterator for Normalizer<'_> {
    type Item = Result<NormalizedRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        while let Some((index, row)) = self.rows.next() {
            match self.normalize(index, row) {
                Ok(Some(normalized)) => return Some(Ok(normalized)),
                Ok(None) => continue,
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
        None
    }
}

fn parse_date(column: &'static str, row_index: usize, row: &RawRow) -> Result<NaiveDate> {
    match row.get(column) {
        cell if cell.is_null() => Err(TransformError::MissingDate {
            row: row_index,
            column,
        }),
        Scalar::Text(value) => NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(
            |_| TransformError::InvalidDate {
                row: row_index,
                column,
                value: value.clone(),
            },
        ),
        other => Err(TransformError::InvalidDate {
            row: row_index,
            column,
            value: other.to_string(),
        }),
    }
}

/// Applies the dataset's null policy. `None` drops the row.
fn normalize_fields(kind: DatasetKind, row: &RawRow) -> Option<Fields> {
    let fields = match kind {
        DatasetKind::AgeMonthly => Fields::Columns(vec![
            text_or_null(row, "AGE_GROUP"),
            value(row, "USER_REACH"),
        ]),
        DatasetKind::ReachMonthly => Fields::Columns(
            REACH_MONTHLY_COLUMNS
                .iter()
                .map(|column| value(row, column))
                .collect(),
        ),
        DatasetKind::DeviceMonthly => Fields::Columns(vec![
            text_or(row, "DEVICE_BRAND", "NULL"),
            value(row, "USER_REACH"),
        ]),
        DatasetKind::HomeReachMonthly => Fields::Columns(vec![
            SqlValue::text("HOME"),
            number_or_zero(row, "USER_REACH"),
            text_or(row, "HOME_STATE", ""),
        ]),
        DatasetKind::WorkReachMonthly => Fields::Columns(vec![
            SqlValue::text("WORK"),
            number_or_zero(row, "USER_REACH"),
            text_or(row, "WORK_STATE", ""),
        ]),
        DatasetKind::ReachHourly => Fields::Columns(vec![
            text_or(row, "DAY", ""),
            number_or_zero(row, "HOUR"),
            number_or_zero(row, "IMPRESSIONS"),
            number_or_zero(row, "USER_REACH"),
            number_or_zero(row, "DAILY_AVERAGE_IMPRESSIONS"),
            number_or_zero(row, "DAILY_AVERAGE_USER_REACH"),
        ]),
        DatasetKind::ReachDays => Fields::Columns(vec![
            text_or(row, "DAY", ""),
            number_or_zero(row, "IMPRESSIONS"),
            number_or_zero(row, "USER_REACH"),
        ]),
        DatasetKind::GenderMonthly => {
            let slot = match category(row, "GENDER", "OTHER").as_str() {
                "MALE" => 0,
                "FEMALE" => 1,
                _ => 2,
            };
            Fields::Slot {
                slot,
                measure: number_or_zero(row, "USER_REACH"),
            }
        }
        DatasetKind::NationalityMonthly => {
            let slot = match category(row, "NATIONALITY", "OTHER").as_str() {
                "MALAYSIAN" => 0,
                "NON-MALAYSIAN" => 1,
                _ => 2,
            };
            Fields::Slot {
                slot,
                measure: number_or_zero(row, "USER_REACH"),
            }
        }
        DatasetKind::MobilityTypeMonthly => {
            let slot = match category(row, "MOBILITY_TYPE", "PASSERBY").as_str() {
                "HOME" => 0,
                "WORK" => 1,
                _ => 2,
            };
            Fields::Slot {
                slot,
                measure: number_or_zero(row, "USER_REACH"),
            }
        }
        DatasetKind::WorkAvgDistanceMonthly => required_metric(row, "AVG_WORK_DISTANCE")?,
        DatasetKind::HomeAvgDistanceMonthly => required_metric(row, "AVG_HOME_DISTANCE")?,
    };
    Some(fields)
}

fn value(row: &RawRow, column: &str) -> SqlValue {
    SqlValue::from(row.get(column))
}

fn number_or_zero(row: &RawRow, column: &str) -> SqlValue {
    match value(row, column) {
        SqlValue::Null => SqlValue::Int(0),
        other => other,
    }
}

fn text_or(row: &RawRow, column: &str, default: &str) -> SqlValue {
    SqlValue::Text(category(row, column, default))
}

fn text_or_null(row: &RawRow, column: &str) -> SqlValue {
    row.text(column).map(SqlValue::Text).unwrap_or(SqlValue::Null)
}

fn category(row: &RawRow, column: &str, default: &str) -> String {
    row.text(column).unwrap_or_else(|| default.to_string())
}

fn required_metric(row: &RawRow, column: &str) -> Option<Fields> {
    match value(row, column) {
        SqlValue::Null => None,
        measure => Some(Fields::Slot { slot: 0, measure }),
    }
}
