use thiserror::Error;

use crate::datasets::DatasetKind;
use crate::partition::PartitionKey;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("row {row}: column {column} is missing a date")]
    MissingDate { row: usize, column: &'static str },

    #[error("row {row}: column {column} value '{value}' is not a %Y-%m-%d date")]
    InvalidDate {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("row {row} belongs to partition {found} but the batch started in {expected}")]
    MixedPartitions {
        row: usize,
        expected: PartitionKey,
        found: PartitionKey,
    },

    #[error("{kind} produced no records to render")]
    EmptyRecordSet { kind: DatasetKind },
}

pub type Result<T> = std::result::Result<T, TransformError>;

/// Failures of the database side of a load.
#[cfg(feature = "runtime")]
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Transform(#[from] TransformError),
}
