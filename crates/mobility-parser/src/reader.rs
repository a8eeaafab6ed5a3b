use std::collections::HashSet;

use blake3::Hasher;
use csv::ReaderBuilder;

use crate::errors::ParserError;
use crate::model::{Dataset, RawRow, Scalar};

/// Cell spellings a dataframe reader treats as missing.
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Parses a headed CSV export into a [`Dataset`], typing each cell independently.
pub fn parse_csv(contents: &[u8]) -> Result<Dataset, ParserError> {
    let text = std::str::from_utf8(contents)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let header = reader
        .headers()
        .map_err(|source| ParserError::Csv { line: 1, source })?
        .clone();
    if header.is_empty() || header.iter().all(|name| name.trim().is_empty()) {
        return Err(ParserError::MissingHeader);
    }

    let mut columns = Vec::with_capacity(header.len());
    let mut seen = HashSet::new();
    for (index, name) in header.iter().enumerate() {
        let name = name.trim();
        if name.is_empty() {
            return Err(ParserError::InvalidHeader {
                index,
                message: "column name is empty".to_string(),
            });
        }
        if !seen.insert(name.to_string()) {
            return Err(ParserError::InvalidHeader {
                index,
                message: format!("duplicate column '{name}'"),
            });
        }
        columns.push(name.to_string());
    }

    let mut rows = Vec::new();
    for (offset, record) in reader.records().enumerate() {
        // header is line 1
        let line = offset + 2;
        let record = record.map_err(|source| ParserError::Csv { line, source })?;
        let mut row = RawRow::new();
        for (column, cell) in columns.iter().zip(record.iter()) {
            row.insert_raw(column.as_str(), cell, infer_scalar(cell));
        }
        rows.push(row);
    }

    Ok(Dataset {
        columns,
        rows,
        content_hash: compute_hash(contents),
    })
}

/// Types one raw cell: missing markers, integers, floats, booleans, then text.
///
/// `07`, `+5` and `-0` are integers here; a row keeps the source spelling
/// alongside for columns that hold identifiers.
pub fn infer_scalar(cell: &str) -> Scalar {
    let trimmed = cell.trim();
    if NA_VALUES.contains(&trimmed) {
        return Scalar::Null;
    }

    if let Ok(value) = trimmed.parse::<i64>() {
        return Scalar::Int(value);
    }

    if looks_numeric(trimmed) {
        if let Ok(value) = trimmed.parse::<f64>() {
            return Scalar::from(value);
        }
    }

    match trimmed {
        "True" | "TRUE" | "true" => Scalar::Bool(true),
        "False" | "FALSE" | "false" => Scalar::Bool(false),
        _ => Scalar::Text(trimmed.to_string()),
    }
}

fn looks_numeric(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_digit())
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
}

fn compute_hash(contents: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(contents);
    hasher.finalize().to_hex().to_string()
}
