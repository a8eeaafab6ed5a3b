use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cell of a source CSV, typed the way a dataframe reader would type it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

static NULL: Scalar = Scalar::Null;

impl Scalar {
    pub fn is_null(&self) -> bool {
        match self {
            Scalar::Null => true,
            Scalar::Float(value) => value.is_nan(),
            _ => false,
        }
    }

    /// Textual form of a non-null cell built in memory. Cells read from a
    /// file should go through [`RawRow::text`], which keeps the source spelling.
    pub fn to_text(&self) -> Option<String> {
        if self.is_null() {
            None
        } else {
            Some(self.to_string())
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(value) => write!(f, "{value}"),
            Scalar::Int(value) => write!(f, "{value}"),
            Scalar::Float(value) => write!(f, "{value}"),
            Scalar::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        if value.is_nan() {
            Scalar::Null
        } else {
            Scalar::Float(value)
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Scalar::Null)
    }
}

/// A typed cell plus the text it was read from, if it came from a file.
#[derive(Debug, Clone, PartialEq)]
struct Cell {
    value: Scalar,
    raw: Option<String>,
}

/// One source record: column name to cell, in column order. Columns absent
/// from the row read as null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    cells: Vec<(String, Cell)>,
    index: HashMap<String, usize>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Scalar>) {
        self.put(column.into(), value.into(), None);
    }

    /// Inserts a cell read from a file, keeping its source text for keys and labels.
    pub fn insert_raw(&mut self, column: impl Into<String>, raw: &str, value: Scalar) {
        self.put(column.into(), value, Some(raw.trim().to_string()));
    }

    fn put(&mut self, column: String, value: Scalar, raw: Option<String>) {
        let cell = Cell { value, raw };
        match self.index.get(&column) {
            Some(&position) => self.cells[position].1 = cell,
            None => {
                self.index.insert(column.clone(), self.cells.len());
                self.cells.push((column, cell));
            }
        }
    }

    fn cell(&self, column: &str) -> Option<&Cell> {
        self.index.get(column).map(|&position| &self.cells[position].1)
    }

    pub fn get(&self, column: &str) -> &Scalar {
        self.cell(column).map_or(&NULL, |cell| &cell.value)
    }

    /// The cell as written in the source, for identifiers and category labels.
    ///
    /// A key such as `88651e3` or `007` comes back exactly as it appeared,
    /// even though [`RawRow::get`] types it as a number. Null cells yield `None`.
    pub fn text(&self, column: &str) -> Option<String> {
        let cell = self.cell(column)?;
        if cell.value.is_null() {
            return None;
        }
        match &cell.raw {
            Some(raw) => Some(raw.clone()),
            None => cell.value.to_text(),
        }
    }

    pub fn is_null(&self, column: &str) -> bool {
        self.get(column).is_null()
    }

    /// Column names in the order they were inserted.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(column, _)| column.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RawRow
where
    K: Into<String>,
    V: Into<Scalar>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = RawRow::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
    /// blake3 hex digest of the source bytes; empty for datasets built in memory.
    pub content_hash: String,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self {
            columns,
            rows,
            content_hash: String::new(),
        }
    }

    /// Builds a dataset from rows alone, collecting column names in first-seen order.
    pub fn from_rows(rows: Vec<RawRow>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for name in row.columns() {
                if !columns.iter().any(|seen| seen == name) {
                    columns.push(name.to_string());
                }
            }
        }
        Self::new(columns, rows)
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
