use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::datasets::{Aggregation, DatasetKind};
use crate::error::Result;
use crate::normalize::{Fields, NormalizedRow};
use crate::statement::SqlValue;

/// One row of a destination table: `date, polygon`, then the dataset's value columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DestinationRecord {
    pub date: NaiveDate,
    pub polygon: String,
    pub values: Vec<SqlValue>,
}

/// Folds rows into per-polygon records, keeping first-appearance order.
struct RecordFold {
    slots: usize,
    latest_date: bool,
    order: Vec<DestinationRecord>,
    index: HashMap<String, usize>,
}

impl RecordFold {
    fn new(slots: usize, latest_date: bool) -> Self {
        Self {
            slots,
            latest_date,
            order: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn ensure_record(&mut self, row: &NormalizedRow) -> &mut DestinationRecord {
        let position = match self.index.get(&row.polygon) {
            Some(position) => *position,
            None => {
                self.order.push(DestinationRecord {
                    date: row.date,
                    polygon: row.polygon.clone(),
                    values: vec![SqlValue::Int(0); self.slots],
                });
                self.index.insert(row.polygon.clone(), self.order.len() - 1);
                self.order.len() - 1
            }
        };
        &mut self.order[position]
    }

    fn push(&mut self, row: NormalizedRow) {
        let latest_date = self.latest_date;
        let record = self.ensure_record(&row);
        if latest_date {
            record.date = row.date;
        }
        match row.fields {
            Fields::Slot { slot, measure } => {
                if let Some(cell) = record.values.get_mut(slot) {
                    *cell = measure;
                }
            }
            Fields::Columns(values) => record.values = values,
        }
    }

    fn finish(self) -> Vec<DestinationRecord> {
        self.order
    }
}

fn pass_through(row: NormalizedRow, slots: usize) -> DestinationRecord {
    let values = match row.fields {
        Fields::Columns(values) => values,
        Fields::Slot { slot, measure } => {
            let mut values = vec![SqlValue::Int(0); slots.max(slot + 1)];
            values[slot] = measure;
            values
        }
    };
    DestinationRecord {
        date: row.date,
        polygon: row.polygon,
        values,
    }
}

/// Turns normalized rows into destination records according to the kind's
/// aggregation class. The first normalization error aborts the whole batch.
pub fn aggregate<I>(kind: DatasetKind, rows: I) -> Result<Vec<DestinationRecord>>
where
    I: IntoIterator<Item = Result<NormalizedRow>>,
{
    match kind.aggregation() {
        Aggregation::PassThrough => {
            let slots = kind.layout().value_columns().len();
            rows.into_iter()
                .map(|row| row.map(|row| pass_through(row, slots)))
                .collect()
        }
        Aggregation::FoldByKey { slots, latest_date } => {
            let mut fold = RecordFold::new(slots, latest_date);
            for row in rows {
                fold.push(row?);
            }
            Ok(fold.finish())
        }
    }
}
