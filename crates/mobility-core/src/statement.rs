use std::fmt::Write as _;

use chrono::NaiveDate;
use mobility_parser::Scalar;
use serde::Serialize;

use crate::aggregate::DestinationRecord;
use crate::datasets::{ConflictAction, DatasetKind};
use crate::error::{Result, TransformError};
use crate::partition::PartitionKey;

/// Postgres rejects statements carrying more bind parameters than this.
pub const MAX_BIND_PARAMS: usize = 65_535;

const PROVISION_SQL: &str = "SELECT create_schema_and_tables($1)";

/// A value bound to a statement placeholder. `Null` is written inline as `NULL`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

impl SqlValue {
    pub fn text(value: impl Into<String>) -> Self {
        SqlValue::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<&Scalar> for SqlValue {
    fn from(value: &Scalar) -> Self {
        match value {
            Scalar::Null => SqlValue::Null,
            Scalar::Bool(v) => SqlValue::Bool(*v),
            Scalar::Int(v) => SqlValue::Int(*v),
            Scalar::Float(v) if v.is_nan() => SqlValue::Null,
            Scalar::Float(v) => SqlValue::Float(*v),
            Scalar::Text(v) => SqlValue::Text(v.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Everything one invocation asks the executor to run, in order, inside a
/// single transaction: the partition provisioning call, then the upserts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedStatement {
    pub kind: DatasetKind,
    pub partition: PartitionKey,
    pub provision: BoundQuery,
    pub upserts: Vec<BoundQuery>,
    pub records: usize,
}

impl RenderedStatement {
    /// The combined statement text with placeholders, for logs and dry runs.
    pub fn sql(&self) -> String {
        let mut sql = format!("{};\n", self.provision.sql);
        for upsert in &self.upserts {
            sql.push_str(&upsert.sql);
            sql.push_str(";\n");
        }
        sql
    }

    pub fn param_count(&self) -> usize {
        self.provision.params.len() + self.upserts.iter().map(|u| u.params.len()).sum::<usize>()
    }
}

pub fn render(
    kind: DatasetKind,
    partition: PartitionKey,
    records: &[DestinationRecord],
) -> Result<RenderedStatement> {
    render_with_limit(kind, partition, records, MAX_BIND_PARAMS)
}

/// Renders the upsert, splitting it whenever a chunk would exceed `max_params`.
pub fn render_with_limit(
    kind: DatasetKind,
    partition: PartitionKey,
    records: &[DestinationRecord],
    max_params: usize,
) -> Result<RenderedStatement> {
    if records.is_empty() {
        return Err(TransformError::EmptyRecordSet { kind });
    }

    let layout = kind.layout();
    let header = format!(
        "INSERT INTO {}.{} ({})\nVALUES ",
        partition.quoted_schema(),
        layout.table,
        layout.columns.join(", ")
    );
    let conflict = conflict_clause(kind);

    let mut upserts = Vec::new();
    let mut tuples: Vec<String> = Vec::new();
    let mut params: Vec<SqlValue> = Vec::new();

    for record in records {
        let row = record_params(record);
        let needed = row.iter().filter(|value| !value.is_null()).count();
        if !tuples.is_empty() && params.len() + needed > max_params {
            upserts.push(finish_upsert(&header, &tuples, &conflict, params));
            tuples = Vec::new();
            params = Vec::new();
        }

        let mut tuple = String::from("(");
        for (idx, value) in row.into_iter().enumerate() {
            if idx > 0 {
                tuple.push_str(", ");
            }
            if value.is_null() {
                tuple.push_str("NULL");
            } else {
                params.push(value);
                let _ = write!(tuple, "${}", params.len());
            }
        }
        tuple.push(')');
        tuples.push(tuple);
    }
    upserts.push(finish_upsert(&header, &tuples, &conflict, params));

    Ok(RenderedStatement {
        kind,
        partition,
        provision: BoundQuery {
            sql: PROVISION_SQL.to_string(),
            params: vec![SqlValue::Text(partition.to_string())],
        },
        upserts,
        records: records.len(),
    })
}

fn record_params(record: &DestinationRecord) -> Vec<SqlValue> {
    let mut row = Vec::with_capacity(record.values.len() + 2);
    row.push(SqlValue::Date(record.date));
    row.push(SqlValue::Text(record.polygon.clone()));
    row.extend(record.values.iter().cloned());
    row
}

fn finish_upsert(
    header: &str,
    tuples: &[String],
    conflict: &str,
    params: Vec<SqlValue>,
) -> BoundQuery {
    BoundQuery {
        sql: format!("{header}{}\n{conflict}", tuples.join(",\n")),
        params,
    }
}

fn conflict_clause(kind: DatasetKind) -> String {
    let layout = kind.layout();
    let target = format!("ON CONFLICT ({})", layout.conflict_columns.join(", "));
    match layout.action {
        ConflictAction::DoNothing => format!("{target} DO NOTHING"),
        ConflictAction::DoUpdate => {
            let assignments: Vec<String> = layout
                .update_columns()
                .iter()
                .map(|column| format!("    {column} = EXCLUDED.{column}"))
                .collect();
            format!("{target} DO UPDATE SET\n{}", assignments.join(",\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partition() -> PartitionKey {
        PartitionKey::from_date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    fn record(polygon: &str, values: Vec<SqlValue>) -> DestinationRecord {
        DestinationRecord {
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            polygon: polygon.to_string(),
            values,
        }
    }

    #[test]
    fn empty_record_set_is_an_error() {
        let err = render(DatasetKind::AgeMonthly, partition(), &[]).unwrap_err();
        assert!(matches!(
            err,
            TransformError::EmptyRecordSet {
                kind: DatasetKind::AgeMonthly
            }
        ));
    }

    #[test]
    fn renders_do_nothing_insert() {
        let records = [record(
            "P1",
            vec![SqlValue::text("18-24"), SqlValue::Int(11)],
        )];
        let statement = render(DatasetKind::AgeMonthly, partition(), &records).unwrap();

        assert_eq!(statement.provision.sql, "SELECT create_schema_and_tables($1)");
        assert_eq!(statement.provision.params, vec![SqlValue::text("2024_06")]);
        assert_eq!(statement.upserts.len(), 1);
        assert_eq!(
            statement.upserts[0].sql,
            "INSERT INTO \"2024_06\".age_wise_user_reaches (date, polygon, age_group, user_reach)\n\
             VALUES ($1, $2, $3, $4)\n\
             ON CONFLICT (polygon, age_group) DO NOTHING"
        );
        assert_eq!(
            statement.upserts[0].params,
            vec![
                SqlValue::Date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()),
                SqlValue::text("P1"),
                SqlValue::text("18-24"),
                SqlValue::Int(11),
            ]
        );
    }

    #[test]
    fn renders_do_update_assignments() {
        let records = [record("P1", vec![SqlValue::Float(12.5)])];
        let statement =
            render(DatasetKind::WorkAvgDistanceMonthly, partition(), &records).unwrap();

        assert!(statement.upserts[0].sql.ends_with(
            "ON CONFLICT (polygon) DO UPDATE SET\n    avg_work_distance = EXCLUDED.avg_work_distance"
        ));
    }

    #[test]
    fn nulls_are_inline_and_unbound() {
        let records = [
            record("P1", vec![SqlValue::text("NULL"), SqlValue::Null]),
            record("P2", vec![SqlValue::text("Apple"), SqlValue::Int(3)]),
        ];
        let statement = render(DatasetKind::DeviceMonthly, partition(), &records).unwrap();

        assert!(statement.upserts[0]
            .sql
            .contains("VALUES ($1, $2, $3, NULL),\n($4, $5, $6, $7)"));
        assert_eq!(statement.upserts[0].params.len(), 7);
        assert_eq!(statement.param_count(), 8);
    }

    #[test]
    fn hostile_text_stays_in_params() {
        let hostile = "x'); DROP TABLE device_types; --";
        let records = [record("P1", vec![SqlValue::text(hostile), SqlValue::Int(1)])];
        let statement = render(DatasetKind::DeviceMonthly, partition(), &records).unwrap();

        assert!(!statement.sql().contains("DROP TABLE"));
        assert_eq!(statement.upserts[0].params[2], SqlValue::text(hostile));
    }

    #[test]
    fn splits_when_parameter_limit_reached() {
        let records: Vec<_> = (0..5)
            .map(|i| record(&format!("P{i}"), vec![SqlValue::text("A"), SqlValue::Int(i)]))
            .collect();
        let statement =
            render_with_limit(DatasetKind::AgeMonthly, partition(), &records, 8).unwrap();

        assert_eq!(statement.upserts.len(), 3);
        for upsert in &statement.upserts {
            assert!(upsert.params.len() <= 8);
            assert!(upsert.sql.starts_with("INSERT INTO \"2024_06\".age_wise_user_reaches"));
            assert!(upsert.sql.ends_with("ON CONFLICT (polygon, age_group) DO NOTHING"));
        }
        assert!(statement.upserts[1].sql.contains("VALUES ($1, $2, $3, $4)"));
        assert_eq!(statement.records, 5);
    }

    #[test]
    fn combined_sql_has_provision_first() {
        let records = [record("P1", vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(3)])];
        let statement = render(DatasetKind::GenderMonthly, partition(), &records).unwrap();
        let sql = statement.sql();

        assert!(sql.starts_with(
            "SELECT create_schema_and_tables($1);\nINSERT INTO \"2024_06\".gender_nationality_user_reaches"
        ));
        assert!(sql
            .trim_end()
            .ends_with("gender_other_reaches = EXCLUDED.gender_other_reaches;"));
    }
}
