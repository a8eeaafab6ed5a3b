use mobility_parser::Dataset;
use serde::Serialize;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::Postgres;
use tracing::info;

use crate::datasets::DatasetKind;
use crate::db::DbPool;
use crate::dispatcher::Dispatcher;
use crate::error::LoadError;
use crate::normalize::TransformReport;
use crate::statement::{BoundQuery, RenderedStatement, SqlValue};

#[derive(Debug, Clone, Serialize)]
pub struct LoadReceipt {
    pub file_name: String,
    pub pipeline: Option<DatasetKind>,
    pub report: Option<TransformReport>,
    pub rows_affected: u64,
}

/// Runs a rendered statement in one transaction.
///
/// The transaction rolls back when dropped, so every early return below
/// leaves the partition untouched; it commits only after all parts succeed.
pub async fn execute(pool: &DbPool, statement: &RenderedStatement) -> Result<u64, LoadError> {
    let mut tx = pool.begin().await?;

    bind_params(&statement.provision).execute(&mut *tx).await?;

    let mut rows_affected = 0;
    for upsert in &statement.upserts {
        let result = bind_params(upsert).execute(&mut *tx).await?;
        rows_affected += result.rows_affected();
    }

    tx.commit().await?;

    info!(
        pipeline = statement.kind.pipeline_name(),
        partition = %statement.partition,
        rows_affected,
        "Query executed"
    );
    Ok(rows_affected)
}

/// Dispatches a dataset and, when it yields a statement, executes it.
pub async fn load_dataset(
    pool: &DbPool,
    dispatcher: &Dispatcher,
    file_name: &str,
    dataset: &Dataset,
) -> Result<LoadReceipt, LoadError> {
    let dispatch = dispatcher.dispatch(file_name, dataset)?;

    let rows_affected = match dispatch.statement() {
        Some(statement) => execute(pool, statement).await?,
        None => 0,
    };

    Ok(LoadReceipt {
        file_name: file_name.to_string(),
        pipeline: dispatch.kind(),
        report: dispatch.report().cloned(),
        rows_affected,
    })
}

fn bind_params(query: &BoundQuery) -> Query<'_, Postgres, PgArguments> {
    let mut bound = sqlx::query::<Postgres>(&query.sql);
    for param in &query.params {
        bound = match param {
            SqlValue::Null => bound.bind(None::<String>),
            SqlValue::Bool(value) => bound.bind(*value),
            SqlValue::Int(value) => bound.bind(*value),
            SqlValue::Float(value) => bound.bind(*value),
            SqlValue::Text(value) => bound.bind(value.as_str()),
            SqlValue::Date(value) => bound.bind(*value),
        };
    }
    bound
}
