use mobility_parser::Dataset;
use tracing::{debug, info, warn, Span};

use crate::aggregate::aggregate;
use crate::datasets::{classify, DatasetKind};
use crate::error::Result;
use crate::normalize::{Normalizer, TransformReport};
use crate::statement::{render, RenderedStatement};

/// Outcome of routing one file through its pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// No dataset pattern matched the file name.
    Skipped,
    /// The file matched but every row was dropped.
    NoRecords {
        kind: DatasetKind,
        report: TransformReport,
    },
    Ready {
        kind: DatasetKind,
        report: TransformReport,
        statement: RenderedStatement,
    },
}

impl Dispatch {
    pub fn kind(&self) -> Option<DatasetKind> {
        match self {
            Dispatch::Skipped => None,
            Dispatch::NoRecords { kind, .. } | Dispatch::Ready { kind, .. } => Some(*kind),
        }
    }

    pub fn report(&self) -> Option<&TransformReport> {
        match self {
            Dispatch::Skipped => None,
            Dispatch::NoRecords { report, .. } | Dispatch::Ready { report, .. } => Some(report),
        }
    }

    pub fn statement(&self) -> Option<&RenderedStatement> {
        match self {
            Dispatch::Ready { statement, .. } => Some(statement),
            _ => None,
        }
    }

    pub fn into_statement(self) -> Option<RenderedStatement> {
        match self {
            Dispatch::Ready { statement, .. } => Some(statement),
            _ => None,
        }
    }
}

/// Single entry point for turning a named dataset into an upsert.
///
/// Holds no state besides the span its log events are attached to, so one
/// dispatcher can be shared by any number of callers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    span: Span,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Span::current())
    }
}

impl Dispatcher {
    pub fn new(span: Span) -> Self {
        Self { span }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn dispatch(&self, file_name: &str, dataset: &Dataset) -> Result<Dispatch> {
        let span = &self.span;

        let Some(kind) = classify(file_name) else {
            info!(parent: span, file_name, "no pipeline for file; skipping");
            return Ok(Dispatch::Skipped);
        };
        info!(
            parent: span,
            file_name,
            pipeline = kind.pipeline_name(),
            rows = dataset.len(),
            "processing file"
        );

        self.run(kind, dataset)
    }

    /// Runs one kind's pipeline directly, bypassing file name classification.
    pub fn run(&self, kind: DatasetKind, dataset: &Dataset) -> Result<Dispatch> {
        let span = &self.span;

        let mut normalizer = Normalizer::new(kind, dataset);
        let records = aggregate(kind, normalizer.by_ref())?;
        let mut report = normalizer.into_report();
        report.records = records.len();

        if report.dropped_missing_polygon > 0 {
            warn!(
                parent: span,
                pipeline = kind.pipeline_name(),
                dropped = report.dropped_missing_polygon,
                "dropped rows without a polygon"
            );
        }
        if report.dropped_missing_metric > 0 {
            warn!(
                parent: span,
                pipeline = kind.pipeline_name(),
                dropped = report.dropped_missing_metric,
                "dropped rows without a metric value"
            );
        }

        let Some(partition) = report.partition.filter(|_| !records.is_empty()) else {
            info!(
                parent: span,
                pipeline = kind.pipeline_name(),
                rows_read = report.rows_read,
                "no records survived normalization"
            );
            return Ok(Dispatch::NoRecords { kind, report });
        };

        let statement = render(kind, partition, &records)?;
        info!(
            parent: span,
            pipeline = kind.pipeline_name(),
            partition = %partition,
            records = report.records,
            statements = statement.upserts.len(),
            "rendered upsert"
        );
        debug!(parent: span, sql = %statement.sql(), "statement text");

        Ok(Dispatch::Ready {
            kind,
            report,
            statement,
        })
    }
}
