pub mod aggregate;
pub mod datasets;
pub mod dispatcher;
pub mod error;
pub mod normalize;
pub mod partition;
pub mod statement;

#[cfg(feature = "runtime")]
pub mod config;
#[cfg(feature = "runtime")]
pub mod db;
#[cfg(feature = "runtime")]
pub mod loader;

pub use datasets::{classify, Aggregation, ConflictAction, DatasetKind, TableLayout};
pub use dispatcher::{Dispatch, Dispatcher};
pub use error::{Result, TransformError};
#[cfg(feature = "runtime")]
pub use error::LoadError;
pub use partition::PartitionKey;
pub use statement::{BoundQuery, RenderedStatement, SqlValue};
