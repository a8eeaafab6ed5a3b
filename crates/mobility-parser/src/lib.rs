pub mod errors;
pub mod model;
mod reader;

pub use errors::ParserError;
pub use model::{Dataset, RawRow, Scalar};
pub use reader::{infer_scalar, parse_csv};

#[cfg(test)]
mod tests;
