use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("file contents were not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("file did not contain a header row")]
    MissingHeader,

    #[error("header column {index} invalid: {message}")]
    InvalidHeader { index: usize, message: String },

    #[error("CSV error on line {line}: {source}")]
    Csv {
        line: usize,
        #[source]
        source: csv::Error,
    },
}
