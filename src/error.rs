use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatementError {
    #[error("Malformed document {path}: {details}")]
    MalformedDocument { path: String, details: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid row tolerance {0}: must be a finite, non-negative number")]
    InvalidTolerance(f64),

    #[error("Invalid fiscal year end month {0}: must be between 1 and 12")]
    InvalidFiscalYearEndMonth(u32),

    #[error("Unknown statement kind: {0}")]
    UnknownStatementKind(String),

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StatementError>;
