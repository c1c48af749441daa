use thiserror::Error;

/// Malformed or insufficient data. Never defaulted away, always surfaced to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("Missing numeric field: {field}")]
    MissingField { field: String },

    #[error("Field {field} is not numeric: {value:?}")]
    InvalidNumber { field: String, value: String },

    #[error("Insufficient samples in window: need at least 2, found {found}")]
    InsufficientSamples { found: usize },

    #[error("Window average is zero, volatility is undefined")]
    ZeroAverage,

    #[error("Malformed {collection} record: {reason}")]
    MalformedRecord { collection: String, reason: String },
}
