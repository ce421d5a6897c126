use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("network request failed: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("failed to parse source document: {message}")]
    ParseError { message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("could not resolve reference in column '{column}': {message}")]
    ResolutionError { column: String, message: String },

    #[error("malformed reference in column '{column}': {message}")]
    MalformedReferenceError { column: String, message: String },

    #[error("data processing error: {message}")]
    ProcessingError { message: String },

    #[error("invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, EtlError>;
