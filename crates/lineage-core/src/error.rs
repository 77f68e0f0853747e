//! Error types for ingestion and corrections.

use thiserror::Error;

/// Result alias for dataset ingestion.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Reasons a single dataset row is rejected.
///
/// A rejected row is skipped and counted; it never aborts the load.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("malformed record: missing dissertation id")]
    MissingDissertationId,

    #[error("malformed record: missing author id")]
    MissingAuthorId,

    #[error("malformed record: missing author name")]
    MissingAuthorName,

    #[error("malformed record: {0}")]
    Unreadable(String),
}

/// Errors that abort loading the dataset as a whole.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("dataset has no header row")]
    MissingHeader,
}

/// Errors raised while recording a correction.
#[derive(Error, Debug)]
pub enum CorrectionError {
    #[error("submitter name is required")]
    MissingSubmitter,

    #[error("an edit must name the record it corrects")]
    MissingRecordId,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
