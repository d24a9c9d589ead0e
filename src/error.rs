use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("student data unavailable at {path}: {reason}")]
    DataUnavailable { path: String, reason: String },

    #[error("No data found for student_id: {0}")]
    NotFound(String),

    #[error("to_date {to} must not precede from_date {from}")]
    InvalidRange { from: String, to: String },

    #[error("Date must be in format YYYY-MM-DD, got {0:?}")]
    InvalidDate(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool not found: {0}")]
    UnknownTool(String),

    #[error("Aggregation error: {0}")]
    Aggregation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AnalyticsError {
    /// Only a missing or unreadable source escapes the public operations;
    /// everything else is folded into a `success=false` payload.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AnalyticsError::DataUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
