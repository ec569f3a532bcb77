//! Error types for Almar

use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("SRU service returned a diagnostic: {0}")]
    SruDiagnostic(String),

    #[error("Search would require retrieving {0} records, more than the service allows")]
    TooManyResults(usize),

    #[error("Response does not contain the requested record: {requested} != {returned}")]
    RecordMismatch { requested: String, returned: String },

    #[error("Failed to save record. Status: {status}. Response: {body}")]
    Persist { status: u16, body: String },

    #[error("Authority lookup failed: {0}")]
    Authority(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Email error: {0}")]
    Email(String),
}

impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<quick_xml::Error> for AppError {
    fn from(e: quick_xml::Error) -> Self {
        AppError::Xml(e.to_string())
    }
}

impl AppError {
    /// Errors that stop the job before any network access
    pub fn is_usage(&self) -> bool {
        matches!(self, AppError::Usage(_) | AppError::Config(_))
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persist_message_carries_status_and_body() {
        let err = AppError::Persist {
            status: 400,
            body: "Invalid MARC".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to save record. Status: 400. Response: Invalid MARC"
        );
    }

    #[test]
    fn test_usage_classification() {
        assert!(AppError::Usage("no term".into()).is_usage());
        assert!(AppError::Config("no env".into()).is_usage());
        assert!(!AppError::TooManyResults(20_000).is_usage());
    }
}
