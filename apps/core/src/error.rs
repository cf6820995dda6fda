use std::io;
use thiserror::Error;

/// Failures of the external collaborators the enrichment pipeline calls into.
///
/// Each client returns one of these instead of deciding on its own what a
/// failure means; the pipeline applies a single policy on top.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EnrichmentError {
    /// The intent service could not be reached, timed out or answered with an error status.
    #[error("Intent classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    /// The intent service answered, but without a field the pipeline needs.
    #[error("Intent classifier returned a malformed response: {0}")]
    ClassifierMalformedResponse(String),

    /// The sentiment service failed (transport, auth, per-document error or bad payload).
    #[error("Sentiment analyzer unavailable: {0}")]
    SentimentUnavailable(String),

    /// The document store rejected or failed the write.
    #[error("Failed to write record: {0}")]
    WriteFailure(String),
}

impl EnrichmentError {
    /// True for failures coming from the two analysis services (not storage).
    pub fn is_analysis_failure(&self) -> bool {
        !matches!(self, EnrichmentError::WriteFailure(_))
    }
}

/// Application-wide error type, consolidating all possible errors into a single enum.
#[derive(Debug, Error)]
pub enum AppError {
    /// A typed failure from the enrichment pipeline.
    #[error(transparent)]
    Enrichment(#[from] EnrichmentError),

    /// Represents errors originating from the database, typically from `sqlx`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents standard input/output errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Represents errors specific to the actor system, such as communication failures.
    #[error("Actor error: {0}")]
    Actor(String),

    /// Represents data validation errors (e.g., invalid input format).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Represents configuration-related errors (e.g., missing environment variables).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Represents errors from operations that did not complete in time.
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        match self {
            AppError::Enrichment(e) => AppError::Enrichment(e.clone()),
            AppError::Database(e) => AppError::Database(sqlx::Error::Protocol(e.to_string())),
            AppError::Io(e) => AppError::Io(io::Error::new(e.kind(), e.to_string())),
            AppError::Actor(s) => AppError::Actor(s.clone()),
            AppError::Validation(s) => AppError::Validation(s.clone()),
            AppError::Config(s) => AppError::Config(s.clone()),
            AppError::Timeout(s) => AppError::Timeout(s.clone()),
        }
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        AppError::Timeout(format!("Operation timed out: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON error: {}", err))
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::Config(format!("URL parse error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Config(format!("Validation errors: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Io(io::Error::other(format!("HTTP error: {}", err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrichment_error_is_transparent() {
        let err: AppError = EnrichmentError::WriteFailure("conflict".to_string()).into();
        assert_eq!(err.to_string(), "Failed to write record: conflict");
    }

    #[test]
    fn test_analysis_failure_split() {
        assert!(EnrichmentError::ClassifierUnavailable("x".into()).is_analysis_failure());
        assert!(EnrichmentError::SentimentUnavailable("x".into()).is_analysis_failure());
        assert!(!EnrichmentError::WriteFailure("x".into()).is_analysis_failure());
    }

    #[test]
    fn test_clone_keeps_variant() {
        let err = AppError::Config("LUIS_APP_ID".to_string());
        assert!(matches!(err.clone(), AppError::Config(s) if s == "LUIS_APP_ID"));
    }
}
