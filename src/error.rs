//! Error types for Query-Forge
//!
//! This module defines the error types used throughout the application.

use thiserror::Error;

/// Result type alias for Query-Forge
pub type Result<T> = std::result::Result<T, QueryForgeError>;

/// Main error type for Query-Forge
#[derive(Error, Debug)]
pub enum QueryForgeError {
    /// The backend could not be reached (or is not configured)
    #[error("Connectivity error ({backend}): {message}")]
    Connectivity { backend: String, message: String },

    /// Unrecognized `db_type` in a request
    #[error("Unsupported DB type: {0}")]
    UnsupportedBackend(String),

    /// The model call failed or its reply could not be turned into a query
    #[error(
        "Translation error: {message}{}",
        .raw.as_deref().map(|raw| format!("\nLLM output: {raw}")).unwrap_or_default()
    )]
    Translation { message: String, raw: Option<String> },

    /// The backend rejected the generated query
    #[error("Execution error: {0}")]
    Execution(String),

    /// Result cache errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM API returned a non-success response
    #[error("{provider} API error (status {status}): {message}")]
    LLMApiError {
        provider: String,
        message: String,
        status: u16,
    },

    /// No API key configured for the provider
    #[error("No API key configured for {0}")]
    LLMApiKeyMissing(String),

    /// HTTP-related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QueryForgeError {
    /// Build a connectivity error for the named backend
    pub fn connectivity(backend: impl Into<String>, message: impl ToString) -> Self {
        Self::Connectivity {
            backend: backend.into(),
            message: message.to_string(),
        }
    }

    /// Build a translation error, keeping the raw model output for diagnostics
    pub fn translation(message: impl Into<String>, raw: Option<&str>) -> Self {
        Self::Translation {
            message: message.into(),
            raw: raw.map(str::to_string),
        }
    }

    /// Whether the failure is the caller's fault (surfaced as HTTP 400)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::UnsupportedBackend(_))
    }
}

impl From<redis::RedisError> for QueryForgeError {
    fn from(err: redis::RedisError) -> Self {
        Self::Cache(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_error_includes_raw_output() {
        let err = QueryForgeError::translation("Error parsing MongoDB query", Some("db.users.find()"));
        assert_eq!(
            err.to_string(),
            "Translation error: Error parsing MongoDB query\nLLM output: db.users.find()"
        );

        let err = QueryForgeError::translation("model call failed", None);
        assert_eq!(err.to_string(), "Translation error: model call failed");
    }

    #[test]
    fn test_only_unsupported_backend_is_client_error() {
        assert!(QueryForgeError::UnsupportedBackend("oracle".into()).is_client_error());
        assert!(!QueryForgeError::Execution("bad query".into()).is_client_error());
        assert!(!QueryForgeError::connectivity("MySQL", "refused").is_client_error());
    }
}
