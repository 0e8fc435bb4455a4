//! Error types for the Quarry domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

/// Failures talking to the reasoning service.
///
/// Every variant is a communication error: it ends the current run and is
/// never retried. The display strings lead with the error class so the
/// terminal message tells the user what kind of failure happened.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("HTTP Error: {status_code} - {message}")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Connection Error: {0}")]
    Connection(String),

    #[error("Timeout Error: {0}")]
    Timeout(String),

    #[error("JSON Decode Error: {0}")]
    MalformedResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool already registered: {0}")]
    DuplicateName(String),

    #[error("Tool '{tool_name}' argument validation failed: {reason}")]
    InvalidArguments { tool_name: String, reason: String },

    #[error("Tool '{tool_name}' failed: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),

    #[error("Failed to read dataset {path}: {reason}")]
    DatasetUnreadable { path: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_error_leads_with_class() {
        let err = ProviderError::Connection("refused".into());
        assert_eq!(err.to_string(), "Connection Error: refused");
    }

    #[test]
    fn api_error_displays_status_and_body() {
        let err = ProviderError::ApiError {
            status_code: 502,
            message: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "HTTP Error: 502 - bad gateway");
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = ToolError::InvalidArguments {
            tool_name: "sql_query".into(),
            reason: "missing required field 'query'".into(),
        };
        assert!(err.to_string().contains("sql_query"));
        assert!(err.to_string().contains("query"));
    }
}
