//! Error taxonomy for layout building, provider calls, and reconciliation.

use thiserror::Error;


#[derive(Debug, Error)]
pub enum MuxError {
    /// Invalid or missing layout document, unknown provider, or an executable
    /// that is not the tool the provider expects.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The tool ran and exited non-zero for a reason other than a duplicate
    /// session.
    #[error("\"{command}\" exited with status {status}: {stderr}")]
    ToolExecution {
        command: String,
        status: i32,
        stderr: String,
    },

    /// Session creation was refused because the session already exists.
    #[error("duplicate session '{session}': {stderr}")]
    DuplicateSession { session: String, stderr: String },

    #[error("{operation} is not supported by the {provider} provider")]
    NotSupported {
        provider: &'static str,
        operation: &'static str,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}


impl MuxError {
    pub fn config(message: impl Into<String>) -> Self {
        MuxError::Configuration(message.into())
    }

    pub fn not_supported(provider: &'static str, operation: &'static str) -> Self {
        MuxError::NotSupported { provider, operation }
    }

    /// True for the failure that drives the conflict prompt.
    pub fn is_duplicate_session(&self) -> bool {
        matches!(self, MuxError::DuplicateSession { .. })
    }
}


pub type Result<T> = std::result::Result<T, MuxError>;
