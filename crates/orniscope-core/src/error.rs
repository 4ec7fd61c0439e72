//! Error types for the Orniscope engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the engine and its collaborators.
///
/// Collaborator failures (canonical source, filter-value resolver) are
/// surfaced to the caller of the in-flight request. Everything the engine
/// treats as "not an error" (unknown filter types, invalid thresholds,
/// listener delivery failures) never reaches this type.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum EngineError {
    /// The canonical source could not supply the population or type list
    #[error("Canonical source unavailable: {0}")]
    SourceUnavailable(String),

    /// The filter-value resolver failed
    #[error("Filter resolver unavailable: {0}")]
    ResolverUnavailable(String),

    /// An external call did not complete within the configured limit
    #[error("Timed out after {after_ms}ms waiting for {operation}")]
    Timeout {
        operation: &'static str,
        after_ms: u64,
    },

    /// The session worker has shut down and no longer accepts requests
    #[error("Session '{0}' is closed")]
    SessionClosed(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a SourceUnavailable error
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::SourceUnavailable(message.into())
    }

    /// Creates a ResolverUnavailable error
    pub fn resolver_unavailable(message: impl Into<String>) -> Self {
        Self::ResolverUnavailable(message.into())
    }

    /// Creates a SessionClosed error
    pub fn session_closed(session_id: impl Into<String>) -> Self {
        Self::SessionClosed(session_id.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if the session that produced this error is gone
    pub fn is_session_closed(&self) -> bool {
        matches!(self, Self::SessionClosed(_))
    }

    /// Check if this error came from an external collaborator.
    ///
    /// Returns true for source and resolver failures and for timeouts on
    /// calls into them.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable(_) | Self::ResolverUnavailable(_) | Self::Timeout { .. }
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, EngineError>`.
pub type Result<T> = std::result::Result<T, EngineError>;
