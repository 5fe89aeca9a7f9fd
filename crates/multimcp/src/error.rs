//! Error types for multimcp
//!
//! One enum covers every failure the orchestration layer can report:
//! - Lifecycle: connection and configuration failures
//! - Routing: unknown names, unknown or unavailable backends, bad identifiers
//! - Pass-through: a backend reported an error while serving a call
//!
//! Tool dispatch turns routing failures into error-flagged results through
//! [`MultiError::to_tool_result`]; resource and prompt dispatch return them.
//! A failed listing call is not an error here: it is recorded as a
//! [`crate::catalog::ListingFailure`] in the catalog summary.

use multimcp_types::ToolResult;
use thiserror::Error;

use crate::catalog::CapabilityKind;
use crate::session::SessionError;

/// Result type for multimcp operations
pub type MultiResult<T> = std::result::Result<T, MultiError>;

/// Main error type for multimcp
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MultiError {
    /// A backend could not be connected (or the connect policy was not met)
    #[error("Connection to backend '{backend}' failed: {message}")]
    ConnectionFailed {
        /// Backend name, or a summary when several backends failed
        backend: String,
        /// Failure cause
        message: String,
    },

    /// No connected backend provides this tool or prompt
    #[error("Unknown {kind}: {name}")]
    NotFound {
        /// Tool or prompt
        kind: CapabilityKind,
        /// Requested name
        name: String,
    },

    /// The named backend is not part of the configuration
    #[error("Unknown backend '{backend}'")]
    UnknownBackend {
        /// Requested backend name
        backend: String,
    },

    /// The named backend advertises nothing of this kind
    #[error("Backend '{backend}' has no {kind}s")]
    CapabilityMissing {
        /// Backend name
        backend: String,
        /// Missing capability kind
        kind: CapabilityKind,
    },

    /// The named backend does not list the requested item
    #[error("{kind} '{name}' not found in backend '{backend}'")]
    NotInBackend {
        /// Backend name
        backend: String,
        /// Tool or prompt
        kind: CapabilityKind,
        /// Requested name
        name: String,
    },

    /// A namespaced resource identifier could not be decoded
    #[error("Malformed resource identifier '{identifier}': {reason}")]
    MalformedIdentifier {
        /// The identifier as given
        identifier: String,
        /// What is wrong with it
        reason: String,
    },

    /// A bare resource URI was given where a `backend:uri` identifier is required
    #[error("Resource URI '{uri}' has no backend namespace; use 'backend:{uri}' or name the backend explicitly")]
    MissingNamespace {
        /// The bare URI
        uri: String,
    },

    /// The routed backend is no longer connected
    #[error("Backend '{backend}' is unavailable")]
    BackendUnavailable {
        /// Backend name
        backend: String,
    },

    /// The backend reported an error while serving the call
    #[error("Backend '{backend}' failed during {operation}: {source}")]
    Backend {
        /// Backend name
        backend: String,
        /// Operation being forwarded, e.g. `tools/call`
        operation: &'static str,
        /// Error reported by the session
        source: SessionError,
    },

    /// Operation exceeded its deadline
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// What timed out
        operation: String,
        /// Deadline in milliseconds
        timeout_ms: u64,
    },

    /// Invalid configuration or misuse of the client
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the problem
        message: String,
        /// Offending key, if any
        key: Option<String>,
    },

    /// The client has been shut down or never connected
    #[error("Client not connected")]
    NotConnected,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MultiError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            key: None,
        }
    }

    /// Create a configuration error with key context
    pub fn configuration_with_key(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Create a malformed identifier error
    pub fn malformed(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedIdentifier {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an error reported by a backend session.
    ///
    /// A closed session means the backend went away underneath us, which is
    /// reported as [`MultiError::BackendUnavailable`] rather than passed through.
    pub fn from_session(
        backend: impl Into<String>,
        operation: &'static str,
        source: SessionError,
    ) -> Self {
        let backend = backend.into();
        match source {
            SessionError::Closed => Self::BackendUnavailable { backend },
            source => Self::Backend {
                backend,
                operation,
                source,
            },
        }
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionFailed { .. } => "connection_failed",
            Self::NotFound { .. } => "not_found",
            Self::UnknownBackend { .. } => "unknown_backend",
            Self::CapabilityMissing { .. } => "capability_missing",
            Self::NotInBackend { .. } => "not_in_backend",
            Self::MalformedIdentifier { .. } => "malformed_identifier",
            Self::MissingNamespace { .. } => "missing_namespace",
            Self::BackendUnavailable { .. } => "backend_unavailable",
            Self::Backend { .. } => "backend",
            Self::Timeout { .. } => "timeout",
            Self::Configuration { .. } => "configuration",
            Self::NotConnected => "not_connected",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
        }
    }

    /// Check if this error comes from name or identifier resolution
    /// rather than from a backend.
    pub fn is_routing_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::UnknownBackend { .. }
                | Self::CapabilityMissing { .. }
                | Self::NotInBackend { .. }
                | Self::MalformedIdentifier { .. }
                | Self::MissingNamespace { .. }
                | Self::BackendUnavailable { .. }
        )
    }

    /// Render this error as an error-flagged tool result.
    ///
    /// The message becomes the single text block and `_meta.errorKind`
    /// carries [`MultiError::kind`].
    pub fn to_tool_result(&self) -> ToolResult {
        ToolResult::error(self.to_string()).with_meta("errorKind", self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = MultiError::NotFound {
            kind: CapabilityKind::Tool,
            name: "restock".into(),
        };
        assert_eq!(err.to_string(), "Unknown tool: restock");
        assert_eq!(err.kind(), "not_found");
        assert!(err.is_routing_error());
    }

    #[test]
    fn test_capability_missing_message() {
        let err = MultiError::CapabilityMissing {
            backend: "resource_server".into(),
            kind: CapabilityKind::Tool,
        };
        assert_eq!(err.to_string(), "Backend 'resource_server' has no tools");
    }

    #[test]
    fn test_not_in_backend_message() {
        let err = MultiError::NotInBackend {
            backend: "tool_server".into(),
            kind: CapabilityKind::Prompt,
            name: "summary".into(),
        };
        assert_eq!(
            err.to_string(),
            "prompt 'summary' not found in backend 'tool_server'"
        );
    }

    #[test]
    fn test_from_session_closed_is_unavailable() {
        let err = MultiError::from_session("a", "tools/call", SessionError::Closed);
        assert!(matches!(err, MultiError::BackendUnavailable { ref backend } if backend == "a"));
    }

    #[test]
    fn test_from_session_passthrough_keeps_source() {
        let err = MultiError::from_session(
            "a",
            "resources/read",
            SessionError::remote(-32002, "Resource not found"),
        );
        assert_eq!(err.kind(), "backend");
        assert!(!err.is_routing_error());
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("Resource not found"));
    }

    #[test]
    fn test_to_tool_result() {
        let result = MultiError::UnknownBackend {
            backend: "ghost".into(),
        }
        .to_tool_result();

        assert!(result.is_error());
        assert_eq!(result.first_text(), Some("Unknown backend 'ghost'"));
        assert_eq!(
            result.meta.as_ref().unwrap()["errorKind"],
            serde_json::json!("unknown_backend")
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = MultiError::timeout("tool 'slow'", std::time::Duration::from_secs(2));
        assert_eq!(err.to_string(), "tool 'slow' timed out after 2000ms");
    }
}
