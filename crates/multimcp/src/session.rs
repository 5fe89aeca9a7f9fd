//! The seam between the orchestration engine and individual backends.
//!
//! A [`Session`] is one open connection to one backend server; a
//! [`Connector`] knows how to turn a [`BackendDescriptor`] into a session.
//! The engine never looks behind either trait: wire framing, process
//! spawning and request correlation belong to the implementor.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use multimcp_types::{
    LogLevel, Prompt, PromptResult, Resource, ResourceResult, ResourceTemplate, Tool, ToolResult,
};
use serde_json::Value;
use thiserror::Error;

use crate::config::BackendDescriptor;

/// Arguments passed to a tool call.
pub type ToolArguments = HashMap<String, Value>;

/// Arguments passed to a prompt.
pub type PromptArguments = HashMap<String, String>;

/// Result type for session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// JSON-RPC code for an unknown method.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// JSON-RPC code for invalid parameters.
pub const INVALID_PARAMS: i64 = -32602;

/// Errors reported by a backend session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    /// The server answered with a protocol error
    #[error("Remote error {code}: {message}")]
    Remote {
        /// JSON-RPC error code
        code: i64,
        /// Error message from the server
        message: String,
    },

    /// The server does not implement the requested capability
    #[error("Operation not supported: {0}")]
    Unsupported(String),

    /// The session has been closed
    #[error("Session closed")]
    Closed,

    /// The underlying transport failed
    #[error("Transport error: {0}")]
    Transport(String),
}

impl SessionError {
    /// Create a remote error
    pub fn remote(code: i64, message: impl Into<String>) -> Self {
        Self::Remote {
            code,
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Check whether the server simply lacks the capability.
    ///
    /// Both an explicit [`SessionError::Unsupported`] and a remote
    /// "method not found" count.
    pub fn is_unsupported(&self) -> bool {
        match self {
            Self::Unsupported(_) => true,
            Self::Remote { code, .. } => *code == METHOD_NOT_FOUND,
            _ => false,
        }
    }
}

/// An open session with one backend server.
///
/// Implementations must be safe to call concurrently: the engine issues the
/// four listing calls of one backend at the same time, and dispatches may
/// overlap with each other and with `close`.
#[async_trait]
pub trait Session: Send + Sync {
    /// List the tools the server provides.
    async fn list_tools(&self) -> SessionResult<Vec<Tool>>;

    /// List the resources the server provides.
    async fn list_resources(&self) -> SessionResult<Vec<Resource>>;

    /// List the resource templates the server provides.
    async fn list_resource_templates(&self) -> SessionResult<Vec<ResourceTemplate>>;

    /// List the prompts the server provides.
    async fn list_prompts(&self) -> SessionResult<Vec<Prompt>>;

    /// Invoke a tool.
    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<ToolArguments>,
    ) -> SessionResult<ToolResult>;

    /// Read a resource by its un-namespaced URI.
    async fn read_resource(&self, uri: &str) -> SessionResult<ResourceResult>;

    /// Render a prompt.
    async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<PromptArguments>,
    ) -> SessionResult<PromptResult>;

    /// Ask the server to change the severity of the log messages it sends.
    async fn set_logging_level(&self, level: LogLevel) -> SessionResult<()> {
        let _ = level;
        Err(SessionError::Unsupported("logging/setLevel".into()))
    }

    /// Close the session. Further calls should fail with [`SessionError::Closed`].
    async fn close(&self) -> SessionResult<()>;
}

/// Establishes sessions with backend servers.
///
/// This is the "start a server, obtain a session handle" step. Connectors for
/// real transports spawn `command`/`args` or dial `url`; the in-process
/// [`crate::memory::MemoryConnector`] looks servers up by name.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a session with the backend described by `descriptor`.
    async fn connect(&self, descriptor: &BackendDescriptor) -> SessionResult<Arc<dyn Session>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_detection() {
        assert!(SessionError::Unsupported("prompts/list".into()).is_unsupported());
        assert!(SessionError::remote(METHOD_NOT_FOUND, "Method not found").is_unsupported());
        assert!(!SessionError::remote(INVALID_PARAMS, "bad").is_unsupported());
        assert!(!SessionError::Closed.is_unsupported());
        assert!(!SessionError::transport("broken pipe").is_unsupported());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            SessionError::remote(-32002, "Resource not found").to_string(),
            "Remote error -32002: Resource not found"
        );
        assert_eq!(SessionError::Closed.to_string(), "Session closed");
    }
}
