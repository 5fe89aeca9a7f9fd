//! Prelude module for convenient imports
//!
//! Re-exports the engine types and the capability data model most programs
//! need.
//!
//! ```rust
//! use multimcp::prelude::*;
//!
//! let config = MultiServerConfig::new(vec![BackendDescriptor::new(
//!     "tool_server",
//!     BackendTransport::stdio("python", ["tool_server.py"]),
//! )])
//! .unwrap();
//! assert_eq!(config.len(), 1);
//! ```

pub use crate::{CRATE_NAME, VERSION};

pub use crate::{
    BackendCapabilities, BackendDescriptor, BackendFailure, BackendTransport, BlockingClient,
    CapabilityCatalog, CapabilityKind, CatalogSummary, ClientOptions, Collision, ConnectPolicy,
    Connector, MultiError, MultiResult, MultiServerClient, MultiServerConfig, PromptArguments,
    SERVER_NAME_META, Session, SessionError, SessionResult, ToolArguments,
};

pub use crate::memory::{MemoryConnector, MemoryServer};

pub use multimcp_types::{
    Content, Extensible, LogLevel, Message, Prompt, PromptArgument, PromptResult, Resource,
    ResourceContent, ResourceResult, ResourceTemplate, Role, Tool, ToolInputSchema, ToolResult,
};

pub use std::sync::Arc;
