//! # multimcp types
//!
//! The capability data model shared by every layer of the multimcp
//! orchestration stack.
//!
//! - **Definition types**: `Tool`, `Resource`, `ResourceTemplate`, `Prompt`
//! - **Content types**: `Content` blocks, prompt `Message`s and `Role`
//! - **Result types**: `ToolResult`, `ResourceResult`, `PromptResult`
//! - **Logging**: `LogLevel`, the eight protocol severities
//! - **URI templates**: [`template_variables`] and [`expand_template`]
//!
//! Every type serializes with the protocol's camelCase wire names. Items a
//! backend reports carry an opaque `_meta` map ([`Meta`]) that passes through
//! the orchestration layer untouched apart from the keys it injects.
//!
//! ## Quick Start
//!
//! ```rust
//! use multimcp_types::*;
//!
//! let tool = Tool::new("add_item", "Add an item to the inventory")
//!     .with_meta("serverName", "tool_server");
//! assert_eq!(tool.meta_str("serverName"), Some("tool_server"));
//!
//! let result = ToolResult::text("Added widget");
//! assert!(!result.is_error());
//!
//! let prompt = PromptResult::user("Summarize the inventory")
//!     .with_description("Inventory summary");
//! assert_eq!(prompt.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod content;
pub mod definitions;
pub mod logging;
pub mod results;
pub mod template;

pub use content::*;
pub use definitions::*;
pub use logging::*;
pub use results::*;
pub use template::{expand_template, match_template, template_variables};

/// Opaque extension metadata attached to items under the `_meta` key.
pub type Meta = std::collections::HashMap<String, serde_json::Value>;

/// Version of the multimcp types crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP protocol version these types follow
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";
