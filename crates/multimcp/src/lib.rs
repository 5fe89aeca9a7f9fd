//! # multimcp
//!
//! Client-side orchestration that presents many independently running MCP
//! servers as one logical endpoint: one merged catalog of tools, resources,
//! resource templates and prompts, and one call surface that forwards each
//! operation to the backend owning it.
//!
//! ## Features
//!
//! - Concurrent connection setup with per-backend timeouts; failures are
//!   logged and reported, never fatal unless the connect policy says so
//! - Deterministic capability aggregation with `_meta.serverName`
//!   annotations and last-writer-wins name collisions
//! - Name routing for tools and prompts, `backend:uri` namespacing for
//!   resources, and backend-qualified calls to bypass either
//! - Error normalisation: tool failures come back as error-flagged results,
//!   resource and prompt failures as [`MultiError`]
//! - Snapshot state swapped atomically, so dispatch never observes a
//!   half-built catalog
//! - A blocking façade ([`blocking::BlockingClient`]) over the same engine
//!
//! ## Architecture
//!
//! ```text
//! MultiServerClient / BlockingClient
//!        ↓
//! Dispatch (client::operations)  ←  RoutingTable + namespace codec
//!        ↓
//! Capability aggregation (catalog)
//!        ↓
//! ConnectionManager (manager)
//!        ↓
//! Session / Connector (session)   ←  wire protocol lives behind this seam
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use multimcp::prelude::*;
//!
//! # async fn example() -> MultiResult<()> {
//! let config = MultiServerConfig::from_json_str(r#"{
//!     "mcpServers": {
//!         "tool_server": {"command": "python", "args": ["tool_server.py"]},
//!         "resource_server": {"command": "python", "args": ["resource_server.py"]}
//!     }
//! }"#)?;
//!
//! let connector = MemoryConnector::new()
//!     .with_server(
//!         "tool_server",
//!         MemoryServer::new().with_tool(Tool::new("add_item", "Add an item"), |_| {
//!             Ok(ToolResult::text("added"))
//!         }),
//!     )
//!     .with_server(
//!         "resource_server",
//!         MemoryServer::new().with_resource(
//!             Resource::new("inventory://overview", "overview"),
//!             ResourceResult::text("inventory://overview", "3 items"),
//!         ),
//!     );
//!
//! let client = MultiServerClient::builder(config).connector(connector).build()?;
//! client
//!     .scoped(|client| async move {
//!         let tools = client.list_tools();
//!         assert_eq!(tools[0].meta_str("serverName"), Some("tool_server"));
//!
//!         let overview = client
//!             .read_resource("resource_server:inventory://overview")
//!             .await?;
//!         assert_eq!(overview.first_text(), Some("3 items"));
//!         Ok::<_, MultiError>(())
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! # use multimcp::prelude::*;
//! # async fn example(client: MultiServerClient) -> MultiResult<()> {
//! // Tool errors are data
//! let result = client.call_tool("missing", None).await?;
//! if result.is_error() {
//!     eprintln!("tool failed: {:?}", result.first_text());
//! }
//!
//! // Resource and prompt errors are raised
//! match client.read_resource("no_namespace").await {
//!     Err(MultiError::MalformedIdentifier { .. }) => {}
//!     other => panic!("unexpected: {other:?}"),
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod blocking;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod manager;
pub mod memory;
pub mod namespace;
pub mod prelude;
pub mod router;
pub mod session;

pub use blocking::{BlockingClient, BlockingClientBuilder};
pub use catalog::{
    Aggregation, BackendCapabilities, BackendListing, Capability, CapabilityCatalog,
    CapabilityItem, CapabilityKind, CatalogSummary, ListingFailure, SERVER_NAME_META,
};
pub use client::{BackendStatus, MultiServerClient, MultiServerClientBuilder};
pub use config::{
    BackendDescriptor, BackendTransport, ClientOptions, ConnectPolicy, MultiServerConfig,
};
pub use error::{MultiError, MultiResult};
pub use manager::{BackendFailure, ConnectionManager, ConnectionResult, LiveBackend};
pub use namespace::ResourceTarget;
pub use router::{Collision, RoutingTable};
pub use session::{
    Connector, PromptArguments, Session, SessionError, SessionResult, ToolArguments,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
