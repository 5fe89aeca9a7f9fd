//! Multi-server client
//!
//! - `core`: `MultiServerClient`, its snapshot state and lifecycle
//! - `builder`: `MultiServerClientBuilder`
//! - `operations`: dispatch (tools, resources, prompts, logging)
//!
//! `MultiServerClient` is cloneable via `Arc<ClientInner>`; clones share one
//! engine.

pub mod builder;
pub mod core;
pub mod operations;

pub use builder::MultiServerClientBuilder;
pub use self::core::{BackendStatus, MultiServerClient};
