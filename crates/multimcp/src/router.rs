//! Name-based routing for tools and prompts.
//!
//! The routing table maps each tool name and each prompt name to exactly one
//! backend. It is filled during aggregation in the deterministic backend
//! order; when two backends expose the same name, the later one wins and the
//! displaced owner is reported as a [`Collision`].

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tracing::{trace, warn};

use crate::catalog::CapabilityKind;
use crate::error::{MultiError, MultiResult};

/// Two backends exposed the same tool or prompt name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collision {
    /// Tool or prompt
    pub kind: CapabilityKind,
    /// The contested name
    pub name: String,
    /// Backend whose mapping was replaced
    pub discarded: String,
    /// Backend that now owns the name
    pub winner: String,
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}' from backend '{}' overrides backend '{}'",
            self.kind, self.name, self.winner, self.discarded
        )
    }
}

/// Tool name → backend and prompt name → backend.
///
/// Built only by aggregation and replaced wholesale with the catalog it was
/// derived from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable {
    tool_owner: HashMap<String, String>,
    prompt_owner: HashMap<String, String>,
}

impl RoutingTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `backend` as the owner of a tool or prompt name.
    ///
    /// Last writer wins. Returns the collision if a different backend owned
    /// the name before; re-registering the same owner is not a collision.
    /// Resources and templates are namespaced instead of routed by name, so
    /// they are never recorded here.
    pub fn insert(
        &mut self,
        kind: CapabilityKind,
        name: &str,
        backend: &str,
    ) -> Option<Collision> {
        let table = match kind {
            CapabilityKind::Tool => &mut self.tool_owner,
            CapabilityKind::Prompt => &mut self.prompt_owner,
            CapabilityKind::Resource | CapabilityKind::ResourceTemplate => return None,
        };

        let previous = table.insert(name.to_string(), backend.to_string())?;
        if previous == backend {
            return None;
        }

        warn!(
            kind = %kind,
            name = %name,
            discarded = %previous,
            winner = %backend,
            "{} name collision detected: '{}' from backend '{}' overrides backend '{}'",
            kind,
            name,
            backend,
            previous
        );
        Some(Collision {
            kind,
            name: name.to_string(),
            discarded: previous,
            winner: backend.to_string(),
        })
    }

    /// Resolve a tool name to its backend.
    ///
    /// # Errors
    ///
    /// Returns [`MultiError::NotFound`] if no backend provides the tool.
    pub fn route_tool(&self, name: &str) -> MultiResult<&str> {
        Self::route(&self.tool_owner, CapabilityKind::Tool, name)
    }

    /// Resolve a prompt name to its backend.
    ///
    /// # Errors
    ///
    /// Returns [`MultiError::NotFound`] if no backend provides the prompt.
    pub fn route_prompt(&self, name: &str) -> MultiResult<&str> {
        Self::route(&self.prompt_owner, CapabilityKind::Prompt, name)
    }

    fn route<'a>(
        table: &'a HashMap<String, String>,
        kind: CapabilityKind,
        name: &str,
    ) -> MultiResult<&'a str> {
        match table.get(name) {
            Some(backend) => {
                trace!(kind = %kind, name = %name, backend = %backend, "routed");
                Ok(backend)
            }
            None => Err(MultiError::NotFound {
                kind,
                name: name.to_string(),
            }),
        }
    }

    /// Owner of a tool name, if any.
    pub fn tool_owner(&self, name: &str) -> Option<&str> {
        self.tool_owner.get(name).map(String::as_str)
    }

    /// Owner of a prompt name, if any.
    pub fn prompt_owner(&self, name: &str) -> Option<&str> {
        self.prompt_owner.get(name).map(String::as_str)
    }

    /// Number of routed tool names.
    pub fn tool_count(&self) -> usize {
        self.tool_owner.len()
    }

    /// Number of routed prompt names.
    pub fn prompt_count(&self) -> usize {
        self.prompt_owner.len()
    }

    /// Every backend named by at least one route, sorted.
    pub fn backends(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .tool_owner
            .values()
            .chain(self.prompt_owner.values())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}
