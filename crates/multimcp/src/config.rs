//! Configuration types for multimcp
//!
//! Backends are described by the familiar `mcpServers` document:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "tool_server": { "command": "python", "args": ["tool_server.py"] },
//!     "remote":      { "url": "https://mcp.example.com/mcp" }
//!   }
//! }
//! ```
//!
//! Entry order in the document is the order backends are visited during
//! aggregation, which in turn decides who wins a name collision.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MultiError, MultiResult};

/// How to reach one backend.
///
/// Untagged on the wire: an entry with `command` is a subprocess, an entry
/// with `url` is a remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackendTransport {
    /// Standard I/O backend (subprocess)
    Stdio {
        /// Command to execute (e.g., "python", "node")
        command: String,
        /// Command arguments
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
        /// Extra environment variables
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        env: BTreeMap<String, String>,
        /// Optional working directory
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<PathBuf>,
    },
    /// Remote backend over streamable HTTP (`http`/`https`) or WebSocket (`ws`/`wss`)
    Remote {
        /// Endpoint URL
        url: String,
        /// Extra request headers
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        headers: BTreeMap<String, String>,
    },
}

impl BackendTransport {
    /// A subprocess backend.
    pub fn stdio<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Stdio {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    /// A remote backend.
    pub fn remote(url: impl Into<String>) -> Self {
        Self::Remote {
            url: url.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Short transport name: `stdio`, `http` or `websocket`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Stdio { .. } => "stdio",
            Self::Remote { url, .. } if url.starts_with("ws://") || url.starts_with("wss://") => {
                "websocket"
            }
            Self::Remote { .. } => "http",
        }
    }

    fn validate(&self, backend: &str) -> MultiResult<()> {
        match self {
            Self::Stdio { command, .. } if command.trim().is_empty() => Err(
                MultiError::configuration_with_key("command must not be empty", backend),
            ),
            Self::Remote { url, .. }
                if !["http://", "https://", "ws://", "wss://"]
                    .iter()
                    .any(|scheme| url.starts_with(scheme)) =>
            {
                Err(MultiError::configuration_with_key(
                    format!("unsupported url '{url}', expected http(s):// or ws(s)://"),
                    backend,
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Identity plus launch parameters of one backend. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    name: String,
    transport: BackendTransport,
}

impl BackendDescriptor {
    /// Create a descriptor.
    pub fn new(name: impl Into<String>, transport: BackendTransport) -> Self {
        Self {
            name: name.into(),
            transport,
        }
    }

    /// Unique backend name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Launch or connect parameters.
    pub fn transport(&self) -> &BackendTransport {
        &self.transport
    }
}

#[derive(Deserialize)]
struct ConfigDocument {
    #[serde(rename = "mcpServers")]
    servers: serde_json::Map<String, Value>,
}

/// The ordered set of backends the engine manages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiServerConfig {
    backends: Vec<BackendDescriptor>,
}

impl MultiServerConfig {
    /// Build from descriptors, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`MultiError::Configuration`] if a name is empty, contains
    /// `:`, or appears twice, or if a transport is invalid.
    pub fn new(backends: Vec<BackendDescriptor>) -> MultiResult<Self> {
        let config = Self { backends };
        config.validate()?;
        Ok(config)
    }

    /// Parse an `{"mcpServers": {...}}` document.
    ///
    /// # Errors
    ///
    /// Returns [`MultiError::Serialization`] for malformed JSON and
    /// [`MultiError::Configuration`] for invalid entries.
    pub fn from_json_str(json: &str) -> MultiResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Build from an already decoded `{"mcpServers": {...}}` value.
    ///
    /// # Errors
    ///
    /// Same as [`MultiServerConfig::from_json_str`].
    pub fn from_value(value: Value) -> MultiResult<Self> {
        let document: ConfigDocument = serde_json::from_value(value)
            .map_err(|e| MultiError::configuration_with_key(e.to_string(), "mcpServers"))?;

        let backends = document
            .servers
            .into_iter()
            .map(|(name, entry)| {
                let transport: BackendTransport = serde_json::from_value(entry).map_err(|e| {
                    MultiError::configuration_with_key(
                        format!("invalid backend entry: {e}"),
                        name.clone(),
                    )
                })?;
                Ok(BackendDescriptor::new(name, transport))
            })
            .collect::<MultiResult<Vec<_>>>()?;

        Self::new(backends)
    }

    /// Load a config file.
    ///
    /// # Errors
    ///
    /// Returns [`MultiError::Io`] if the file cannot be read, otherwise as
    /// [`MultiServerConfig::from_json_str`].
    pub fn from_file(path: impl AsRef<Path>) -> MultiResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    /// Check names and transports.
    ///
    /// # Errors
    ///
    /// See [`MultiServerConfig::new`].
    pub fn validate(&self) -> MultiResult<()> {
        let mut seen = HashSet::new();
        for backend in &self.backends {
            let name = backend.name();
            if name.trim().is_empty() {
                return Err(MultiError::configuration("backend name must not be empty"));
            }
            if name.contains(crate::namespace::SEPARATOR) {
                return Err(MultiError::configuration_with_key(
                    "backend name must not contain ':'",
                    name,
                ));
            }
            if !seen.insert(name) {
                return Err(MultiError::configuration_with_key(
                    "duplicate backend name",
                    name,
                ));
            }
            backend.transport().validate(name)?;
        }
        Ok(())
    }

    /// Descriptors in configuration order.
    pub fn backends(&self) -> &[BackendDescriptor] {
        &self.backends
    }

    /// Look up one descriptor by name.
    pub fn get(&self, name: &str) -> Option<&BackendDescriptor> {
        self.backends.iter().find(|b| b.name() == name)
    }

    /// Check whether a backend of this name is configured.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of configured backends.
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Check if no backend is configured.
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

/// How many backends must connect for `connect_all` to succeed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectPolicy {
    /// Succeed even if every backend failed
    #[default]
    AllowPartial,
    /// At least one backend must connect (an empty config still succeeds)
    RequireAny,
    /// Every configured backend must connect
    RequireAll,
}

impl ConnectPolicy {
    /// Check whether `connected` out of `configured` backends is acceptable.
    pub fn is_satisfied(self, connected: usize, configured: usize) -> bool {
        match self {
            Self::AllowPartial => true,
            Self::RequireAny => configured == 0 || connected > 0,
            Self::RequireAll => connected == configured,
        }
    }
}

/// Engine options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientOptions {
    /// Deadline for establishing one backend session
    pub connect_timeout: Duration,
    /// Deadline for tearing everything down on shutdown
    pub shutdown_timeout: Duration,
    /// Acceptable connection outcome
    pub policy: ConnectPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(10),
            policy: ConnectPolicy::AllowPartial,
        }
    }
}
