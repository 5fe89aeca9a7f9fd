//! Core `MultiServerClient` implementation
//!
//! This module holds the engine state and its lifecycle:
//!
//! - Connecting every configured backend and aggregating their catalogs
//! - Re-aggregating and disconnecting (all backends or one)
//! - Read-only views of the merged catalog
//!
//! Dispatch lives in the `operations` modules.
//!
//! # Architecture
//!
//! `MultiServerClient` is a cheap `Arc` wrapper, so clones share one engine.
//! Everything that dispatch reads (live backends, catalog, routing table) sits
//! in one immutable [`Snapshot`] behind an [`ArcSwap`]:
//!
//! - **Dispatch** loads the current snapshot once and works on it, never
//!   taking a lock.
//! - **Lifecycle changes** build a complete new snapshot under the lifecycle
//!   mutex and swap it in, so readers see either the old or the new state.
//! - **Lifecycle work** runs on a spawned task; abandoning the returned
//!   future does not interrupt a half-done swap or close.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use multimcp_types::{Prompt, Resource, ResourceTemplate, Tool};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::builder::MultiServerClientBuilder;
use crate::catalog::{
    self, Aggregation, BackendCapabilities, CapabilityCatalog, CapabilityKind, CatalogSummary,
};
use crate::config::{ClientOptions, MultiServerConfig};
use crate::error::{MultiError, MultiResult};
use crate::manager::{BackendFailure, ConnectionManager, ConnectionResult, LiveBackend};
use crate::router::{Collision, RoutingTable};
use crate::session::Connector;

/// Everything dispatch needs, replaced as a unit.
#[derive(Debug, Default)]
pub(crate) struct Snapshot {
    pub(crate) connected: bool,
    pub(crate) live: Vec<Arc<LiveBackend>>,
    pub(crate) aggregation: Arc<Aggregation>,
    pub(crate) connection_failures: Vec<BackendFailure>,
}

impl Snapshot {
    pub(crate) fn ensure_connected(&self) -> MultiResult<()> {
        if self.connected {
            Ok(())
        } else {
            Err(MultiError::NotConnected)
        }
    }

    /// The live session for a backend the catalog already refers to.
    pub(crate) fn live(&self, backend: &str) -> MultiResult<Arc<LiveBackend>> {
        self.live
            .iter()
            .find(|live| live.name() == backend && !live.is_closed())
            .cloned()
            .ok_or_else(|| MultiError::BackendUnavailable {
                backend: backend.to_string(),
            })
    }

    /// Resolve a caller-named backend.
    pub(crate) fn named(
        &self,
        config: &MultiServerConfig,
        backend: &str,
    ) -> MultiResult<Arc<LiveBackend>> {
        self.ensure_connected()?;
        if !config.contains(backend) {
            return Err(MultiError::UnknownBackend {
                backend: backend.to_string(),
            });
        }
        self.live(backend)
    }

    /// Resolve a caller-named backend and check that it lists `name`.
    pub(crate) fn named_with(
        &self,
        config: &MultiServerConfig,
        backend: &str,
        kind: CapabilityKind,
        name: &str,
    ) -> MultiResult<Arc<LiveBackend>> {
        let live = self.named(config, backend)?;
        let capabilities = self
            .aggregation
            .capabilities_of(backend)
            .filter(|caps| caps.provides(kind))
            .ok_or_else(|| MultiError::CapabilityMissing {
                backend: backend.to_string(),
                kind,
            })?;
        let listed = match kind {
            CapabilityKind::Tool => capabilities.has_tool(name),
            CapabilityKind::Prompt => capabilities.has_prompt(name),
            CapabilityKind::Resource | CapabilityKind::ResourceTemplate => true,
        };
        if !listed {
            return Err(MultiError::NotInBackend {
                backend: backend.to_string(),
                kind,
                name: name.to_string(),
            });
        }
        Ok(live)
    }

    fn open_backends(&self) -> Vec<Arc<LiveBackend>> {
        self.live
            .iter()
            .filter(|backend| !backend.is_closed())
            .cloned()
            .collect()
    }
}

/// Connection state of one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendStatus {
    /// Backend name
    pub name: String,
    /// `stdio`, `http` or `websocket`
    pub transport: &'static str,
    /// When the session was established
    pub connected_at: DateTime<Utc>,
}

/// Shared engine state.
pub(super) struct ClientInner {
    pub(super) manager: ConnectionManager,
    pub(super) state: ArcSwap<Snapshot>,
    /// Serialises connect, refresh and disconnect
    pub(super) lifecycle: tokio::sync::Mutex<()>,
}

impl ClientInner {
    async fn connect_all(&self) -> MultiResult<ConnectionResult> {
        let _guard = self.lifecycle.lock().await;
        let result = self.manager.connect_all().await?;
        let aggregation = catalog::aggregate(&result.live).await;

        let previous = self.state.swap(Arc::new(Snapshot {
            connected: true,
            live: result.live.clone(),
            aggregation: Arc::new(aggregation),
            connection_failures: result.failures.clone(),
        }));
        info!(
            backends = ?result.connected_names(),
            "catalog swapped in"
        );

        // Reconnecting replaces the previous sessions
        let stale = previous.open_backends();
        if !stale.is_empty() {
            ConnectionManager::disconnect(stale, self.manager.options().shutdown_timeout).await;
        }
        Ok(result)
    }

    async fn refresh(&self) -> MultiResult<()> {
        let _guard = self.lifecycle.lock().await;
        let current = self.state.load_full();
        current.ensure_connected()?;

        let live = current.open_backends();
        let aggregation = catalog::aggregate(&live).await;
        self.state.store(Arc::new(Snapshot {
            connected: true,
            live,
            aggregation: Arc::new(aggregation),
            connection_failures: current.connection_failures.clone(),
        }));
        info!("catalog refreshed");
        Ok(())
    }

    async fn disconnect_all(&self) -> Vec<BackendFailure> {
        let _guard = self.lifecycle.lock().await;
        let previous = self.state.swap(Arc::new(Snapshot::default()));
        let failures = ConnectionManager::disconnect(
            previous.open_backends(),
            self.manager.options().shutdown_timeout,
        )
        .await;
        info!(failed = failures.len(), "disconnected from all backends");
        failures
    }

    async fn disconnect(&self, name: &str) -> MultiResult<Vec<BackendFailure>> {
        let _guard = self.lifecycle.lock().await;
        if !self.manager.config().contains(name) {
            return Err(MultiError::UnknownBackend {
                backend: name.to_string(),
            });
        }

        let current = self.state.load_full();
        let (leaving, staying): (Vec<_>, Vec<_>) = current
            .live
            .iter()
            .cloned()
            .partition(|backend| backend.name() == name);
        if leaving.is_empty() {
            debug!(backend = %name, "backend already disconnected");
            return Ok(Vec::new());
        }

        // Routes to the backend stay in place and now report it unavailable
        self.state.store(Arc::new(Snapshot {
            connected: current.connected,
            live: staying,
            aggregation: Arc::clone(&current.aggregation),
            connection_failures: current.connection_failures.clone(),
        }));
        Ok(ConnectionManager::disconnect(leaving, self.manager.options().shutdown_timeout).await)
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        let open = self.state.load().open_backends();
        if open.is_empty() {
            return;
        }
        let timeout = self.manager.options().shutdown_timeout;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!(backends = open.len(), "closing backends of dropped client");
                handle.spawn(ConnectionManager::disconnect(open, timeout));
            }
            Err(_) => warn!(
                backends = open.len(),
                "client dropped outside a runtime with open sessions; call disconnect_all() first"
            ),
        }
    }
}

/// One logical client over many backend servers.
///
/// Connect with [`connect_all`](Self::connect_all), then use the merged
/// catalog and the dispatch operations as if talking to a single server.
/// Tools and prompts are routed by name; resources by their namespaced
/// identifier `backend:uri`.
///
/// # Clone Pattern
///
/// Cloning is cheap and every clone drives the same engine.
///
/// # Examples
///
/// ```rust
/// use multimcp::prelude::*;
///
/// # async fn example() -> MultiResult<()> {
/// let config = MultiServerConfig::from_json_str(
///     r#"{"mcpServers": {"tool_server": {"command": "python", "args": ["tool_server.py"]}}}"#,
/// )?;
/// let server = MemoryServer::new().with_tool(Tool::new("add_item", "Add an item"), |_| {
///     Ok(ToolResult::text("added"))
/// });
/// let client = MultiServerClient::builder(config)
///     .connector(MemoryConnector::new().with_server("tool_server", server))
///     .build()?;
///
/// client.connect_all().await?;
/// let result = client.call_tool("add_item", None).await?;
/// assert_eq!(result.first_text(), Some("added"));
/// client.disconnect_all().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MultiServerClient {
    pub(super) inner: Arc<ClientInner>,
}

impl MultiServerClient {
    /// Create a client. Nothing is connected until
    /// [`connect_all`](Self::connect_all).
    pub fn new(
        config: MultiServerConfig,
        connector: Arc<dyn Connector>,
        options: ClientOptions,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                manager: ConnectionManager::new(config, connector, options),
                state: ArcSwap::from_pointee(Snapshot::default()),
                lifecycle: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Start building a client for `config`.
    pub fn builder(config: MultiServerConfig) -> MultiServerClientBuilder {
        MultiServerClientBuilder::new(config)
    }

    /// The configured backends.
    pub fn config(&self) -> &MultiServerConfig {
        self.inner.manager.config()
    }

    /// Options in effect.
    pub fn options(&self) -> &ClientOptions {
        self.inner.manager.options()
    }

    pub(crate) fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.state.load_full()
    }

    /// Connect every configured backend and build the catalog.
    ///
    /// Calling it again reconnects: the new catalog is swapped in first,
    /// then the previous sessions are closed.
    ///
    /// # Errors
    ///
    /// Returns [`MultiError::ConnectionFailed`] if the connect policy is not
    /// met. With the default policy this never fails; per-backend failures
    /// are in the returned result and in [`connection_failures`](Self::connection_failures).
    pub async fn connect_all(&self) -> MultiResult<ConnectionResult> {
        let inner = Arc::clone(&self.inner);
        run_detached(async move { inner.connect_all().await }).await
    }

    /// Re-list every live backend and swap in the new catalog.
    ///
    /// # Errors
    ///
    /// Returns [`MultiError::NotConnected`] before `connect_all`.
    pub async fn refresh(&self) -> MultiResult<()> {
        let inner = Arc::clone(&self.inner);
        run_detached(async move { inner.refresh().await }).await
    }

    /// Close every live backend and clear the catalog.
    ///
    /// Every open session gets exactly one close attempt; failures are
    /// logged and returned. Calls already in flight finish against the
    /// sessions they started on and fail cleanly if those are closed.
    pub async fn disconnect_all(&self) -> Vec<BackendFailure> {
        let inner = Arc::clone(&self.inner);
        run_detached(async move { Ok(inner.disconnect_all().await) })
            .await
            .unwrap_or_default()
    }

    /// Close one backend.
    ///
    /// Its catalog entries stay until the next refresh and dispatch to them
    /// reports [`MultiError::BackendUnavailable`]. Disconnecting a backend
    /// that is not live is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`MultiError::UnknownBackend`] if `name` is not configured.
    pub async fn disconnect(&self, name: &str) -> MultiResult<Vec<BackendFailure>> {
        let inner = Arc::clone(&self.inner);
        let name = name.to_string();
        run_detached(async move { inner.disconnect(&name).await }).await
    }

    /// Connect, run `f`, then disconnect everything whatever `f` does,
    /// panics included.
    ///
    /// # Errors
    ///
    /// Returns the connect error or `f`'s error.
    pub async fn scoped<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(MultiServerClient) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<MultiError>,
    {
        self.connect_all().await?;
        let client = self.clone();
        let outcome = AssertUnwindSafe(async move { f(client).await })
            .catch_unwind()
            .await;
        self.disconnect_all().await;
        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Whether `connect_all` has run and no `disconnect_all` since.
    pub fn is_connected(&self) -> bool {
        self.inner.state.load().connected
    }

    /// Live backends in configuration order.
    pub fn live_backends(&self) -> Vec<BackendStatus> {
        self.inner
            .state
            .load()
            .open_backends()
            .iter()
            .map(|backend| BackendStatus {
                name: backend.name().to_string(),
                transport: backend.descriptor().transport().kind(),
                connected_at: backend.connected_at(),
            })
            .collect()
    }

    /// Backends that failed to connect during the last `connect_all`.
    pub fn connection_failures(&self) -> Vec<BackendFailure> {
        self.inner.state.load().connection_failures.clone()
    }

    /// Every tool, each with `_meta.serverName`.
    pub fn list_tools(&self) -> Vec<Tool> {
        let state = self.inner.state.load();
        state
            .aggregation
            .catalog
            .tools
            .iter()
            .map(|item| item.annotated(false))
            .collect()
    }

    /// Every resource, each with `_meta.serverName`. With `use_namespace`
    /// the URI is replaced by its `backend:uri` identifier.
    pub fn list_resources(&self, use_namespace: bool) -> Vec<Resource> {
        let state = self.inner.state.load();
        state
            .aggregation
            .catalog
            .resources
            .iter()
            .map(|item| item.annotated(use_namespace))
            .collect()
    }

    /// Every resource template; `use_namespace` as for
    /// [`list_resources`](Self::list_resources).
    pub fn list_resource_templates(&self, use_namespace: bool) -> Vec<ResourceTemplate> {
        let state = self.inner.state.load();
        state
            .aggregation
            .catalog
            .resource_templates
            .iter()
            .map(|item| item.annotated(use_namespace))
            .collect()
    }

    /// Every prompt, each with `_meta.serverName`.
    pub fn list_prompts(&self) -> Vec<Prompt> {
        let state = self.inner.state.load();
        state
            .aggregation
            .catalog
            .prompts
            .iter()
            .map(|item| item.annotated(false))
            .collect()
    }

    /// The merged catalog.
    pub fn catalog(&self) -> CapabilityCatalog {
        self.inner.state.load().aggregation.catalog.clone()
    }

    /// The current name routes.
    pub fn routes(&self) -> RoutingTable {
        self.inner.state.load().aggregation.routes.clone()
    }

    /// What each backend listed during the last aggregation.
    pub fn capabilities(&self) -> Vec<BackendCapabilities> {
        self.inner.state.load().aggregation.capabilities.clone()
    }

    /// Name collisions resolved during the last aggregation.
    pub fn collisions(&self) -> Vec<Collision> {
        self.inner.state.load().aggregation.collisions.clone()
    }

    /// Human-readable overview for diagnostics.
    pub fn summary(&self) -> CatalogSummary {
        let state = self.inner.state.load();
        let mut summary =
            CatalogSummary::new(&state.aggregation, |name| state.live(name).is_ok());
        summary.connection_failures = state
            .connection_failures
            .iter()
            .map(ToString::to_string)
            .collect();
        summary
    }
}

impl std::fmt::Debug for MultiServerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.load();
        f.debug_struct("MultiServerClient")
            .field("backends", &self.config().len())
            .field("connected", &state.connected)
            .field("live", &state.live.len())
            .finish()
    }
}

/// Run lifecycle work on its own task so that dropping the caller's future
/// cannot interrupt it.
async fn run_detached<T, F>(work: F) -> MultiResult<T>
where
    F: Future<Output = MultiResult<T>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(work).await {
        Ok(result) => result,
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(err) => Err(MultiError::configuration(format!(
            "lifecycle task cancelled: {err}"
        ))),
    }
}
