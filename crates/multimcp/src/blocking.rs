//! Blocking front end
//!
//! [`BlockingClient`] drives a [`MultiServerClient`] for callers that cannot
//! `.await`. Each instance owns one OS thread running a current-thread tokio
//! runtime for its whole lifetime; every call is handed to that runtime and
//! the caller blocks on the reply. A façade-level lock admits one call at a
//! time, so two threads sharing a `BlockingClient` never interleave
//! operations on the engine.
//!
//! Contracts match the async client, with two additions: an optional
//! per-call timeout, and a defined state after [`BlockingClient::shutdown`]
//! (tool calls return error-flagged results, resource and prompt calls return
//! [`MultiError::NotConnected`], listings are empty).
//!
//! Any thread may call in, including `spawn_blocking` and `block_in_place`
//! sections of an async host. The only refused caller is the façade's own
//! runtime thread, which could never see its reply. A panic inside an
//! operation is re-raised on the calling thread.
//!
//! ```rust
//! use multimcp::blocking::BlockingClient;
//! use multimcp::prelude::*;
//!
//! # fn example() -> MultiResult<()> {
//! let config = MultiServerConfig::from_json_str(
//!     r#"{"mcpServers": {"tool_server": {"command": "python", "args": ["tool_server.py"]}}}"#,
//! )?;
//! let server = MemoryServer::new().with_tool(Tool::new("ping", "Ping"), |_| {
//!     Ok(ToolResult::text("pong"))
//! });
//! let client = BlockingClient::connect(
//!     config,
//!     MemoryConnector::new().with_server("tool_server", server),
//! )?;
//!
//! let result = client.call_tool("ping", None)?;
//! assert_eq!(result.first_text(), Some("pong"));
//! client.shutdown();
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, ThreadId};
use std::time::Duration;

use futures::executor::block_on;

use multimcp_types::{
    LogLevel, Prompt, PromptResult, Resource, ResourceResult, ResourceTemplate, Tool, ToolResult,
};
use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle};
use tokio::sync::oneshot;
use tokio::task::JoinError;
use tracing::{debug, warn};

use crate::catalog::{BackendCapabilities, CapabilityCatalog, CatalogSummary};
use crate::client::{BackendStatus, MultiServerClient, MultiServerClientBuilder};
use crate::config::{ConnectPolicy, MultiServerConfig};
use crate::error::{MultiError, MultiResult};
use crate::manager::BackendFailure;
use crate::router::Collision;
use crate::session::{Connector, PromptArguments, ToolArguments};

/// Name of the façade's runtime thread.
pub const RUNTIME_THREAD_NAME: &str = "multimcp-runtime";

const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(30);

struct RuntimeWorker {
    stop: oneshot::Sender<()>,
    thread: JoinHandle<()>,
}

fn start_runtime() -> MultiResult<(Handle, RuntimeWorker)> {
    let runtime = Builder::new_current_thread().enable_all().build()?;
    let handle = runtime.handle().clone();
    let (stop, stopped) = oneshot::channel::<()>();
    let thread = std::thread::Builder::new()
        .name(RUNTIME_THREAD_NAME.to_string())
        .spawn(move || {
            runtime.block_on(async {
                // Either a stop signal or the sender being dropped ends the loop
                let _ = stopped.await;
            });
            debug!("blocking client runtime stopped");
        })?;
    Ok((handle, RuntimeWorker { stop, thread }))
}

/// Map a failed operation task onto the caller.
///
/// A panic is re-raised where the call was made; a task cancelled because
/// the runtime stopped means the client is gone.
fn joined(err: JoinError) -> MultiError {
    match err.try_into_panic() {
        Ok(panic) => std::panic::resume_unwind(panic),
        Err(_) => MultiError::NotConnected,
    }
}

/// Blocking wrapper around [`MultiServerClient`].
pub struct BlockingClient {
    client: MultiServerClient,
    handle: Handle,
    runtime_thread: ThreadId,
    worker: Mutex<Option<RuntimeWorker>>,
    gate: Mutex<()>,
    shut_down: AtomicBool,
    call_timeout: Option<Duration>,
}

impl BlockingClient {
    /// Connect every backend in `config` through `connector`, with default
    /// options.
    ///
    /// # Errors
    ///
    /// As [`BlockingClientBuilder::build`].
    pub fn connect<C: Connector + 'static>(
        config: MultiServerConfig,
        connector: C,
    ) -> MultiResult<Self> {
        Self::builder(config).connector(connector).build()
    }

    /// Start configuring a blocking client.
    pub fn builder(config: MultiServerConfig) -> BlockingClientBuilder {
        BlockingClientBuilder {
            inner: MultiServerClient::builder(config),
            init_timeout: DEFAULT_INIT_TIMEOUT,
            call_timeout: None,
        }
    }

    /// The engine this façade drives.
    pub fn client(&self) -> &MultiServerClient {
        &self.client
    }

    fn on_runtime_thread(&self) -> bool {
        std::thread::current().id() == self.runtime_thread
    }

    /// Run `work` on the façade runtime and block until it finishes.
    fn run<T, F>(&self, operation: &str, timeout: Option<Duration>, work: F) -> MultiResult<T>
    where
        F: Future<Output = MultiResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        if self.on_runtime_thread() {
            return Err(MultiError::configuration(format!(
                "blocking call from the client's own runtime thread ({operation})"
            )));
        }

        let _gate = self.gate.lock();
        if self.shut_down.load(Ordering::Acquire) {
            return Err(MultiError::NotConnected);
        }

        let operation = operation.to_string();
        let task = self.handle.spawn(async move {
            match timeout {
                Some(limit) => match tokio::time::timeout(limit, work).await {
                    Ok(result) => result,
                    Err(_) => Err(MultiError::timeout(operation, limit)),
                },
                None => work.await,
            }
        });
        // Not `blocking_recv`: that refuses any thread inside a runtime context
        block_on(task).unwrap_or_else(|err| Err(joined(err)))
    }

    fn run_tool<F>(&self, name: &str, work: F) -> MultiResult<ToolResult>
    where
        F: Future<Output = MultiResult<ToolResult>> + Send + 'static,
    {
        match self.run(&format!("tool '{name}'"), self.call_timeout, work) {
            Err(err @ (MultiError::Timeout { .. } | MultiError::NotConnected)) => {
                Ok(err.to_tool_result())
            }
            other => other,
        }
    }

    /// Blocking [`MultiServerClient::call_tool`]. Timeouts and calls after
    /// shutdown produce error-flagged results.
    ///
    /// # Errors
    ///
    /// As the async call, plus [`MultiError::Configuration`] when invoked
    /// from the façade's own runtime thread.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from the backend handling the call.
    pub fn call_tool(
        &self,
        name: &str,
        arguments: Option<ToolArguments>,
    ) -> MultiResult<ToolResult> {
        let client = self.client.clone();
        let owned = name.to_string();
        self.run_tool(name, async move { client.call_tool(&owned, arguments).await })
    }

    /// Blocking [`MultiServerClient::call_tool_on`].
    ///
    /// # Errors
    ///
    /// As [`call_tool`](Self::call_tool).
    pub fn call_tool_on(
        &self,
        backend: &str,
        name: &str,
        arguments: Option<ToolArguments>,
    ) -> MultiResult<ToolResult> {
        let client = self.client.clone();
        let (backend, owned) = (backend.to_string(), name.to_string());
        self.run_tool(name, async move {
            client.call_tool_on(&backend, &owned, arguments).await
        })
    }

    /// Blocking [`MultiServerClient::read_resource`].
    ///
    /// # Errors
    ///
    /// As the async call, plus [`MultiError::Timeout`] and
    /// [`MultiError::NotConnected`] after shutdown.
    pub fn read_resource(&self, identifier: &str) -> MultiResult<ResourceResult> {
        let client = self.client.clone();
        let owned = identifier.to_string();
        self.run(&format!("resource '{identifier}'"), self.call_timeout, async move {
            client.read_resource(&owned).await
        })
    }

    /// Blocking [`MultiServerClient::read_resource_on`].
    ///
    /// # Errors
    ///
    /// As [`read_resource`](Self::read_resource).
    pub fn read_resource_on(&self, backend: &str, uri: &str) -> MultiResult<ResourceResult> {
        let client = self.client.clone();
        let (backend, owned) = (backend.to_string(), uri.to_string());
        self.run(&format!("resource '{uri}'"), self.call_timeout, async move {
            client.read_resource_on(&backend, &owned).await
        })
    }

    /// Blocking [`MultiServerClient::get_prompt`].
    ///
    /// # Errors
    ///
    /// As [`read_resource`](Self::read_resource).
    pub fn get_prompt(
        &self,
        name: &str,
        arguments: Option<PromptArguments>,
    ) -> MultiResult<PromptResult> {
        let client = self.client.clone();
        let owned = name.to_string();
        self.run(&format!("prompt '{name}'"), self.call_timeout, async move {
            client.get_prompt(&owned, arguments).await
        })
    }

    /// Blocking [`MultiServerClient::get_prompt_on`].
    ///
    /// # Errors
    ///
    /// As [`read_resource`](Self::read_resource).
    pub fn get_prompt_on(
        &self,
        backend: &str,
        name: &str,
        arguments: Option<PromptArguments>,
    ) -> MultiResult<PromptResult> {
        let client = self.client.clone();
        let (backend, owned) = (backend.to_string(), name.to_string());
        self.run(&format!("prompt '{name}'"), self.call_timeout, async move {
            client.get_prompt_on(&backend, &owned, arguments).await
        })
    }

    /// Blocking [`MultiServerClient::set_logging_level`].
    ///
    /// # Errors
    ///
    /// [`MultiError::NotConnected`] after shutdown.
    pub fn set_logging_level(&self, level: LogLevel) -> MultiResult<Vec<BackendFailure>> {
        let client = self.client.clone();
        self.run("logging/setLevel", self.call_timeout, async move {
            Ok(client.set_logging_level(level).await)
        })
    }

    /// Blocking [`MultiServerClient::refresh`].
    ///
    /// # Errors
    ///
    /// As the async call.
    pub fn refresh(&self) -> MultiResult<()> {
        let client = self.client.clone();
        self.run("refresh", None, async move { client.refresh().await })
    }

    /// Blocking [`MultiServerClient::disconnect`].
    ///
    /// # Errors
    ///
    /// As the async call.
    pub fn disconnect(&self, name: &str) -> MultiResult<Vec<BackendFailure>> {
        let client = self.client.clone();
        let owned = name.to_string();
        self.run("disconnect", None, async move { client.disconnect(&owned).await })
    }

    /// Every tool, with `_meta.serverName`.
    pub fn list_tools(&self) -> Vec<Tool> {
        self.client.list_tools()
    }

    /// Every resource under its namespaced identifier.
    pub fn list_resources(&self) -> Vec<Resource> {
        self.client.list_resources(true)
    }

    /// Every resource, choosing whether URIs are namespaced.
    pub fn list_resources_with(&self, use_namespace: bool) -> Vec<Resource> {
        self.client.list_resources(use_namespace)
    }

    /// Every resource template under its namespaced identifier.
    pub fn list_resource_templates(&self) -> Vec<ResourceTemplate> {
        self.client.list_resource_templates(true)
    }

    /// Every resource template, choosing whether URIs are namespaced.
    pub fn list_resource_templates_with(&self, use_namespace: bool) -> Vec<ResourceTemplate> {
        self.client.list_resource_templates(use_namespace)
    }

    /// Every prompt, with `_meta.serverName`.
    pub fn list_prompts(&self) -> Vec<Prompt> {
        self.client.list_prompts()
    }

    /// See [`MultiServerClient::catalog`].
    pub fn catalog(&self) -> CapabilityCatalog {
        self.client.catalog()
    }

    /// See [`MultiServerClient::capabilities`].
    pub fn capabilities(&self) -> Vec<BackendCapabilities> {
        self.client.capabilities()
    }

    /// See [`MultiServerClient::collisions`].
    pub fn collisions(&self) -> Vec<Collision> {
        self.client.collisions()
    }

    /// See [`MultiServerClient::summary`].
    pub fn summary(&self) -> CatalogSummary {
        self.client.summary()
    }

    /// See [`MultiServerClient::live_backends`].
    pub fn live_backends(&self) -> Vec<BackendStatus> {
        self.client.live_backends()
    }

    /// See [`MultiServerClient::connection_failures`].
    pub fn connection_failures(&self) -> Vec<BackendFailure> {
        self.client.connection_failures()
    }

    /// Whether the façade is connected and not shut down.
    pub fn is_connected(&self) -> bool {
        !self.shut_down.load(Ordering::Acquire) && self.client.is_connected()
    }

    /// Disconnect every backend and stop the runtime thread.
    ///
    /// Idempotent; later calls return an empty list. Waits for an in-flight
    /// call to finish first. On the façade's own runtime thread (the client
    /// dropped inside one of its operations) the disconnect is started but
    /// not awaited and its failures are only logged.
    pub fn shutdown(&self) -> Vec<BackendFailure> {
        let _gate = self.gate.lock();
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Vec::new();
        }
        let Some(worker) = self.worker.lock().take() else {
            return Vec::new();
        };

        let client = self.client.clone();
        if self.on_runtime_thread() {
            warn!("BlockingClient shut down from its runtime thread; not waiting for disconnect");
            let RuntimeWorker { stop, thread: _ } = worker;
            self.handle.spawn(async move {
                client.disconnect_all().await;
                let _ = stop.send(());
            });
            return Vec::new();
        }

        let task = self
            .handle
            .spawn(async move { client.disconnect_all().await });
        let failures = block_on(task).unwrap_or_else(|err| {
            warn!(error = %err, "disconnect task failed during shutdown");
            Vec::new()
        });

        let _ = worker.stop.send(());
        if worker.thread.join().is_err() {
            warn!("blocking client runtime thread panicked");
        }
        failures
    }
}

impl Drop for BlockingClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for BlockingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingClient")
            .field("client", &self.client)
            .field("shut_down", &self.shut_down.load(Ordering::Relaxed))
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

/// Builder for [`BlockingClient`].
#[derive(Debug)]
pub struct BlockingClientBuilder {
    inner: MultiServerClientBuilder,
    init_timeout: Duration,
    call_timeout: Option<Duration>,
}

impl BlockingClientBuilder {
    /// Open sessions through `connector`.
    pub fn connector<C: Connector + 'static>(mut self, connector: C) -> Self {
        self.inner = self.inner.connector(connector);
        self
    }

    /// Per-backend connection deadline.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.inner = self.inner.connect_timeout(timeout);
        self
    }

    /// Deadline for closing sessions.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.inner = self.inner.shutdown_timeout(timeout);
        self
    }

    /// Acceptable connection outcome.
    pub fn policy(mut self, policy: ConnectPolicy) -> Self {
        self.inner = self.inner.policy(policy);
        self
    }

    /// Deadline for the initial `connect_all` (default 30 s).
    pub fn init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    /// Deadline for every tool call, resource read and prompt render.
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Start the runtime thread and connect every backend.
    ///
    /// # Errors
    ///
    /// - [`MultiError::Configuration`] for invalid options
    /// - [`MultiError::Timeout`] if connecting exceeds `init_timeout`
    /// - [`MultiError::ConnectionFailed`] if the connect policy is not met
    /// - [`MultiError::Io`] if the runtime thread cannot be started
    ///
    /// On error the runtime thread is torn down again.
    pub fn build(self) -> MultiResult<BlockingClient> {
        let client = self.inner.build()?;
        let (handle, worker) = start_runtime()?;
        let blocking = BlockingClient {
            client: client.clone(),
            handle,
            runtime_thread: worker.thread.thread().id(),
            worker: Mutex::new(Some(worker)),
            gate: Mutex::new(()),
            shut_down: AtomicBool::new(false),
            call_timeout: self.call_timeout,
        };

        // On failure, dropping `blocking` shuts the runtime down
        blocking.run("connect", Some(self.init_timeout), async move {
            client.connect_all().await.map(|_| ())
        })?;
        Ok(blocking)
    }
}
