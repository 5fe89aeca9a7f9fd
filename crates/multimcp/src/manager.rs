//! Connection lifecycle across many backends
//!
//! The `ConnectionManager` turns the configured descriptors into live
//! sessions and tears them down again.
//!
//! # Guarantees
//!
//! - Connection attempts run concurrently and independently. One backend
//!   failing or timing out never aborts the others.
//! - Every failure is logged as a warning and reported with the backend name.
//! - Every session that was opened receives exactly one close attempt, even
//!   if `disconnect` is called repeatedly or concurrently with dispatches.
//! - Closing runs on spawned tasks, so abandoning a `disconnect` future does
//!   not leave a session half-closed.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{BackendDescriptor, ClientOptions, MultiServerConfig};
use crate::error::{MultiError, MultiResult};
use crate::session::{Connector, Session, SessionError};

/// A backend that could not be connected, listed or closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendFailure {
    /// Backend name
    pub backend: String,
    /// Human-readable cause
    pub cause: String,
}

impl BackendFailure {
    /// Create a failure record.
    pub fn new(backend: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            cause: cause.into(),
        }
    }
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.backend, self.cause)
    }
}

/// A descriptor paired with its open session.
///
/// Owned by the engine; other components only borrow it for the duration of
/// one aggregation pass or one dispatch.
pub struct LiveBackend {
    descriptor: BackendDescriptor,
    session: Arc<dyn Session>,
    connected_at: DateTime<Utc>,
    closed: AtomicBool,
}

impl LiveBackend {
    /// Pair a descriptor with a freshly opened session.
    pub fn new(descriptor: BackendDescriptor, session: Arc<dyn Session>) -> Self {
        Self {
            descriptor,
            session,
            connected_at: Utc::now(),
            closed: AtomicBool::new(false),
        }
    }

    /// Backend name.
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// The configuration this backend was started from.
    pub fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    /// When the session was established.
    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Check whether a close has been issued.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    /// Close the session. Only the first call reaches the session.
    ///
    /// # Errors
    ///
    /// Returns the session's close error on the first call.
    pub async fn close(&self) -> Result<(), SessionError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.session.close().await
    }
}

impl fmt::Debug for LiveBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveBackend")
            .field("name", &self.name())
            .field("transport", &self.descriptor.transport().kind())
            .field("connected_at", &self.connected_at)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Outcome of connecting to every configured backend.
#[derive(Debug, Clone, Default)]
pub struct ConnectionResult {
    /// Backends that connected, in configuration order
    pub live: Vec<Arc<LiveBackend>>,
    /// Backends that did not, in configuration order
    pub failures: Vec<BackendFailure>,
}

impl ConnectionResult {
    /// Names of the connected backends.
    pub fn connected_names(&self) -> Vec<&str> {
        self.live.iter().map(|b| b.name()).collect()
    }
}

/// Connects and disconnects the configured backends.
pub struct ConnectionManager {
    config: MultiServerConfig,
    connector: Arc<dyn Connector>,
    options: ClientOptions,
}

impl ConnectionManager {
    /// Create a manager for `config`, opening sessions through `connector`.
    pub fn new(
        config: MultiServerConfig,
        connector: Arc<dyn Connector>,
        options: ClientOptions,
    ) -> Self {
        Self {
            config,
            connector,
            options,
        }
    }

    /// The managed configuration.
    pub fn config(&self) -> &MultiServerConfig {
        &self.config
    }

    /// Options in effect.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Connect every configured backend concurrently.
    ///
    /// Each attempt is bounded by `connect_timeout`; a timeout counts as that
    /// backend's failure. If the connect policy is not met, every session
    /// opened by this call is closed again before returning.
    ///
    /// # Errors
    ///
    /// Returns [`MultiError::ConnectionFailed`] only when the policy rejects
    /// the outcome. Individual failures are reported in the result.
    pub async fn connect_all(&self) -> MultiResult<ConnectionResult> {
        let attempts = join_all(
            self.config
                .backends()
                .iter()
                .map(|descriptor| self.connect_one(descriptor)),
        )
        .await;

        let mut result = ConnectionResult::default();
        for attempt in attempts {
            match attempt {
                Ok(backend) => result.live.push(backend),
                Err(failure) => result.failures.push(failure),
            }
        }

        if !self
            .options
            .policy
            .is_satisfied(result.live.len(), self.config.len())
        {
            let failed = result
                .failures
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            let opened = std::mem::take(&mut result.live);
            Self::disconnect(opened, self.options.shutdown_timeout).await;
            return Err(MultiError::ConnectionFailed {
                backend: format!("{} of {} backends", result.failures.len(), self.config.len()),
                message: format!("connect policy {:?} not met ({failed})", self.options.policy),
            });
        }

        info!(
            connected = result.live.len(),
            failed = result.failures.len(),
            "connected to backends"
        );
        Ok(result)
    }

    async fn connect_one(
        &self,
        descriptor: &BackendDescriptor,
    ) -> Result<Arc<LiveBackend>, BackendFailure> {
        let name = descriptor.name();
        debug!(backend = %name, transport = descriptor.transport().kind(), "connecting");

        let timeout = self.options.connect_timeout;
        let cause = match tokio::time::timeout(timeout, self.connector.connect(descriptor)).await {
            Ok(Ok(session)) => {
                info!(backend = %name, "connected");
                return Ok(Arc::new(LiveBackend::new(descriptor.clone(), session)));
            }
            Ok(Err(err)) => err.to_string(),
            Err(_) => MultiError::timeout("connect", timeout).to_string(),
        };

        warn!(backend = %name, error = %cause, "failed to connect to backend");
        Err(BackendFailure::new(name, cause))
    }

    /// Close every given backend, tolerating individual failures.
    ///
    /// Closes run concurrently on spawned tasks and are awaited here for at
    /// most `timeout`; a close still pending then is reported as failed but
    /// keeps running in the background. Backends already closed are skipped.
    /// Returns the failures, each also logged.
    pub async fn disconnect(
        backends: Vec<Arc<LiveBackend>>,
        timeout: Duration,
    ) -> Vec<BackendFailure> {
        let deadline = Instant::now() + timeout;
        let closing: Vec<_> = backends
            .into_iter()
            .filter(|backend| !backend.is_closed())
            .map(|backend| {
                let name = backend.name().to_string();
                let task = tokio::spawn(async move { backend.close().await });
                (name, task)
            })
            .collect();

        let mut failures = Vec::new();
        for (name, task) in closing {
            let cause = match tokio::time::timeout_at(deadline, task).await {
                Ok(Ok(Ok(()))) => {
                    debug!(backend = %name, "disconnected");
                    continue;
                }
                Ok(Ok(Err(err))) => err.to_string(),
                Ok(Err(join_err)) => format!("close task failed: {join_err}"),
                Err(_) => MultiError::timeout("close", timeout).to_string(),
            };
            warn!(backend = %name, error = %cause, "failed to disconnect backend");
            failures.push(BackendFailure::new(name, cause));
        }
        failures
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("config", &self.config)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendTransport, ConnectPolicy};
    use crate::memory::{MemoryConnector, MemoryServer};

    const CLOSE: Duration = Duration::from_secs(5);

    fn config(names: &[&str]) -> MultiServerConfig {
        MultiServerConfig::new(
            names
                .iter()
                .map(|n| {
                    let transport = BackendTransport::stdio("python", [format!("{n}.py")]);
                    BackendDescriptor::new(*n, transport)
                })
                .collect(),
        )
        .unwrap()
    }

    fn manager(
        names: &[&str],
        connector: MemoryConnector,
        options: ClientOptions,
    ) -> ConnectionManager {
        ConnectionManager::new(config(names), Arc::new(connector), options)
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_order() {
        let connector = MemoryConnector::new()
            .with_server("a", MemoryServer::new())
            .with_server("c", MemoryServer::new());
        let result = manager(&["a", "b", "c"], connector, ClientOptions::default())
            .connect_all()
            .await
            .unwrap();

        assert_eq!(result.connected_names(), vec!["a", "c"]);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].backend, "b");
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_timeout_is_per_backend() {
        let connector = MemoryConnector::new()
            .with_server("fast", MemoryServer::new())
            .with_server("slow", MemoryServer::new())
            .with_connect_delay("slow", Duration::from_secs(60));
        let options = ClientOptions {
            connect_timeout: Duration::from_secs(5),
            ..Default::default()
        };

        let result = manager(&["slow", "fast"], connector, options)
            .connect_all()
            .await
            .unwrap();

        assert_eq!(result.connected_names(), vec!["fast"]);
        assert_eq!(result.failures[0].backend, "slow");
        assert!(result.failures[0].cause.contains("timed out"));
    }

    #[tokio::test]
    async fn test_policy_violation_closes_opened_sessions() {
        let server = MemoryServer::new();
        let stats = server.stats();
        let connector = MemoryConnector::new().with_server("a", server);
        let options = ClientOptions {
            policy: ConnectPolicy::RequireAll,
            ..Default::default()
        };

        let err = manager(&["a", "missing"], connector, options)
            .connect_all()
            .await
            .unwrap_err();

        assert!(matches!(err, MultiError::ConnectionFailed { .. }));
        assert_eq!(stats.closes(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_closes_exactly_once() {
        let server = MemoryServer::new();
        let stats = server.stats();
        let connector = MemoryConnector::new().with_server("a", server);
        let result = manager(&["a"], connector, ClientOptions::default())
            .connect_all()
            .await
            .unwrap();

        let backend = result.live[0].clone();
        let failures = ConnectionManager::disconnect(result.live.clone(), CLOSE).await;
        assert!(failures.is_empty());
        assert!(backend.is_closed());

        ConnectionManager::disconnect(result.live, CLOSE).await;
        backend.close().await.unwrap();
        assert_eq!(stats.closes(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_collects_failures() {
        let connector = MemoryConnector::new()
            .with_server(
                "a",
                MemoryServer::new().with_close_error(SessionError::transport("pipe closed")),
            )
            .with_server("b", MemoryServer::new());
        let result = manager(&["a", "b"], connector, ClientOptions::default())
            .connect_all()
            .await
            .unwrap();

        let failures = ConnectionManager::disconnect(result.live, CLOSE).await;
        assert_eq!(failures, vec![BackendFailure::new("a", "Transport error: pipe closed")]);
    }
}
