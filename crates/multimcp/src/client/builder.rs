//! Client builder pattern for multi-server client construction
//!
//! Provides a fluent interface for configuring client options before creation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::core::MultiServerClient;
use crate::config::{ClientOptions, ConnectPolicy, MultiServerConfig};
use crate::error::{MultiError, MultiResult};
use crate::session::Connector;

/// Builder for configuring and creating a [`MultiServerClient`]
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use multimcp::prelude::*;
///
/// # fn example() -> MultiResult<()> {
/// let config = MultiServerConfig::from_json_str(
///     r#"{"mcpServers": {"tool_server": {"command": "python", "args": ["tool_server.py"]}}}"#,
/// )?;
/// let client = MultiServerClient::builder(config)
///     .connector(MemoryConnector::new())
///     .connect_timeout(Duration::from_secs(5))
///     .policy(ConnectPolicy::RequireAny)
///     .build()?;
/// assert!(!client.is_connected());
/// # Ok(())
/// # }
/// ```
pub struct MultiServerClientBuilder {
    config: MultiServerConfig,
    connector: Option<Arc<dyn Connector>>,
    options: ClientOptions,
}

impl MultiServerClientBuilder {
    /// Create a builder with default options.
    pub fn new(config: MultiServerConfig) -> Self {
        Self {
            config,
            connector: None,
            options: ClientOptions::default(),
        }
    }

    /// Open sessions through `connector`.
    pub fn connector<C: Connector + 'static>(self, connector: C) -> Self {
        self.connector_arc(Arc::new(connector))
    }

    /// Open sessions through an already shared connector.
    pub fn connector_arc(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Per-backend connection deadline.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Deadline for closing sessions.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.options.shutdown_timeout = timeout;
        self
    }

    /// Acceptable connection outcome.
    pub fn policy(mut self, policy: ConnectPolicy) -> Self {
        self.options.policy = policy;
        self
    }

    /// Replace all options at once.
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// The options configured so far.
    pub fn current_options(&self) -> &ClientOptions {
        &self.options
    }

    /// Build the client. Nothing is connected yet.
    ///
    /// # Errors
    ///
    /// Returns [`MultiError::Configuration`] if no connector was set or a
    /// timeout is zero.
    pub fn build(self) -> MultiResult<MultiServerClient> {
        let connector = self.connector.ok_or_else(|| {
            MultiError::configuration_with_key("a connector is required", "connector")
        })?;
        if self.options.connect_timeout.is_zero() {
            return Err(MultiError::configuration_with_key(
                "connect timeout must be positive",
                "connect_timeout",
            ));
        }
        if self.options.shutdown_timeout.is_zero() {
            return Err(MultiError::configuration_with_key(
                "shutdown timeout must be positive",
                "shutdown_timeout",
            ));
        }
        Ok(MultiServerClient::new(self.config, connector, self.options))
    }
}

impl fmt::Debug for MultiServerClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiServerClientBuilder")
            .field("config", &self.config)
            .field("has_connector", &self.connector.is_some())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendDescriptor, BackendTransport};
    use crate::memory::MemoryConnector;

    fn config() -> MultiServerConfig {
        MultiServerConfig::new(vec![BackendDescriptor::new(
            "a",
            BackendTransport::stdio("python", ["a.py"]),
        )])
        .unwrap()
    }

    #[test]
    fn test_requires_connector() {
        let err = MultiServerClient::builder(config()).build().unwrap_err();
        assert!(matches!(
            err,
            MultiError::Configuration { key: Some(ref key), .. } if key == "connector"
        ));
    }

    #[test]
    fn test_options_applied() {
        let client = MultiServerClient::builder(config())
            .connector(MemoryConnector::new())
            .connect_timeout(Duration::from_secs(3))
            .shutdown_timeout(Duration::from_secs(1))
            .policy(ConnectPolicy::RequireAll)
            .build()
            .unwrap();

        assert_eq!(client.options().connect_timeout, Duration::from_secs(3));
        assert_eq!(client.options().shutdown_timeout, Duration::from_secs(1));
        assert_eq!(client.options().policy, ConnectPolicy::RequireAll);
        assert_eq!(client.config().len(), 1);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = MultiServerClient::builder(config())
            .connector(MemoryConnector::new())
            .connect_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), "configuration");
    }
}
