//! In-process backends.
//!
//! [`MemoryServer`] is a complete backend assembled from definitions and
//! handler closures; [`MemoryConnector`] hands out sessions to registered
//! servers by backend name. They serve embedded use (tools implemented in
//! the host process next to remote backends) as well as tests, and can
//! inject listing failures, slow calls and close errors.
//!
//! ```
//! use multimcp::memory::{MemoryConnector, MemoryServer};
//! use multimcp_types::{Tool, ToolResult};
//!
//! let server = MemoryServer::new()
//!     .with_tool(Tool::new("echo", "Echo the input"), |args| {
//!         let text = args
//!             .and_then(|a| a.get("text").and_then(|v| v.as_str()).map(str::to_owned))
//!             .unwrap_or_default();
//!         Ok(ToolResult::text(text))
//!     });
//! let connector = MemoryConnector::new().with_server("echo_server", server);
//! # let _ = connector;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use multimcp_types::{
    LogLevel, Prompt, PromptResult, Resource, ResourceResult, ResourceTemplate, Tool, ToolResult,
    match_template,
};
use parking_lot::Mutex;

use crate::catalog::CapabilityKind;
use crate::config::BackendDescriptor;
use crate::session::{
    Connector, INVALID_PARAMS, PromptArguments, Session, SessionError, SessionResult,
    ToolArguments,
};

/// JSON-RPC code MCP servers use for an unknown resource.
pub const RESOURCE_NOT_FOUND: i64 = -32002;

type ToolHandler = Arc<dyn Fn(Option<ToolArguments>) -> SessionResult<ToolResult> + Send + Sync>;
type TemplateHandler =
    Arc<dyn Fn(&str, &HashMap<String, String>) -> SessionResult<ResourceResult> + Send + Sync>;
type PromptHandler =
    Arc<dyn Fn(Option<PromptArguments>) -> SessionResult<PromptResult> + Send + Sync>;

/// Counters shared by a server and every session opened on it.
#[derive(Debug, Default)]
pub struct MemoryStats {
    connects: AtomicUsize,
    tool_calls: AtomicUsize,
    resource_reads: AtomicUsize,
    prompt_gets: AtomicUsize,
    closes: AtomicUsize,
    logging_level: Mutex<Option<LogLevel>>,
}

impl MemoryStats {
    /// Sessions opened.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Tool calls served (including failed ones).
    pub fn tool_calls(&self) -> usize {
        self.tool_calls.load(Ordering::SeqCst)
    }

    /// Resource reads served.
    pub fn resource_reads(&self) -> usize {
        self.resource_reads.load(Ordering::SeqCst)
    }

    /// Prompt renders served.
    pub fn prompt_gets(&self) -> usize {
        self.prompt_gets.load(Ordering::SeqCst)
    }

    /// `close` invocations.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Last logging level requested by a client.
    pub fn logging_level(&self) -> Option<LogLevel> {
        *self.logging_level.lock()
    }
}

/// An in-process backend.
#[derive(Clone, Default)]
pub struct MemoryServer {
    tools: Vec<(Tool, ToolHandler)>,
    resources: Vec<(Resource, ResourceResult)>,
    templates: Vec<(ResourceTemplate, TemplateHandler)>,
    prompts: Vec<(Prompt, PromptHandler)>,
    listing_errors: HashMap<CapabilityKind, SessionError>,
    call_delay: Option<Duration>,
    close_error: Option<SessionError>,
    logging: bool,
    stats: Arc<MemoryStats>,
}

impl MemoryServer {
    /// Create a server with no capabilities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool and its handler.
    #[must_use]
    pub fn with_tool<F>(mut self, tool: Tool, handler: F) -> Self
    where
        F: Fn(Option<ToolArguments>) -> SessionResult<ToolResult> + Send + Sync + 'static,
    {
        self.tools.push((tool, Arc::new(handler)));
        self
    }

    /// Register a resource with fixed contents.
    #[must_use]
    pub fn with_resource(mut self, resource: Resource, contents: ResourceResult) -> Self {
        self.resources.push((resource, contents));
        self
    }

    /// Register a resource template. The handler receives the concrete URI
    /// and the values bound to the template's placeholders.
    #[must_use]
    pub fn with_template<F>(mut self, template: ResourceTemplate, handler: F) -> Self
    where
        F: Fn(&str, &HashMap<String, String>) -> SessionResult<ResourceResult>
            + Send
            + Sync
            + 'static,
    {
        self.templates.push((template, Arc::new(handler)));
        self
    }

    /// Register a prompt and its renderer. Required arguments are checked
    /// before the renderer runs.
    #[must_use]
    pub fn with_prompt<F>(mut self, prompt: Prompt, handler: F) -> Self
    where
        F: Fn(Option<PromptArguments>) -> SessionResult<PromptResult> + Send + Sync + 'static,
    {
        self.prompts.push((prompt, Arc::new(handler)));
        self
    }

    /// Make the listing call for `kind` fail with `error`.
    #[must_use]
    pub fn with_listing_error(mut self, kind: CapabilityKind, error: SessionError) -> Self {
        self.listing_errors.insert(kind, error);
        self
    }

    /// Delay every tool call, resource read and prompt render.
    #[must_use]
    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }

    /// Make `close` report `error` (the session still closes).
    #[must_use]
    pub fn with_close_error(mut self, error: SessionError) -> Self {
        self.close_error = Some(error);
        self
    }

    /// Accept `logging/setLevel` requests.
    #[must_use]
    pub fn with_logging(mut self) -> Self {
        self.logging = true;
        self
    }

    /// Counters for this server and all of its sessions.
    pub fn stats(&self) -> Arc<MemoryStats> {
        Arc::clone(&self.stats)
    }

    fn listing<T: Clone, H>(
        &self,
        kind: CapabilityKind,
        items: &[(T, H)],
    ) -> SessionResult<Vec<T>> {
        match self.listing_errors.get(&kind) {
            Some(error) => Err(error.clone()),
            None => Ok(items.iter().map(|(item, _)| item.clone()).collect()),
        }
    }
}

impl fmt::Debug for MemoryServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryServer")
            .field("tools", &self.tools.iter().map(|(t, _)| &t.name).collect::<Vec<_>>())
            .field("resources", &self.resources.iter().map(|(r, _)| &r.uri).collect::<Vec<_>>())
            .field(
                "templates",
                &self.templates.iter().map(|(t, _)| &t.uri_template).collect::<Vec<_>>(),
            )
            .field("prompts", &self.prompts.iter().map(|(p, _)| &p.name).collect::<Vec<_>>())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// A session with a [`MemoryServer`].
#[derive(Debug)]
pub struct MemorySession {
    server: MemoryServer,
    closed: AtomicBool,
}

impl MemorySession {
    /// Open a session on `server`.
    pub fn new(server: MemoryServer) -> Self {
        server.stats.connects.fetch_add(1, Ordering::SeqCst);
        Self {
            server,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    async fn enter_call(&self, counter: &AtomicUsize) -> SessionResult<()> {
        self.ensure_open()?;
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.server.call_delay {
            tokio::time::sleep(delay).await;
            self.ensure_open()?;
        }
        Ok(())
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn list_tools(&self) -> SessionResult<Vec<Tool>> {
        self.ensure_open()?;
        self.server.listing(CapabilityKind::Tool, &self.server.tools)
    }

    async fn list_resources(&self) -> SessionResult<Vec<Resource>> {
        self.ensure_open()?;
        self.server
            .listing(CapabilityKind::Resource, &self.server.resources)
    }

    async fn list_resource_templates(&self) -> SessionResult<Vec<ResourceTemplate>> {
        self.ensure_open()?;
        self.server
            .listing(CapabilityKind::ResourceTemplate, &self.server.templates)
    }

    async fn list_prompts(&self) -> SessionResult<Vec<Prompt>> {
        self.ensure_open()?;
        self.server.listing(CapabilityKind::Prompt, &self.server.prompts)
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<ToolArguments>,
    ) -> SessionResult<ToolResult> {
        self.enter_call(&self.server.stats.tool_calls).await?;
        let (_, handler) = self
            .server
            .tools
            .iter()
            .find(|(tool, _)| tool.name == name)
            .ok_or_else(|| SessionError::remote(INVALID_PARAMS, format!("Unknown tool: {name}")))?;
        handler(arguments)
    }

    async fn read_resource(&self, uri: &str) -> SessionResult<ResourceResult> {
        self.enter_call(&self.server.stats.resource_reads).await?;
        if let Some((_, contents)) = self.server.resources.iter().find(|(r, _)| r.uri == uri) {
            return Ok(contents.clone());
        }
        for (template, handler) in &self.server.templates {
            if let Some(bound) = match_template(&template.uri_template, uri) {
                return handler(uri, &bound);
            }
        }
        Err(SessionError::remote(
            RESOURCE_NOT_FOUND,
            format!("Resource not found: {uri}"),
        ))
    }

    async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<PromptArguments>,
    ) -> SessionResult<PromptResult> {
        self.enter_call(&self.server.stats.prompt_gets).await?;
        let (prompt, handler) = self
            .server
            .prompts
            .iter()
            .find(|(prompt, _)| prompt.name == name)
            .ok_or_else(|| {
                SessionError::remote(INVALID_PARAMS, format!("Unknown prompt: {name}"))
            })?;

        let missing = prompt
            .required_arguments()
            .into_iter()
            .find(|required| !arguments.as_ref().is_some_and(|args| args.contains_key(*required)));
        if let Some(missing) = missing {
            return Err(SessionError::remote(
                INVALID_PARAMS,
                format!("Missing required argument '{missing}' for prompt '{name}'"),
            ));
        }
        handler(arguments)
    }

    async fn set_logging_level(&self, level: LogLevel) -> SessionResult<()> {
        self.ensure_open()?;
        if !self.server.logging {
            return Err(SessionError::Unsupported("logging/setLevel".into()));
        }
        *self.server.stats.logging_level.lock() = Some(level);
        Ok(())
    }

    async fn close(&self) -> SessionResult<()> {
        self.server.stats.closes.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        match &self.server.close_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

/// Connects backend names to registered [`MemoryServer`]s.
///
/// The descriptor's transport is ignored; only its name is looked up.
/// Unregistered names fail to connect.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    servers: HashMap<String, MemoryServer>,
    connect_delays: HashMap<String, Duration>,
}

impl MemoryConnector {
    /// Create a connector with no servers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `server` under a backend name.
    #[must_use]
    pub fn with_server(mut self, name: impl Into<String>, server: MemoryServer) -> Self {
        self.servers.insert(name.into(), server);
        self
    }

    /// Delay connecting to one backend.
    #[must_use]
    pub fn with_connect_delay(mut self, name: impl Into<String>, delay: Duration) -> Self {
        self.connect_delays.insert(name.into(), delay);
        self
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, descriptor: &BackendDescriptor) -> SessionResult<Arc<dyn Session>> {
        let name = descriptor.name();
        if let Some(delay) = self.connect_delays.get(name) {
            tokio::time::sleep(*delay).await;
        }
        let server = self.servers.get(name).ok_or_else(|| {
            SessionError::transport(format!("no in-process server registered as '{name}'"))
        })?;
        Ok(Arc::new(MemorySession::new(server.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendTransport;
    use multimcp_types::ResourceContent;
    use serde_json::json;

    fn inventory() -> MemoryServer {
        MemoryServer::new()
            .with_tool(Tool::new("add_item", "Add an item"), |args| {
                let name = args
                    .as_ref()
                    .and_then(|a| a.get("name"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("nothing")
                    .to_string();
                Ok(ToolResult::text(format!("added {name}")))
            })
            .with_resource(
                Resource::new("inventory://overview", "overview"),
                ResourceResult::text("inventory://overview", "3 items"),
            )
            .with_template(
                ResourceTemplate::new("inventory://item/{item_id}", "item"),
                |uri, bound| {
                    Ok(ResourceResult::new(vec![ResourceContent::text(
                        uri,
                        format!("item {}", bound["item_id"]),
                    )]))
                },
            )
            .with_prompt(
                Prompt::new("restock", "Restock advice").with_required_arg("item", "Item"),
                |args| {
                    let item = args.and_then(|a| a.get("item").cloned()).unwrap_or_default();
                    Ok(PromptResult::user(format!("Restock {item}?")))
                },
            )
    }

    #[tokio::test]
    async fn test_listings() {
        let session = MemorySession::new(inventory());
        assert_eq!(session.list_tools().await.unwrap()[0].name, "add_item");
        assert_eq!(session.list_resources().await.unwrap().len(), 1);
        assert_eq!(session.list_resource_templates().await.unwrap().len(), 1);
        assert_eq!(session.list_prompts().await.unwrap()[0].name, "restock");
    }

    #[tokio::test]
    async fn test_call_tool() {
        let session = MemorySession::new(inventory());
        let args = HashMap::from([("name".to_string(), json!("widget"))]);
        let result = session.call_tool("add_item", Some(args)).await.unwrap();
        assert_eq!(result.first_text(), Some("added widget"));

        let err = session.call_tool("nope", None).await.unwrap_err();
        assert!(matches!(err, SessionError::Remote { code: INVALID_PARAMS, .. }));
    }

    #[tokio::test]
    async fn test_read_resource_and_template() {
        let session = MemorySession::new(inventory());
        let direct = session.read_resource("inventory://overview").await.unwrap();
        assert_eq!(direct.first_text(), Some("3 items"));

        let templated = session.read_resource("inventory://item/42").await.unwrap();
        assert_eq!(templated.first_text(), Some("item 42"));
        assert_eq!(templated.contents[0].uri, "inventory://item/42");

        let err = session.read_resource("inventory://missing/x").await.unwrap_err();
        assert!(matches!(err, SessionError::Remote { code: RESOURCE_NOT_FOUND, .. }));
    }

    #[tokio::test]
    async fn test_prompt_required_arguments() {
        let session = MemorySession::new(inventory());
        let err = session.get_prompt("restock", None).await.unwrap_err();
        assert!(err.to_string().contains("Missing required argument 'item'"));

        let args = HashMap::from([("item".to_string(), "widgets".to_string())]);
        let result = session.get_prompt("restock", Some(args)).await.unwrap();
        assert_eq!(result.messages[0].content.as_text(), Some("Restock widgets?"));
    }

    #[tokio::test]
    async fn test_closed_session_refuses_calls() {
        let server = inventory();
        let stats = server.stats();
        let session = MemorySession::new(server);
        session.close().await.unwrap();

        assert_eq!(session.list_tools().await.unwrap_err(), SessionError::Closed);
        assert_eq!(session.call_tool("add_item", None).await.unwrap_err(), SessionError::Closed);
        assert_eq!(stats.closes(), 1);
        assert_eq!(stats.tool_calls(), 0);
    }

    #[tokio::test]
    async fn test_listing_error_injection() {
        let session = MemorySession::new(
            inventory().with_listing_error(CapabilityKind::Prompt, SessionError::transport("boom")),
        );
        assert!(session.list_prompts().await.is_err());
        assert!(session.list_tools().await.is_ok());
    }

    #[tokio::test]
    async fn test_logging_support() {
        let server = MemoryServer::new().with_logging();
        let stats = server.stats();
        let session = MemorySession::new(server);
        session.set_logging_level(LogLevel::Debug).await.unwrap();
        assert_eq!(stats.logging_level(), Some(LogLevel::Debug));

        let plain = MemorySession::new(MemoryServer::new());
        assert!(plain.set_logging_level(LogLevel::Debug).await.unwrap_err().is_unsupported());
    }

    #[tokio::test]
    async fn test_connector_lookup() {
        let connector = MemoryConnector::new().with_server("inventory", inventory());
        let known =
            BackendDescriptor::new("inventory", BackendTransport::stdio("python", ["x.py"]));
        let unknown = BackendDescriptor::new("other", BackendTransport::stdio("python", ["y.py"]));

        assert!(connector.connect(&known).await.is_ok());
        let err = connector.connect(&unknown).await.err().unwrap();
        assert!(err.to_string().contains("'other'"));
    }
}
