//! Capability aggregation.
//!
//! [`aggregate`] asks every live backend for its tools, resources, resource
//! templates and prompts, then [`Aggregation::build`] merges the answers into
//! one [`CapabilityCatalog`] plus the [`RoutingTable`] derived from it.
//!
//! Backends are queried concurrently, but merging always walks them in the
//! order given (configuration order), and each backend's items keep the
//! order the backend reported. The result therefore depends only on the
//! listings, never on which backend answered first.

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use multimcp_types::{Extensible, Prompt, Resource, ResourceTemplate, Tool};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::manager::LiveBackend;
use crate::namespace;
use crate::router::{Collision, RoutingTable};
use crate::session::{SessionError, SessionResult};

/// `_meta` key naming the backend an item came from.
pub const SERVER_NAME_META: &str = "serverName";

/// The four capability kinds a backend can advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    /// Callable tool
    Tool,
    /// Readable resource
    Resource,
    /// Parameterized resource URI
    ResourceTemplate,
    /// Retrievable prompt
    Prompt,
}

impl CapabilityKind {
    /// Every kind, in catalog order.
    pub const ALL: [Self; 4] = [
        Self::Tool,
        Self::Resource,
        Self::ResourceTemplate,
        Self::Prompt,
    ];

    /// Human-readable singular name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tool => "tool",
            Self::Resource => "resource",
            Self::ResourceTemplate => "resource template",
            Self::Prompt => "prompt",
        }
    }

    /// Protocol method that lists this kind.
    pub fn list_method(self) -> &'static str {
        match self {
            Self::Tool => "tools/list",
            Self::Resource => "resources/list",
            Self::ResourceTemplate => "resources/templates/list",
            Self::Prompt => "prompts/list",
        }
    }

    /// Whether items of this kind are exposed under namespaced identifiers.
    pub fn is_namespaced(self) -> bool {
        matches!(self, Self::Resource | Self::ResourceTemplate)
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An item type that can appear in the catalog.
pub trait Capability: Clone + Extensible + Send + Sync + 'static {
    /// Which kind this is.
    const KIND: CapabilityKind;

    /// The identifying key: name for tools and prompts, URI (template) for
    /// resources.
    fn key(&self) -> &str;

    /// Mutable access to the identifying key.
    fn key_mut(&mut self) -> &mut String;
}

impl Capability for Tool {
    const KIND: CapabilityKind = CapabilityKind::Tool;

    fn key(&self) -> &str {
        &self.name
    }

    fn key_mut(&mut self) -> &mut String {
        &mut self.name
    }
}

impl Capability for Resource {
    const KIND: CapabilityKind = CapabilityKind::Resource;

    fn key(&self) -> &str {
        &self.uri
    }

    fn key_mut(&mut self) -> &mut String {
        &mut self.uri
    }
}

impl Capability for ResourceTemplate {
    const KIND: CapabilityKind = CapabilityKind::ResourceTemplate;

    fn key(&self) -> &str {
        &self.uri_template
    }

    fn key_mut(&mut self) -> &mut String {
        &mut self.uri_template
    }
}

impl Capability for Prompt {
    const KIND: CapabilityKind = CapabilityKind::Prompt;

    fn key(&self) -> &str {
        &self.name
    }

    fn key_mut(&mut self) -> &mut String {
        &mut self.name
    }
}

/// One item as reported by a backend, plus the owner annotation.
///
/// The wrapped item already carries `_meta.serverName`; resources and
/// templates also get their `backend:uri` identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityItem<T> {
    owner: String,
    namespaced: Option<String>,
    item: T,
}

impl<T: Capability> CapabilityItem<T> {
    /// Annotate `item` as owned by `owner`.
    pub fn new(owner: impl Into<String>, mut item: T) -> Self {
        let owner = owner.into();
        item.insert_meta(SERVER_NAME_META, owner.as_str());
        let namespaced = T::KIND
            .is_namespaced()
            .then(|| namespace::encode(&owner, item.key()));
        Self {
            owner,
            namespaced,
            item,
        }
    }

    /// Backend that reported the item.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Name or URI as the backend reported it.
    pub fn key(&self) -> &str {
        self.item.key()
    }

    /// `backend:uri` identifier (resources and templates only).
    pub fn namespaced_uri(&self) -> Option<&str> {
        self.namespaced.as_deref()
    }

    /// The annotated item.
    pub fn item(&self) -> &T {
        &self.item
    }

    /// A copy of the item for callers. With `use_namespace`, resources and
    /// templates report their namespaced identifier in place of the URI.
    pub fn annotated(&self, use_namespace: bool) -> T {
        let mut item = self.item.clone();
        if let (true, Some(namespaced)) = (use_namespace, &self.namespaced) {
            *item.key_mut() = namespaced.clone();
        }
        item
    }
}

/// The merged, ordered capability sequences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapabilityCatalog {
    /// Every tool, backend order then listing order
    pub tools: Vec<CapabilityItem<Tool>>,
    /// Every resource
    pub resources: Vec<CapabilityItem<Resource>>,
    /// Every resource template
    pub resource_templates: Vec<CapabilityItem<ResourceTemplate>>,
    /// Every prompt
    pub prompts: Vec<CapabilityItem<Prompt>>,
}

impl CapabilityCatalog {
    /// True when no backend contributed anything.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
            && self.resources.is_empty()
            && self.resource_templates.is_empty()
            && self.prompts.is_empty()
    }

    /// Number of items of one kind.
    pub fn count(&self, kind: CapabilityKind) -> usize {
        match kind {
            CapabilityKind::Tool => self.tools.len(),
            CapabilityKind::Resource => self.resources.len(),
            CapabilityKind::ResourceTemplate => self.resource_templates.len(),
            CapabilityKind::Prompt => self.prompts.len(),
        }
    }
}

/// What one backend advertised during the last aggregation.
///
/// A kind is `None` when the backend does not support it or its listing
/// failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendCapabilities {
    /// Backend name
    pub name: String,
    /// Tools as listed
    pub tools: Option<Vec<Tool>>,
    /// Resources as listed
    pub resources: Option<Vec<Resource>>,
    /// Resource templates as listed
    pub resource_templates: Option<Vec<ResourceTemplate>>,
    /// Prompts as listed
    pub prompts: Option<Vec<Prompt>>,
}

impl BackendCapabilities {
    /// Whether the backend listed at least one item of `kind`.
    pub fn provides(&self, kind: CapabilityKind) -> bool {
        match kind {
            CapabilityKind::Tool => self.tools.as_ref().is_some_and(|v| !v.is_empty()),
            CapabilityKind::Resource => self.resources.as_ref().is_some_and(|v| !v.is_empty()),
            CapabilityKind::ResourceTemplate => self
                .resource_templates
                .as_ref()
                .is_some_and(|v| !v.is_empty()),
            CapabilityKind::Prompt => self.prompts.as_ref().is_some_and(|v| !v.is_empty()),
        }
    }

    /// Whether the backend listed a tool with this name.
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools
            .iter()
            .flatten()
            .any(|tool| tool.name == name)
    }

    /// Whether the backend listed a prompt with this name.
    pub fn has_prompt(&self, name: &str) -> bool {
        self.prompts
            .iter()
            .flatten()
            .any(|prompt| prompt.name == name)
    }
}

/// A listing call that failed during aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingFailure {
    /// Backend name
    pub backend: String,
    /// Which listing failed
    pub kind: CapabilityKind,
    /// Failure cause
    pub cause: String,
}

impl fmt::Display for ListingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}s): {}", self.backend, self.kind, self.cause)
    }
}

/// Raw answers of one backend to the four listing calls.
#[derive(Debug, Clone)]
pub struct BackendListing {
    /// Backend name
    pub backend: String,
    /// `tools/list` answer
    pub tools: SessionResult<Vec<Tool>>,
    /// `resources/list` answer
    pub resources: SessionResult<Vec<Resource>>,
    /// `resources/templates/list` answer
    pub resource_templates: SessionResult<Vec<ResourceTemplate>>,
    /// `prompts/list` answer
    pub prompts: SessionResult<Vec<Prompt>>,
}

impl BackendListing {
    /// A backend that answered every listing successfully.
    pub fn new(
        backend: impl Into<String>,
        tools: Vec<Tool>,
        resources: Vec<Resource>,
        resource_templates: Vec<ResourceTemplate>,
        prompts: Vec<Prompt>,
    ) -> Self {
        Self {
            backend: backend.into(),
            tools: Ok(tools),
            resources: Ok(resources),
            resource_templates: Ok(resource_templates),
            prompts: Ok(prompts),
        }
    }
}

/// Output of one aggregation pass. Replaced wholesale, never patched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    /// Merged catalog
    pub catalog: CapabilityCatalog,
    /// Name routes derived from the catalog
    pub routes: RoutingTable,
    /// Per-backend listings, in backend order
    pub capabilities: Vec<BackendCapabilities>,
    /// Name collisions resolved by last-writer-wins
    pub collisions: Vec<Collision>,
    /// Listing calls that failed
    pub failures: Vec<ListingFailure>,
}

impl Aggregation {
    /// Merge listings in the order given.
    pub fn build(listings: Vec<BackendListing>) -> Self {
        let mut aggregation = Self::default();
        for listing in listings {
            let backend = listing.backend;
            let capabilities = BackendCapabilities {
                tools: aggregation.merge(&backend, listing.tools),
                resources: aggregation.merge(&backend, listing.resources),
                resource_templates: aggregation.merge(&backend, listing.resource_templates),
                prompts: aggregation.merge(&backend, listing.prompts),
                name: backend,
            };
            aggregation.capabilities.push(capabilities);
        }
        aggregation
    }

    fn merge<T>(&mut self, backend: &str, listed: SessionResult<Vec<T>>) -> Option<Vec<T>>
    where
        T: Capability,
        Self: Catalogue<T>,
    {
        let items = match listed {
            Ok(items) => items,
            Err(err) if err.is_unsupported() => {
                debug!(backend = %backend, kind = %T::KIND, "capability not supported");
                return None;
            }
            Err(err) => {
                self.record_failure(backend, T::KIND, &err);
                return None;
            }
        };

        for item in &items {
            if let Some(collision) = self.routes.insert(T::KIND, item.key(), backend) {
                self.collisions.push(collision);
            }
            let entry = CapabilityItem::new(backend, item.clone());
            <Self as Catalogue<T>>::items_mut(self).push(entry);
        }
        Some(items)
    }

    fn record_failure(&mut self, backend: &str, kind: CapabilityKind, err: &SessionError) {
        warn!(backend = %backend, kind = %kind, error = %err, "failed to list {}s", kind);
        self.failures.push(ListingFailure {
            backend: backend.to_string(),
            kind,
            cause: err.to_string(),
        });
    }

    /// Listings of one backend.
    pub fn capabilities_of(&self, backend: &str) -> Option<&BackendCapabilities> {
        self.capabilities.iter().find(|c| c.name == backend)
    }
}

/// Access to the catalog sequence holding `T`.
pub(crate) trait Catalogue<T> {
    /// Mutable sequence for `T`.
    fn items_mut(&mut self) -> &mut Vec<CapabilityItem<T>>;
}

macro_rules! impl_catalogue {
    ($($ty:ty => $field:ident),+ $(,)?) => {
        $(
            impl Catalogue<$ty> for Aggregation {
                fn items_mut(&mut self) -> &mut Vec<CapabilityItem<$ty>> {
                    &mut self.catalog.$field
                }
            }
        )+
    };
}

impl_catalogue!(
    Tool => tools,
    Resource => resources,
    ResourceTemplate => resource_templates,
    Prompt => prompts,
);

/// Query every backend concurrently and merge the answers in slice order.
///
/// ```
/// # tokio_test::block_on(async {
/// use std::sync::Arc;
/// use multimcp::catalog::aggregate;
/// use multimcp::memory::{MemoryServer, MemorySession};
/// use multimcp::{BackendDescriptor, BackendTransport, LiveBackend};
/// use multimcp_types::{Tool, ToolResult};
///
/// let server = MemoryServer::new().with_tool(Tool::new("add_item", ""), |_| {
///     Ok(ToolResult::text("added"))
/// });
/// let backend = Arc::new(LiveBackend::new(
///     BackendDescriptor::new(
///         "tool_server",
///         BackendTransport::stdio("python", ["tool_server.py"]),
///     ),
///     Arc::new(MemorySession::new(server)),
/// ));
///
/// let aggregation = aggregate(&[backend]).await;
/// assert_eq!(aggregation.routes.tool_owner("add_item"), Some("tool_server"));
/// # });
/// ```
pub async fn aggregate(backends: &[Arc<LiveBackend>]) -> Aggregation {
    let listings = join_all(backends.iter().map(|backend| list_backend(backend))).await;
    let aggregation = Aggregation::build(listings);
    info!(
        backends = backends.len(),
        tools = aggregation.catalog.tools.len(),
        resources = aggregation.catalog.resources.len(),
        resource_templates = aggregation.catalog.resource_templates.len(),
        prompts = aggregation.catalog.prompts.len(),
        collisions = aggregation.collisions.len(),
        "aggregated capabilities"
    );
    aggregation
}

async fn list_backend(backend: &LiveBackend) -> BackendListing {
    let session = backend.session();
    let (tools, resources, resource_templates, prompts) = tokio::join!(
        session.list_tools(),
        session.list_resources(),
        session.list_resource_templates(),
        session.list_prompts(),
    );
    BackendListing {
        backend: backend.name().to_string(),
        tools,
        resources,
        resource_templates,
        prompts,
    }
}

/// Human-readable overview of the connected backends and their catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogSummary {
    /// One entry per aggregated backend
    pub backends: Vec<BackendSummary>,
    /// Name collisions
    pub collisions: Vec<Collision>,
    /// Listing failures
    pub listing_failures: Vec<ListingFailure>,
    /// Backends that failed to connect, as `name: cause`
    pub connection_failures: Vec<String>,
}

/// Item names one backend contributed; `None` for unsupported kinds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackendSummary {
    /// Backend name
    pub name: String,
    /// Whether the backend is still connected
    pub live: bool,
    /// Tool names
    pub tools: Option<Vec<String>>,
    /// Namespaced resource identifiers
    pub resources: Option<Vec<String>>,
    /// Namespaced resource templates
    pub resource_templates: Option<Vec<String>>,
    /// Prompt names
    pub prompts: Option<Vec<String>>,
}

impl CatalogSummary {
    /// Summarise an aggregation. `is_live` reports whether a backend is
    /// still connected.
    pub fn new(aggregation: &Aggregation, is_live: impl Fn(&str) -> bool) -> Self {
        let backends = aggregation
            .capabilities
            .iter()
            .map(|caps| {
                let namespaced = |uri: &str| namespace::encode(&caps.name, uri);
                BackendSummary {
                    name: caps.name.clone(),
                    live: is_live(&caps.name),
                    tools: caps
                        .tools
                        .as_ref()
                        .map(|v| v.iter().map(|t| t.name.clone()).collect()),
                    resources: caps
                        .resources
                        .as_ref()
                        .map(|v| v.iter().map(|r| namespaced(&r.uri)).collect()),
                    resource_templates: caps
                        .resource_templates
                        .as_ref()
                        .map(|v| v.iter().map(|t| namespaced(&t.uri_template)).collect()),
                    prompts: caps
                        .prompts
                        .as_ref()
                        .map(|v| v.iter().map(|p| p.name.clone()).collect()),
                }
            })
            .collect();

        Self {
            backends,
            collisions: aggregation.collisions.clone(),
            listing_failures: aggregation.failures.clone(),
            connection_failures: Vec::new(),
        }
    }
}

fn write_names(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    names: Option<&Vec<String>>,
) -> fmt::Result {
    match names {
        None => writeln!(f, "  {label}: not provided"),
        Some(names) if names.is_empty() => writeln!(f, "  {label}: none"),
        Some(names) => writeln!(f, "  {label} ({}): {}", names.len(), names.join(", ")),
    }
}

impl fmt::Display for CatalogSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} backend(s)", self.backends.len())?;
        for backend in &self.backends {
            let state = if backend.live { "" } else { " [unavailable]" };
            writeln!(f, "{}{state}", backend.name)?;
            write_names(f, "tools", backend.tools.as_ref())?;
            write_names(f, "resources", backend.resources.as_ref())?;
            write_names(f, "resource templates", backend.resource_templates.as_ref())?;
            write_names(f, "prompts", backend.prompts.as_ref())?;
        }
        if !self.collisions.is_empty() {
            writeln!(f, "collisions:")?;
            for collision in &self.collisions {
                writeln!(f, "  {collision}")?;
            }
        }
        if !self.listing_failures.is_empty() {
            writeln!(f, "listing failures:")?;
            for failure in &self.listing_failures {
                writeln!(f, "  {failure}")?;
            }
        }
        if !self.connection_failures.is_empty() {
            writeln!(f, "connection failures:")?;
            for failure in &self.connection_failures {
                writeln!(f, "  {failure}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::METHOD_NOT_FOUND;
    use pretty_assertions::assert_eq;

    fn listing(backend: &str, tools: &[&str], prompts: &[&str]) -> BackendListing {
        BackendListing::new(
            backend,
            tools.iter().map(|t| Tool::new(*t, "")).collect(),
            vec![Resource::new("inventory://overview", "overview")],
            vec![ResourceTemplate::new("inventory://item/{id}", "item")],
            prompts.iter().map(|p| Prompt::new(*p, "")).collect(),
        )
    }

    #[test]
    fn test_order_and_owner_annotation() {
        let agg = Aggregation::build(vec![
            listing("a", &["add_item", "remove_item"], &[]),
            listing("b", &["list_items"], &["summary"]),
        ]);

        let tools: Vec<_> = agg
            .catalog
            .tools
            .iter()
            .map(|t| (t.owner(), t.key()))
            .collect();
        assert_eq!(
            tools,
            vec![("a", "add_item"), ("a", "remove_item"), ("b", "list_items")]
        );
        assert_eq!(agg.catalog.tools[2].item().meta_str(SERVER_NAME_META), Some("b"));
        assert_eq!(agg.routes.route_prompt("summary").unwrap(), "b");
    }

    #[test]
    fn test_resources_are_namespaced_not_routed() {
        let agg = Aggregation::build(vec![listing("a", &[], &[]), listing("b", &[], &[])]);

        assert_eq!(agg.catalog.resources.len(), 2);
        assert_eq!(
            agg.catalog.resources[1].namespaced_uri(),
            Some("b:inventory://overview")
        );
        assert!(agg.collisions.is_empty());

        let plain = agg.catalog.resource_templates[0].annotated(false);
        let namespaced = agg.catalog.resource_templates[0].annotated(true);
        assert_eq!(plain.uri_template, "inventory://item/{id}");
        assert_eq!(namespaced.uri_template, "a:inventory://item/{id}");
        assert_eq!(namespaced.meta_str(SERVER_NAME_META), Some("a"));
    }

    #[test]
    fn test_collision_last_writer_wins() {
        let agg = Aggregation::build(vec![listing("a", &["x"], &[]), listing("b", &["x"], &[])]);

        assert_eq!(agg.routes.route_tool("x").unwrap(), "b");
        assert_eq!(agg.catalog.tools.len(), 2);
        assert_eq!(agg.collisions.len(), 1);
        assert_eq!(agg.collisions[0].discarded, "a");
    }

    #[test]
    fn test_listing_failure_is_isolated() {
        let mut broken = listing("a", &["x"], &["p"]);
        broken.tools = Err(SessionError::transport("broken pipe"));
        broken.prompts = Err(SessionError::remote(METHOD_NOT_FOUND, "no prompts"));

        let agg = Aggregation::build(vec![broken, listing("b", &["y"], &[])]);

        assert_eq!(agg.catalog.tools.len(), 1);
        assert_eq!(agg.catalog.resources.len(), 2);
        assert_eq!(agg.failures.len(), 1);
        assert_eq!(agg.failures[0].kind, CapabilityKind::Tool);

        let caps = agg.capabilities_of("a").unwrap();
        assert!(caps.tools.is_none());
        assert!(caps.prompts.is_none());
        assert!(caps.provides(CapabilityKind::Resource));
    }

    #[test]
    fn test_build_is_deterministic() {
        let input = || {
            vec![
                listing("a", &["x", "y"], &["p"]),
                listing("b", &["x"], &["p", "q"]),
            ]
        };
        assert_eq!(Aggregation::build(input()), Aggregation::build(input()));
    }

    #[test]
    fn test_summary_display() {
        let mut failing = listing("b", &[], &[]);
        failing.prompts = Err(SessionError::Unsupported("prompts/list".into()));
        let agg = Aggregation::build(vec![listing("a", &["x"], &[]), failing]);
        let summary = CatalogSummary::new(&agg, |name| name == "a");
        let text = summary.to_string();

        assert!(text.starts_with("2 backend(s)\n"));
        assert!(text.contains("a\n  tools (1): x\n"));
        assert!(text.contains("  resources (1): a:inventory://overview\n"));
        assert!(text.contains("b [unavailable]\n"));
        assert!(text.contains("  prompts: not provided\n"));
    }
}
