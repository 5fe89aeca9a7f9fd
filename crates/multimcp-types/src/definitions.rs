//! The four item kinds a backend advertises: [`Tool`], [`Resource`],
//! [`ResourceTemplate`] and [`Prompt`].
//!
//! Fields the aggregation layer never reads (icons, titles, annotations)
//! are still modelled so a listed item survives the trip through the shared
//! catalog unchanged. The `_meta` map is reached through [`Extensible`],
//! which is how the catalog tags each item with the backend that owns it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Meta;
use crate::content::Annotations;

/// Icon attached to a listed item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Icon {
    /// URL or `data:` URI
    pub src: String,
    /// Image MIME type
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Size hints, e.g. `"48x48"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sizes: Option<Vec<String>>,
}

/// Read and write access to an item's `_meta` map.
pub trait Extensible {
    /// Current metadata.
    fn meta(&self) -> Option<&Meta>;

    /// Metadata slot, created on first insert.
    fn meta_mut(&mut self) -> &mut Option<Meta>;

    /// Set `key`, replacing any previous value.
    fn insert_meta(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.meta_mut()
            .get_or_insert_with(Meta::new)
            .insert(key.into(), value.into());
    }

    /// Owned form of [`Extensible::insert_meta`].
    #[must_use]
    fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self
    where
        Self: Sized,
    {
        self.insert_meta(key, value);
        self
    }

    /// Value stored under `key`.
    fn meta_value(&self, key: &str) -> Option<&Value> {
        self.meta().and_then(|meta| meta.get(key))
    }

    /// String stored under `key`; `None` for other JSON types.
    fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta_value(key).and_then(Value::as_str)
    }
}

macro_rules! impl_extensible {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Extensible for $ty {
                fn meta(&self) -> Option<&Meta> {
                    self.meta.as_ref()
                }

                fn meta_mut(&mut self) -> &mut Option<Meta> {
                    &mut self.meta
                }
            }
        )+
    };
}

impl_extensible!(Tool, Resource, ResourceTemplate, Prompt);

/// A tool as reported by `tools/list`.
///
/// Its `name` is the routing key: the catalog sends a bare `call_tool` to
/// whichever backend last listed a tool of that name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    /// Routing key
    pub name: String,
    /// Free-text description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Argument schema
    #[serde(rename = "inputSchema")]
    pub input_schema: ToolInputSchema,
    /// Display title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Display icons
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icons: Option<Vec<Icon>>,
    /// Behaviour hints, passed through untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
    /// Schema of `structuredContent` in the tool's results
    #[serde(rename = "outputSchema", skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    /// Carries `serverName` once the tool is in the shared catalog
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl Tool {
    /// A tool taking no arguments.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            ..Default::default()
        }
    }

    /// Replace the argument schema.
    #[must_use]
    pub fn with_schema(mut self, schema: ToolInputSchema) -> Self {
        self.input_schema = schema;
        self
    }
}

/// Object schema for a tool's arguments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolInputSchema {
    /// Always `"object"`
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Per-argument schemas keyed by name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
    /// Arguments the caller must supply
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Whether unlisted arguments are accepted
    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<bool>,
}

impl Default for ToolInputSchema {
    fn default() -> Self {
        Self {
            schema_type: "object".into(),
            properties: None,
            required: None,
            additional_properties: None,
        }
    }
}

impl ToolInputSchema {
    /// `{"type": "object"}` with no properties.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a backend-supplied schema. Anything that is not an object schema
    /// degrades to [`ToolInputSchema::empty`].
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    /// Declare one argument.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, schema: Value) -> Self {
        if let Value::Object(map) = self
            .properties
            .get_or_insert_with(|| Value::Object(serde_json::Map::new()))
        {
            map.insert(name.into(), schema);
        }
        self
    }

    /// Make an argument mandatory.
    #[must_use]
    pub fn with_required(mut self, name: impl Into<String>) -> Self {
        self.required.get_or_insert_with(Vec::new).push(name.into());
        self
    }
}

/// Behaviour hints a backend may attach to a tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolAnnotations {
    /// Does not modify its environment
    #[serde(rename = "readOnlyHint", skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    /// May destroy data
    #[serde(rename = "destructiveHint", skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    /// Repeat calls have no further effect
    #[serde(rename = "idempotentHint", skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
    /// Reaches outside the backend
    #[serde(rename = "openWorldHint", skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
    /// Display title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A concrete resource as reported by `resources/list`.
///
/// In the shared catalog `uri` is rewritten to `backend:uri` unless the
/// caller asks for raw URIs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    /// Address within the owning backend
    pub uri: String,
    /// Short identifier
    pub name: String,
    /// Free-text description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Display title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Display icons
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icons: Option<Vec<Icon>>,
    /// MIME type of what a read returns
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Audience and priority hints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Annotations>,
    /// Byte size, when the backend knows it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Carries `serverName` once the resource is in the shared catalog
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl Resource {
    /// A resource with only the required fields set.
    #[must_use]
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the MIME type.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// A parameterised family of resources (`resources/templates/list`).
///
/// Placeholders in `uri_template` follow RFC 6570; see
/// [`crate::template_variables`] and [`crate::match_template`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceTemplate {
    /// RFC 6570 template
    #[serde(rename = "uriTemplate")]
    pub uri_template: String,
    /// Short identifier
    pub name: String,
    /// Free-text description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Display title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Display icons
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icons: Option<Vec<Icon>>,
    /// MIME type shared by every expansion
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Audience and priority hints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Annotations>,
    /// Carries `serverName` once the template is in the shared catalog
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl ResourceTemplate {
    /// A template with only the required fields set.
    #[must_use]
    pub fn new(uri_template: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri_template: uri_template.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Placeholder names, first occurrence first.
    #[must_use]
    pub fn variables(&self) -> Vec<String> {
        crate::template_variables(&self.uri_template)
    }
}

/// A prompt as reported by `prompts/list`. Routed by `name`, like tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Prompt {
    /// Routing key
    pub name: String,
    /// Free-text description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Display title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Display icons
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icons: Option<Vec<Icon>>,
    /// Declared arguments, in order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<PromptArgument>>,
    /// Carries `serverName` once the prompt is in the shared catalog
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl Prompt {
    /// A prompt with no declared arguments.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            ..Default::default()
        }
    }

    fn with_argument(mut self, arg: PromptArgument) -> Self {
        self.arguments.get_or_insert_with(Vec::new).push(arg);
        self
    }

    /// Declare an argument the caller must supply.
    #[must_use]
    pub fn with_required_arg(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.with_argument(PromptArgument::required(name, description))
    }

    /// Declare an argument the caller may omit.
    #[must_use]
    pub fn with_optional_arg(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.with_argument(PromptArgument::optional(name, description))
    }

    /// Names of the arguments declared with `required: true`.
    #[must_use]
    pub fn required_arguments(&self) -> Vec<&str> {
        self.arguments
            .iter()
            .flatten()
            .filter(|arg| arg.required == Some(true))
            .map(|arg| arg.name.as_str())
            .collect()
    }
}

/// One declared prompt argument.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptArgument {
    /// Key in the caller's argument map
    pub name: String,
    /// Free-text description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Absent means optional
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

impl PromptArgument {
    /// `required: true`
    #[must_use]
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::declared(name, description, true)
    }

    /// `required: false`
    #[must_use]
    pub fn optional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::declared(name, description, false)
    }

    fn declared(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            required: Some(required),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_input_schema_properties() {
        let schema = ToolInputSchema::empty()
            .with_property("name", json!({"type": "string"}))
            .with_property("quantity", json!({"type": "integer"}))
            .with_required("name");

        let properties = schema.properties.as_ref().unwrap();
        assert_eq!(properties["name"]["type"], "string");
        assert_eq!(properties["quantity"]["type"], "integer");
        assert_eq!(schema.required, Some(vec!["name".to_string()]));
    }

    #[test]
    fn test_input_schema_from_invalid_value() {
        let schema = ToolInputSchema::from_value(json!("not a schema"));
        assert_eq!(schema, ToolInputSchema::empty());
    }

    #[test]
    fn test_meta_injection() {
        let mut resource = Resource::new("inventory://overview", "overview")
            .with_meta("origin", "warehouse");
        resource.insert_meta("serverName", "resource_server");

        assert_eq!(resource.meta_str("serverName"), Some("resource_server"));
        assert_eq!(resource.meta_str("origin"), Some("warehouse"));
        assert_eq!(resource.meta_str("missing"), None);
    }

    #[test]
    fn test_meta_overwrite() {
        let prompt = Prompt::new("summary", "Summarize")
            .with_meta("serverName", "a")
            .with_meta("serverName", "b");
        assert_eq!(prompt.meta_str("serverName"), Some("b"));
        assert_eq!(prompt.meta.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_prompt_required_arguments() {
        let prompt = Prompt::new("restock", "Restock advice")
            .with_required_arg("item", "Item name")
            .with_optional_arg("style", "Tone");

        assert_eq!(prompt.required_arguments(), vec!["item"]);
        assert_eq!(prompt.arguments.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_template_variables() {
        let template = ResourceTemplate::new("inventory://item/{item_id}", "item");
        assert_eq!(template.variables(), vec!["item_id"]);
    }

    #[test]
    fn test_template_serde_names() {
        let template = ResourceTemplate::new("inventory://item/{item_id}", "item")
            .with_meta("serverName", "resource_server");
        let json = serde_json::to_value(&template).unwrap();

        assert_eq!(json["uriTemplate"], "inventory://item/{item_id}");
        assert_eq!(json["_meta"]["serverName"], "resource_server");
        assert!(json.get("mimeType").is_none());
    }

    #[test]
    fn test_listed_tool_keeps_backend_hints() {
        let tool: Tool = serde_json::from_value(json!({
            "name": "add_item",
            "inputSchema": {"type": "object"},
            "annotations": {"readOnlyHint": false, "idempotentHint": true},
            "somethingNew": 1
        }))
        .unwrap();

        assert_eq!(tool.name, "add_item");
        assert!(tool.meta.is_none());
        let annotations = tool.annotations.as_ref().unwrap();
        assert_eq!(annotations.idempotent_hint, Some(true));
        let back = serde_json::to_value(&tool).unwrap();
        assert_eq!(back["annotations"]["readOnlyHint"], false);
    }
}
