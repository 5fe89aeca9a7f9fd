//! Content blocks carried by tool results, prompt messages and embedded
//! resources.
//!
//! Backends may return any block kind; the orchestration layer only reads
//! text and forwards the rest unchanged.

use serde::{Deserialize, Serialize};

use crate::Meta;
use crate::definitions::Resource;

/// Speaker of a prompt message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The client side
    #[default]
    User,
    /// The model side
    Assistant,
}

/// One content block. The variant is the `type` tag on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Content {
    /// `"text"`
    #[serde(rename = "text")]
    Text(TextContent),
    /// `"image"`
    #[serde(rename = "image")]
    Image(MediaContent),
    /// `"audio"`
    #[serde(rename = "audio")]
    Audio(MediaContent),
    /// `"resource_link"`: a listed resource referenced by URI
    #[serde(rename = "resource_link")]
    ResourceLink(Resource),
    /// `"resource"`: resource contents inlined into the block
    #[serde(rename = "resource")]
    Resource(EmbeddedResource),
}

impl Content {
    /// A plain text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextContent::new(text))
    }

    /// The text of a text block; `None` for every other kind.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(&t.text),
            _ => None,
        }
    }
}

/// A `"text"` block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextContent {
    /// The text
    pub text: String,
    /// Audience and priority hints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Annotations>,
    /// Backend-defined extras
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl TextContent {
    /// A block without annotations or metadata.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            annotations: None,
            meta: None,
        }
    }
}

/// Payload of an `"image"` or `"audio"` block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaContent {
    /// Base64 bytes
    pub data: String,
    /// MIME type of `data`
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Audience and priority hints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Annotations>,
    /// Backend-defined extras
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// Payload of a `"resource"` block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedResource {
    /// The inlined contents
    pub resource: ResourceContents,
    /// Audience and priority hints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Annotations>,
    /// Backend-defined extras
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// Inlined resource contents; the variant is inferred from `text` or `blob`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ResourceContents {
    /// Contents with a `text` field
    Text {
        /// Resource URI
        uri: String,
        /// MIME type
        #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        /// The text
        text: String,
    },
    /// Contents with a base64 `blob` field
    Blob {
        /// Resource URI
        uri: String,
        /// MIME type
        #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        /// Base64 bytes
        blob: String,
    },
}

impl ResourceContents {
    /// URI of either variant.
    #[must_use]
    pub fn uri(&self) -> &str {
        match self {
            Self::Text { uri, .. } | Self::Blob { uri, .. } => uri,
        }
    }
}

/// Audience and priority hints, shared by content blocks and listed
/// resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Annotations {
    /// Intended readers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<Vec<Role>>,
    /// 0.0 (lowest) to 1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,
    /// ISO 8601 timestamp
    #[serde(rename = "lastModified", skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

/// One turn of a rendered prompt. `content` is a single block, not a list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Speaker
    pub role: Role,
    /// Body
    pub content: Content,
}

impl Message {
    /// A message with an arbitrary content block.
    #[must_use]
    pub fn new(role: Role, content: Content) -> Self {
        Self { role, content }
    }

    /// A user turn holding one text block.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, Content::text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_text_wire_shape() {
        let json = serde_json::to_value(Content::text("Hello")).unwrap();
        assert_eq!(json, json!({"type": "text", "text": "Hello"}));
    }

    #[test]
    fn test_backend_content_kinds_round_trip() {
        let blocks = json!([
            {"type": "image", "data": "AAEC", "mimeType": "image/png"},
            {"type": "audio", "data": "AAEC", "mimeType": "audio/wav"},
            {"type": "resource_link", "uri": "inventory://overview", "name": "overview"}
        ]);
        let parsed: Vec<Content> = serde_json::from_value(blocks.clone()).unwrap();

        assert!(matches!(parsed[0], Content::Image(_)));
        assert!(matches!(parsed[1], Content::Audio(_)));
        let Content::ResourceLink(link) = &parsed[2] else {
            panic!("expected resource link");
        };
        assert_eq!(link.name, "overview");
        assert!(link.meta.is_none());
        assert!(parsed.iter().all(|c| c.as_text().is_none()));
        assert_eq!(serde_json::to_value(&parsed).unwrap(), blocks);
    }

    #[test]
    fn test_embedded_resource_untagged_contents() {
        let parsed: Content = serde_json::from_value(json!({
            "type": "resource",
            "resource": {
                "uri": "inventory://blob",
                "blob": "AAEC",
                "mimeType": "application/octet-stream"
            }
        }))
        .unwrap();

        let Content::Resource(embedded) = parsed else {
            panic!("expected embedded resource");
        };
        assert_eq!(embedded.resource.uri(), "inventory://blob");
        assert!(matches!(embedded.resource, ResourceContents::Blob { .. }));
    }

    #[test]
    fn test_message_wire_shape() {
        let json = serde_json::to_value(Message::user("Hi")).unwrap();
        assert_eq!(json, json!({"role": "user", "content": {"type": "text", "text": "Hi"}}));

        let assistant: Message = serde_json::from_value(json!({
            "role": "assistant",
            "content": {"type": "text", "text": "Hello"}
        }))
        .unwrap();
        assert_eq!(assistant.role, Role::Assistant);
    }
}
