//! What the three routed operations return: [`ToolResult`] for
//! `tools/call`, [`ResourceResult`] for `resources/read` and
//! [`PromptResult`] for `prompts/get`.
//!
//! The orchestration layer passes backend results through unchanged. It
//! builds a `ToolResult` itself only to report a routing failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Meta;
use crate::content::{Content, Message};

/// Outcome of a tool call.
///
/// A failed call is still `Ok(ToolResult)`, flagged with `isError`; check
/// [`ToolResult::is_error`] before trusting the content.
///
/// # Examples
///
/// ```
/// use multimcp_types::ToolResult;
///
/// let result = ToolResult::text("Added 3 widgets");
/// assert!(!result.is_error());
///
/// let error = ToolResult::error("Unknown tool: restock");
/// assert!(error.is_error());
/// assert_eq!(error.first_text(), Some("Unknown tool: restock"));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    /// Blocks in backend order
    pub content: Vec<Content>,
    /// Absent means success
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
    /// Machine-readable payload matching the tool's output schema
    #[serde(rename = "structuredContent", skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    /// `errorKind` for failures produced by routing
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl ToolResult {
    /// A successful single-block result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            ..Default::default()
        }
    }

    /// A failed result whose only block is `message`.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            is_error: Some(true),
            ..Self::text(message)
        }
    }

    /// `isError`, treating an absent flag as `false`.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.is_error == Some(true)
    }

    /// Set one `_meta` key.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta
            .get_or_insert_with(Meta::new)
            .insert(key.into(), value.into());
        self
    }

    /// Text of the first block, when that block is text.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().and_then(Content::as_text)
    }
}

/// Outcome of a resource read.
///
/// ```
/// use multimcp_types::ResourceResult;
///
/// let result = ResourceResult::text("inventory://overview", "3 items in stock");
/// assert_eq!(result.first_text(), Some("3 items in stock"));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceResult {
    /// One entry per part
    pub contents: Vec<ResourceContent>,
    /// Backend-defined extras
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl ResourceResult {
    /// A single `text/plain` part.
    #[must_use]
    pub fn text(uri: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(vec![ResourceContent::text(uri, content)])
    }

    /// Wrap already-built parts.
    #[must_use]
    pub fn new(contents: Vec<ResourceContent>) -> Self {
        Self {
            contents,
            meta: None,
        }
    }

    /// Text of the first part, if it has any.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.contents.first().and_then(|c| c.text.as_deref())
    }
}

/// One part of a resource read. Exactly one of `text` and `blob` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceContent {
    /// URI as the backend knows it
    pub uri: String,
    /// MIME type of the body
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Textual body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Base64 body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

impl ResourceContent {
    /// A `text/plain` part.
    #[must_use]
    pub fn text(uri: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: Some("text/plain".into()),
            text: Some(content.into()),
            blob: None,
        }
    }
}

/// A rendered prompt.
///
/// ```
/// use multimcp_types::PromptResult;
///
/// let result = PromptResult::user("Which items need restocking?")
///     .with_description("Restock advice");
/// assert_eq!(result.len(), 1);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PromptResult {
    /// Free-text description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Turns in order
    pub messages: Vec<Message>,
    /// Backend-defined extras
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl PromptResult {
    /// Wrap already-built messages.
    #[must_use]
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            description: None,
            messages,
            meta: None,
        }
    }

    /// A prompt consisting of one user turn.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(vec![Message::user(text)])
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// `true` when there are no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }
}
