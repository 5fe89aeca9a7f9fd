//! Shared fixtures: an inventory deployment split across three backends.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use multimcp::prelude::*;
use multimcp::session::INVALID_PARAMS;
use serde_json::json;

pub const TOOL_SERVER: &str = "tool_server";
pub const RESOURCE_SERVER: &str = "resource_server";
pub const PROMPT_SERVER: &str = "prompt_server";

/// Route engine logs through the test harness; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn config(names: &[&str]) -> MultiServerConfig {
    MultiServerConfig::new(
        names
            .iter()
            .map(|name| {
                BackendDescriptor::new(
                    *name,
                    BackendTransport::stdio("python", [format!("{name}.py")]),
                )
            })
            .collect(),
    )
    .expect("valid config")
}

pub fn add_item_server() -> MemoryServer {
    MemoryServer::new().with_tool(
        Tool::new("add_item", "Add an item to the inventory").with_schema(
            ToolInputSchema::empty()
                .with_property("name", json!({"type": "string"}))
                .with_required("name"),
        ),
        |args| {
            let name = args
                .as_ref()
                .and_then(|a| a.get("name"))
                .and_then(|v| v.as_str())
                .ok_or_else(|| SessionError::remote(INVALID_PARAMS, "missing 'name'"))?
                .to_string();
            Ok(ToolResult::text(format!("Added {name}")))
        },
    )
}

pub fn list_items_server() -> MemoryServer {
    MemoryServer::new().with_tool(Tool::new("list_items", "List the inventory"), |_| {
        Ok(ToolResult::text("widget, gadget"))
    })
}

pub fn resource_server() -> MemoryServer {
    MemoryServer::new()
        .with_resource(
            Resource::new("inventory://overview", "overview").with_mime_type("text/plain"),
            ResourceResult::text("inventory://overview", "2 items in stock"),
        )
        .with_template(
            ResourceTemplate::new("inventory://item/{item_id}", "item"),
            |uri, bound| {
                Ok(ResourceResult::new(vec![ResourceContent::text(
                    uri,
                    format!("item #{}", bound["item_id"]),
                )]))
            },
        )
}

pub fn prompt_server() -> MemoryServer {
    MemoryServer::new()
        .with_prompt(
            Prompt::new("inventory_summary", "Summarize the inventory")
                .with_required_arg("tone", "Tone of the summary"),
            |args| {
                let tone = args.and_then(|a| a.get("tone").cloned()).unwrap_or_default();
                Ok(PromptResult::user(format!("Summarize the inventory in a {tone} tone")))
            },
        )
        .with_logging()
}

pub fn args(pairs: &[(&str, serde_json::Value)]) -> ToolArguments {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

pub fn prompt_args(pairs: &[(&str, &str)]) -> PromptArguments {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect::<HashMap<_, _>>()
}

pub fn client_for(
    config: MultiServerConfig,
    connector: impl Connector + 'static,
) -> MultiServerClient {
    MultiServerClient::builder(config)
        .connector(connector)
        .build()
        .expect("client builds")
}

/// A connector that always fails and counts attempts.
#[derive(Debug, Default)]
pub struct FailingConnector {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl Connector for FailingConnector {
    async fn connect(&self, descriptor: &BackendDescriptor) -> SessionResult<Arc<dyn Session>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(SessionError::transport(format!(
            "cannot spawn {}",
            descriptor.name()
        )))
    }
}
