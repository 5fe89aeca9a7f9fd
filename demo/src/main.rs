//! Inventory demo: three in-process servers seen through one client.
//!
//! `tool_server` adds items, `resource_server` exposes the stock overview
//! and a per-item template, `prompt_server` offers a summary prompt. The
//! async client drives them first, then the blocking façade does the same
//! from plain threads.
//!
//! ```text
//! RUST_LOG=multimcp=debug cargo run -p multimcp-demo
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use multimcp::prelude::*;
use multimcp::session::INVALID_PARAMS;
use parking_lot::Mutex;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"{
    "mcpServers": {
        "tool_server": {"command": "python", "args": ["tool_server.py"]},
        "resource_server": {"command": "python", "args": ["resource_server.py"]},
        "prompt_server": {"command": "python", "args": ["prompt_server.py"]}
    }
}"#;

type Inventory = Arc<Mutex<Vec<String>>>;

fn connector(inventory: &Inventory) -> MemoryConnector {
    let added = Arc::clone(inventory);
    let tool_server = MemoryServer::new()
        .with_tool(
            Tool::new("add_item", "Add an item to the inventory").with_schema(
                ToolInputSchema::empty()
                    .with_property("name", json!({"type": "string"}))
                    .with_required("name"),
            ),
            move |args| {
                let name = args
                    .as_ref()
                    .and_then(|a| a.get("name"))
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| SessionError::remote(INVALID_PARAMS, "'name' is required"))?;
                added.lock().push(name.to_string());
                Ok(ToolResult::text(format!("Added {name}")))
            },
        )
        .with_logging();

    let listed = Arc::clone(inventory);
    let resource_server = MemoryServer::new()
        .with_resource(
            Resource::new("inventory://overview", "overview").with_mime_type("text/plain"),
            ResourceResult::text("inventory://overview", "see inventory://item/{index}"),
        )
        .with_template(
            ResourceTemplate::new("inventory://item/{index}", "item"),
            move |uri, bound| {
                let item = bound["index"]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| listed.lock().get(i).cloned())
                    .ok_or_else(|| {
                        SessionError::remote(-32002, format!("Resource not found: {uri}"))
                    })?;
                Ok(ResourceResult::new(vec![ResourceContent::text(uri, item)]))
            },
        );

    let prompt_server = MemoryServer::new().with_prompt(
        Prompt::new("inventory_summary", "Summarize the inventory")
            .with_optional_arg("tone", "Tone of the summary"),
        |args| {
            let tone = args
                .and_then(|a| a.get("tone").cloned())
                .unwrap_or_else(|| "neutral".to_string());
            Ok(PromptResult::user(format!(
                "Summarize the current inventory in a {tone} tone."
            )))
        },
    );

    MemoryConnector::new()
        .with_server("tool_server", tool_server)
        .with_server("resource_server", resource_server)
        .with_server("prompt_server", prompt_server)
}

fn item(name: &str) -> Option<ToolArguments> {
    Some(HashMap::from([("name".to_string(), json!(name))]))
}

async fn run_async(config: MultiServerConfig, inventory: &Inventory) -> anyhow::Result<()> {
    let client = MultiServerClient::builder(config)
        .connector(connector(inventory))
        .build()?;

    client
        .scoped(|client| async move {
            println!("{}", client.summary());

            for tool in client.list_tools() {
                info!(
                    tool = %tool.name,
                    owner = tool.meta_str(SERVER_NAME_META).unwrap_or("?"),
                    "catalog entry"
                );
            }

            let added = client.call_tool("add_item", item("widget")).await?;
            println!("add_item -> {}", added.first_text().unwrap_or_default());

            let missing = client.call_tool("restock", None).await?;
            println!("restock -> {}", missing.first_text().unwrap_or_default());

            let read = client.read_resource("resource_server:inventory://item/0").await?;
            println!("item 0 -> {}", read.first_text().unwrap_or_default());

            if let Err(err) = client.read_resource("inventory://overview").await {
                println!("bare uri -> {err}");
            }

            let prompt = client
                .get_prompt(
                    "inventory_summary",
                    Some(HashMap::from([("tone".to_string(), "cheerful".to_string())])),
                )
                .await?;
            if let Some(text) = prompt.messages.first().and_then(|m| m.content.as_text()) {
                println!("prompt -> {text}");
            }

            client.set_logging_level(LogLevel::Info).await;
            Ok::<_, anyhow::Error>(())
        })
        .await
}

fn run_blocking(config: MultiServerConfig, inventory: &Inventory) -> anyhow::Result<()> {
    let client = Arc::new(BlockingClient::connect(config, connector(inventory))?);

    let workers: Vec<_> = ["gadget", "sprocket"]
        .into_iter()
        .map(|name| {
            let client = Arc::clone(&client);
            std::thread::spawn(move || client.call_tool("add_item", item(name)))
        })
        .collect();
    for worker in workers {
        let result = worker
            .join()
            .map_err(|_| anyhow::anyhow!("worker thread panicked"))??;
        println!("blocking add_item -> {}", result.first_text().unwrap_or_default());
    }

    for resource in client.list_resource_templates() {
        println!("template {}", resource.uri_template);
    }

    for failure in client.shutdown() {
        println!("close failed: {failure}");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = MultiServerConfig::from_json_str(CONFIG)?;
    let inventory = Inventory::default();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run_async(config.clone(), &inventory))?;

    run_blocking(config, &inventory)?;
    println!("inventory: {}", inventory.lock().join(", "));
    Ok(())
}
