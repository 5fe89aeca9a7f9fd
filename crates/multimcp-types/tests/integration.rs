use multimcp_types::{
    Extensible, LogLevel, Prompt, PromptResult, Resource, ResourceTemplate, Tool, ToolInputSchema,
    ToolResult, expand_template, template_variables,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashMap;

#[test]
fn test_tool_listing_payload_roundtrip() {
    let listing = json!([
        {
            "name": "add_item",
            "description": "Add an item",
            "inputSchema": {
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "required": ["name"]
            },
            "_meta": {"vendor": {"tier": 2}}
        },
        {"name": "list_items", "inputSchema": {"type": "object"}}
    ]);

    let tools: Vec<Tool> = serde_json::from_value(listing.clone()).unwrap();
    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0].meta_value("vendor"), Some(&json!({"tier": 2})));
    assert_eq!(tools[0].input_schema.required, Some(vec!["name".to_string()]));
    assert_eq!(serde_json::to_value(&tools).unwrap(), listing);
}

#[test]
fn test_schema_builder_matches_wire() {
    let tool = Tool::new("add_item", "Add an item").with_schema(
        ToolInputSchema::empty()
            .with_property("name", json!({"type": "string"}))
            .with_required("name"),
    );

    let json = serde_json::to_value(&tool).unwrap();
    assert_eq!(json["inputSchema"]["properties"]["name"]["type"], "string");
    assert_eq!(json["inputSchema"]["required"], json!(["name"]));
}

#[test]
fn test_result_builders() {
    assert!(!ToolResult::text("Hello").is_error());
    assert!(ToolResult::error("Failure").is_error());
    assert_eq!(PromptResult::user("Hi").len(), 1);
}

#[test]
fn test_meta_passthrough_preserved_when_injecting() {
    let resource: Resource = serde_json::from_value(json!({
        "uri": "inventory://overview",
        "name": "overview",
        "_meta": {"etag": "abc"}
    }))
    .unwrap();

    let annotated = resource.with_meta("serverName", "resource_server");
    assert_eq!(annotated.meta_str("etag"), Some("abc"));
    assert_eq!(annotated.meta_str("serverName"), Some("resource_server"));
}

#[test]
fn test_template_helpers_on_namespaced_template() {
    let template = ResourceTemplate::new("resource_server:inventory://item/{item_id}", "item");
    assert_eq!(template.variables(), vec!["item_id"]);
    assert_eq!(template_variables(&template.uri_template), template.variables());

    let values = HashMap::from([("item_id".to_string(), "9".to_string())]);
    assert_eq!(
        expand_template(&template.uri_template, &values),
        "resource_server:inventory://item/9"
    );
}

#[test]
fn test_prompt_with_meta() {
    let prompt = Prompt::new("restock", "Restock advice")
        .with_required_arg("item", "Item name")
        .with_meta("serverName", "prompt_server");
    let json = serde_json::to_value(&prompt).unwrap();
    assert_eq!(json["arguments"][0]["required"], true);
    assert_eq!(json["_meta"]["serverName"], "prompt_server");
}

#[test]
fn test_log_level_display_matches_wire() {
    for level in LogLevel::ALL {
        assert_eq!(
            serde_json::to_value(level).unwrap(),
            json!(level.to_string())
        );
    }
}
