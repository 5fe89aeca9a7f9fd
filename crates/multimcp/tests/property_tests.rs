use multimcp::catalog::{Aggregation, BackendListing};
use multimcp::namespace::{self, ResourceTarget};
use multimcp_types::{Prompt, Resource, ResourceTemplate, Tool};
use proptest::prelude::*;

fn backend_name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_.-]{1,16}"
}

fn resource_uri() -> impl Strategy<Value = String> {
    ("[a-z][a-z0-9+.-]{0,8}", "(//)?[a-zA-Z0-9/_.:?=&-]{0,24}")
        .prop_map(|(scheme, rest)| format!("{scheme}:{rest}"))
}

fn listing() -> impl Strategy<Value = BackendListing> {
    (
        backend_name(),
        prop::collection::vec("[a-c]{1,2}", 0..4),
        prop::collection::vec(resource_uri(), 0..3),
        prop::collection::vec("[a-c]{1,2}", 0..3),
    )
        .prop_map(|(backend, tools, resources, prompts)| {
            BackendListing::new(
                backend,
                tools.iter().map(|t| Tool::new(t.as_str(), "")).collect(),
                resources.iter().map(|r| Resource::new(r.as_str(), "r")).collect(),
                resources
                    .iter()
                    .map(|r| ResourceTemplate::new(format!("{r}/{{id}}"), "t"))
                    .collect(),
                prompts.iter().map(|p| Prompt::new(p.as_str(), "")).collect(),
            )
        })
}

proptest! {
    #[test]
    fn namespace_round_trip(backend in backend_name(), uri in resource_uri()) {
        let encoded = namespace::encode(&backend, &uri);
        let decoded = namespace::decode(&encoded).unwrap();
        prop_assert_eq!(
            decoded,
            ResourceTarget::Namespaced { backend: backend.as_str(), uri: uri.as_str() }
        );
    }

    #[test]
    fn aggregation_is_deterministic(listings in prop::collection::vec(listing(), 0..5)) {
        let first = Aggregation::build(listings.clone());
        let second = Aggregation::build(listings);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn routes_point_at_last_provider(listings in prop::collection::vec(listing(), 1..5)) {
        let aggregation = Aggregation::build(listings.clone());
        for listing in &listings {
            for tool in listing.tools.as_ref().unwrap() {
                let last = listings
                    .iter()
                    .rev()
                    .find(|l| l.tools.as_ref().unwrap().iter().any(|t| t.name == tool.name))
                    .unwrap();
                prop_assert_eq!(
                    aggregation.routes.tool_owner(&tool.name),
                    Some(last.backend.as_str())
                );
            }
        }
    }

    #[test]
    fn catalog_preserves_backend_then_listing_order(
        listings in prop::collection::vec(listing(), 0..5)
    ) {
        let aggregation = Aggregation::build(listings.clone());
        let expected: Vec<(String, String)> = listings
            .iter()
            .flat_map(|l| {
                l.tools
                    .as_ref()
                    .unwrap()
                    .iter()
                    .map(|t| (l.backend.clone(), t.name.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        let actual: Vec<(String, String)> = aggregation
            .catalog
            .tools
            .iter()
            .map(|item| (item.owner().to_string(), item.key().to_string()))
            .collect();
        prop_assert_eq!(actual, expected);
    }
}
