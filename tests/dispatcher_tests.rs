//! Tests for routing, fault isolation and fan-out
//!
//! # Test Coverage
//!
//! - Root, child and unknown-path routing outcomes (200 / 404)
//! - Render failures and panics contained at the faulting node (500)
//! - Fan-out multi-dispatch (207 + JSON array) and branch isolation
//! - Explicit-path dispatch, per-call instance ids, custom routing field
//! - Concurrent dispatch against one shared tree

mod common;

use common::{frame_tree, routed};
use dynform::handler::{Declaration, Handler, HandlerTree, RenderContext};
use dynform::runtime_config::DispatchConfig;
use dynform::server::response::content_type;
use dynform::server::Request;
use dynform::{FieldValue, HandlerFault};
use http::StatusCode;
use std::sync::Arc;

#[test]
fn test_empty_routing_renders_root() {
    let tree = frame_tree();
    for request in [Request::new(), routed(""), routed("root")] {
        let response = tree.dispatch(request);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            response.content,
            "<html><body><div id=\"root.content\"></div></body></html>"
        );
    }
}

#[test]
fn test_child_renders_its_own_output() {
    let response = frame_tree().dispatch(routed("root.content"));
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content, "<data></data>");
}

#[test]
fn test_leading_empty_segment_matches_root() {
    let response = frame_tree().dispatch(routed(".content"));
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content, "<data></data>");
}

#[test]
fn test_render_error_becomes_internal_error() {
    let response = frame_tree().dispatch(routed("root.exceptionThrower"));
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.content, "Internal Server Error: Error");
}

#[test]
fn test_unknown_root_segment_is_not_found() {
    let response = frame_tree().dispatch(routed("nonExistent"));
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.content, "Error: nonExistent was not found.");
}

#[test]
fn test_unknown_child_reports_full_routing_value() {
    let tree = frame_tree();

    let response = tree.dispatch(routed("root.nonExistent"));
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.content, "Error: root.nonExistent was not found.");

    let response = tree.dispatch(routed("root.content.deeper"));
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.content, "Error: root.content.deeper was not found.");
}

#[test]
fn test_intermediate_levels_cannot_be_skipped() {
    let response = frame_tree().dispatch(routed("content"));
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.content, "Error: content was not found.");
}

#[test]
fn test_fan_out_returns_multi_status() {
    let tree = frame_tree();
    let request = Request::builder()
        .field("requestHandler", vec!["root.content", "root.exceptionThrower"])
        .build();
    let response = tree.dispatch(request);

    assert_eq!(response.status, StatusCode::MULTI_STATUS);
    assert_eq!(response.content_type, content_type::JSON);
    let branches: serde_json::Value = serde_json::from_str(&response.content).unwrap();
    assert_eq!(
        branches,
        serde_json::json!([
            {
                "responseText": "<data></data>",
                "contentType": content_type::HTML,
                "status": 200
            },
            {
                "responseText": "Internal Server Error: Error",
                "contentType": content_type::HTML,
                "status": 500
            }
        ])
    );
}

#[test]
fn test_fan_out_of_nothing_is_empty_array() {
    let request = Request::builder()
        .field("requestHandler", Vec::<String>::new())
        .build();
    let response = frame_tree().dispatch(request);
    assert_eq!(response.status, StatusCode::MULTI_STATUS);
    assert_eq!(response.content, "[]");
}

fn echo_tree() -> HandlerTree {
    let root = Declaration::from_fn("Root", |_| Ok(String::new())).child(Declaration::from_fn(
        "Echo",
        |ctx| {
            let request = ctx.request();
            Ok(format!(
                "{}|{}|{}",
                request.fields.get_str("requestHandler"),
                request.fields.get_str("shared"),
                request.dispatch_id
            ))
        },
    ));
    HandlerTree::build(&root).unwrap()
}

#[test]
fn test_fan_out_branches_get_private_requests() {
    let tree = echo_tree();
    let request = Request::builder()
        .field("requestHandler", vec!["root.echo", "root.echo", "root.missing"])
        .field("shared", "kept")
        .build();
    let parent_id = request.dispatch_id.to_string();
    let response = tree.dispatch(request);

    let branches: Vec<serde_json::Value> = serde_json::from_str(&response.content).unwrap();
    assert_eq!(branches.len(), 3);

    let first = branches[0]["responseText"].as_str().unwrap();
    let second = branches[1]["responseText"].as_str().unwrap();
    let first_parts: Vec<&str> = first.split('|').collect();
    let second_parts: Vec<&str> = second.split('|').collect();

    // each branch sees a scalar routing value, not the original list
    assert_eq!(first_parts[0], "root.echo");
    assert_eq!(first_parts[1], "kept");
    assert_ne!(first_parts[2], parent_id);
    assert_ne!(first_parts[2], second_parts[2]);

    assert_eq!(branches[2]["status"], 404);
    assert_eq!(branches[2]["responseText"], "Error: root.missing was not found.");
}

#[test]
fn test_dispatch_path_ignores_routing_field_for_resolution() {
    let tree = frame_tree();

    let response = tree.dispatch_path(routed("nonExistent"), &["root", "content"]);
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content, "<data></data>");

    let response = tree.dispatch_path(Request::new(), &["root", "missing"]);
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.content, "Error: root.missing was not found.");

    let response = tree.dispatch_path(Request::new(), &[]);
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.content.starts_with("<html>"));
}

fn id_tree() -> HandlerTree {
    let root = Declaration::from_fn("Root", |ctx| {
        let child = ctx.render_child("item")?;
        Ok(format!("{}[{}]", ctx.render_id(), child))
    })
    .child(Declaration::from_fn("Item", |ctx| Ok(ctx.render_id().to_string())));
    HandlerTree::build(&root).unwrap()
}

#[test]
fn test_instance_id_overrides_render_id_for_target_only() {
    let tree = id_tree();

    let response = tree.dispatch(Request::new());
    assert_eq!(response.content, "root[root.item]");

    let request = Request::builder().field("requestId", "row-7").build();
    assert_eq!(tree.dispatch(request).content, "row-7[root.item]");

    let request = Request::builder()
        .field("requestHandler", "root.item")
        .field("requestId", "row-7")
        .build();
    assert_eq!(tree.dispatch(request).content, "row-7");

    // the override never sticks to the tree
    assert_eq!(tree.dispatch(routed("root.item")).content, "root.item");
}

#[test]
fn test_custom_routing_field() {
    let config = DispatchConfig {
        routing_field: "handler".to_string(),
        ..DispatchConfig::default()
    };
    let tree = HandlerTree::build_with_config(&common::frame(), config).unwrap();

    let request = Request::builder().field("handler", "root.content").build();
    assert_eq!(tree.dispatch(request).content, "<data></data>");

    // the default field name is no longer consulted
    let response = tree.dispatch(routed("root.content"));
    assert!(response.content.starts_with("<html>"));
}

#[test]
fn test_panics_are_contained() {
    let root = Declaration::from_fn("Root", |_| Ok("fine".to_string())).child(Declaration::from_fn(
        "Panicker",
        |_| -> anyhow::Result<String> { panic!("index out of range") },
    ));
    let tree = HandlerTree::build(&root).unwrap();

    let response = tree.dispatch(routed("root.panicker"));
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.content, "Internal Server Error: index out of range");

    // the tree keeps serving after a fault
    assert_eq!(tree.dispatch(Request::new()).content, "fine");
}

#[test]
#[should_panic(expected = "not contained")]
fn test_panics_propagate_when_not_caught() {
    let config = DispatchConfig {
        catch_panics: false,
        ..DispatchConfig::default()
    };
    let root = Declaration::from_fn("Root", |_| -> anyhow::Result<String> {
        panic!("not contained")
    });
    let tree = HandlerTree::build_with_config(&root, config).unwrap();
    let _ = tree.dispatch(Request::new());
}

struct Friendly;

impl Handler for Friendly {
    fn render(&self, ctx: &mut RenderContext<'_>) -> anyhow::Result<String> {
        if ctx.request().fields.get_str("fail") == "yes" {
            anyhow::bail!("asked to fail");
        }
        Ok("friendly".to_string())
    }

    fn render_not_found(&self, ctx: &RenderContext<'_>, resource: &str) -> String {
        format!("{} has nothing called {resource}", ctx.meta().accessor)
    }

    fn render_internal_error(&self, _ctx: &RenderContext<'_>, fault: &HandlerFault) -> String {
        format!("Sorry, {} broke", fault.accessor)
    }
}

#[test]
fn test_error_rendering_is_overridable() {
    let root = Declaration::from_fn("Root", |_| Ok(String::new()))
        .child(Declaration::new("Friendly", || Ok(Box::new(Friendly) as Box<dyn Handler>)));
    let tree = HandlerTree::build(&root).unwrap();

    let response = tree.dispatch(routed("root.friendly.gone"));
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.content, "root.friendly has nothing called root.friendly.gone");

    let request = Request::builder()
        .field("requestHandler", "root.friendly")
        .field("fail", "yes")
        .build();
    let response = tree.dispatch(request);
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.content, "Sorry, root.friendly broke");

    // the stopping node renders the error, not the root
    let response = tree.dispatch(routed("root.gone"));
    assert_eq!(response.content, "Error: root.gone was not found.");
}

#[test]
fn test_routing_field_list_with_one_value_still_fans_out() {
    let request = Request::builder()
        .field("requestHandler", FieldValue::List(vec!["root.content".to_string()]))
        .build();
    let response = frame_tree().dispatch(request);
    assert_eq!(response.status, StatusCode::MULTI_STATUS);
    let branches: Vec<serde_json::Value> = serde_json::from_str(&response.content).unwrap();
    assert_eq!(branches.len(), 1);
    assert_eq!(branches[0]["responseText"], "<data></data>");
}

#[test]
fn test_concurrent_dispatch_on_shared_tree() {
    let tree = Arc::new(id_tree());

    std::thread::scope(|scope| {
        for worker in 0..8 {
            let tree = Arc::clone(&tree);
            scope.spawn(move || {
                for i in 0..50 {
                    let id = format!("w{worker}-{i}");
                    let request = Request::builder()
                        .field("requestHandler", "root.item")
                        .field("requestId", id.as_str())
                        .build();
                    let response = tree.dispatch(request);
                    assert_eq!(response.status, StatusCode::OK);
                    assert_eq!(response.content, id);
                }
            });
        }
    });
}

#[test]
fn test_resolve() {
    let tree = frame_tree();
    assert_eq!(tree.resolve(""), Some(tree.root()));
    assert_eq!(tree.resolve("root.content"), tree.find("root.content"));
    assert_eq!(tree.resolve("root.nonExistent"), None);
}
