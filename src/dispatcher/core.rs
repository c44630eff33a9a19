//! Dispatcher core: routing state machine, fault isolation and fan-out.

use crate::fields::FieldValue;
use crate::handler::{HandlerTree, NodeId, RenderContext};
use crate::ids::DispatchId;
use crate::server::response::{content_type, SerializedResponse};
use crate::server::{Request, Response};
use http::StatusCode;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// A failure raised while a node rendered, captured at that node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFault {
    /// Accessor of the faulting node
    pub accessor: String,
    pub description: String,
}

impl HandlerFault {
    pub fn from_error(accessor: impl Into<String>, err: &anyhow::Error) -> Self {
        Self {
            accessor: accessor.into(),
            description: err.to_string(),
        }
    }

    /// Fault for a caught panic; string payloads become the description.
    pub fn from_panic(accessor: impl Into<String>, payload: &(dyn Any + Send)) -> Self {
        let description = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked".to_string()
        };
        Self {
            accessor: accessor.into(),
            description,
        }
    }
}

impl fmt::Display for HandlerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler '{}' failed: {}", self.accessor, self.description)
    }
}

impl std::error::Error for HandlerFault {}

/// Terminal outcome of a dispatch that did not render successfully.
///
/// These never escape [`HandlerTree::dispatch`]; they are turned into the
/// response of the node where they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// A path segment matched neither the node itself nor any of its children
    RoutingMismatch {
        /// The complete, unconsumed routing value
        resource: String,
        /// The segment that failed to match
        segment: String,
    },
    HandlerFault(HandlerFault),
}

impl DispatchError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::RoutingMismatch { .. } => StatusCode::NOT_FOUND,
            DispatchError::HandlerFault(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::RoutingMismatch { resource, segment } => {
                write!(f, "No handler for segment '{segment}' of '{resource}'")
            }
            DispatchError::HandlerFault(fault) => fault.fmt(f),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::HandlerFault(fault) => Some(fault),
            DispatchError::RoutingMismatch { .. } => None,
        }
    }
}

impl From<HandlerFault> for DispatchError {
    fn from(fault: HandlerFault) -> Self {
        DispatchError::HandlerFault(fault)
    }
}

impl HandlerTree {
    /// Dispatch a request using its routing field.
    ///
    /// An absent or empty routing value targets the root. A list-valued
    /// routing field fans out: every value is dispatched against its own copy
    /// of the request and the serialized results come back as one
    /// `207 Multi-Status` JSON array.
    pub fn dispatch(&self, request: Request) -> Response {
        let routing = request.fields.get(&self.config().routing_field).cloned();
        match routing {
            Some(FieldValue::List(targets)) => self.fan_out(&request, &targets),
            Some(FieldValue::Single(resource)) => {
                let segments: Vec<&str> = resource.split('.').collect();
                self.handle(&request, &segments, &resource)
            }
            None => self.handle(&request, &[""], ""),
        }
    }

    /// Dispatch along an explicit path, ignoring the routing field for
    /// resolution. An empty path targets the root.
    pub fn dispatch_path(&self, request: Request, path: &[&str]) -> Response {
        let resource = match request.fields.get(&self.config().routing_field) {
            Some(FieldValue::Single(value)) if !value.is_empty() => value.clone(),
            _ => path.join("."),
        };
        if path.is_empty() {
            return self.handle(&request, &[""], &resource);
        }
        self.handle(&request, path, &resource)
    }

    /// Adapt an `http` request, dispatch it and adapt the response back.
    pub fn dispatch_http<B: AsRef<[u8]>>(
        &self,
        request: &http::Request<B>,
    ) -> anyhow::Result<http::Response<String>> {
        self.dispatch(Request::from_http(request)).into_http()
    }

    /// Node addressed by a dotted routing value, if any.
    #[must_use]
    pub fn resolve(&self, routing: &str) -> Option<NodeId> {
        let segments: Vec<&str> = routing.split('.').collect();
        self.walk(&segments).ok()
    }

    fn handle(&self, request: &Request, segments: &[&str], resource: &str) -> Response {
        let span = tracing::debug_span!(
            "dispatch",
            dispatch_id = %request.dispatch_id,
            routing = %resource
        );
        let _entered = span.enter();
        let started = Instant::now();

        let mut response = Response::new();
        let outcome = match self.walk(segments) {
            Ok(node) => self
                .execute(node, request, &mut response)
                .map_err(|fault| (node, DispatchError::from(fault))),
            Err((node, segment)) => Err((
                node,
                DispatchError::RoutingMismatch {
                    resource: resource.to_string(),
                    segment,
                },
            )),
        };

        if let Err((node, err)) = outcome {
            self.respond_with_error(node, request, &mut response, &err);
        }

        debug!(
            status = response.status.as_u16(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "Dispatch complete"
        );
        response
    }

    /// Resolve segments to a node. On a mismatch, returns the node at which
    /// resolution stopped and the offending segment.
    fn walk(&self, segments: &[&str]) -> Result<NodeId, (NodeId, String)> {
        let mut node = self.root();
        let Some((first, mut rest)) = segments.split_first() else {
            return Ok(node);
        };
        if !first.is_empty() && *first != self.get(node).name {
            return Err((node, (*first).to_string()));
        }

        while let Some((segment, tail)) = rest.split_first() {
            match self.child(node, segment) {
                Some(child) => {
                    debug!(
                        from = %self.get(node).accessor,
                        to = %self.get(child).accessor,
                        "Delegating to child handler"
                    );
                    node = child;
                    rest = tail;
                }
                None => return Err((node, (*segment).to_string())),
            }
        }
        Ok(node)
    }

    /// Render `node` into `response`. Errors and, when enabled, panics are
    /// contained here.
    fn execute(&self, node: NodeId, request: &Request, response: &mut Response) -> Result<(), HandlerFault> {
        let accessor = &self.get(node).accessor;
        let handler = self.handler(node);
        let mut render = || {
            let mut ctx = RenderContext::new(self, node, request, response);
            handler.render(&mut ctx)
        };

        let rendered = if self.config().catch_panics {
            match panic::catch_unwind(AssertUnwindSafe(render)) {
                Ok(result) => result.map_err(|e| HandlerFault::from_error(accessor, &e)),
                Err(payload) => {
                    let fault = HandlerFault::from_panic(accessor, payload.as_ref());
                    error!(
                        accessor = %accessor,
                        panic_message = %fault.description,
                        "Handler panicked"
                    );
                    Err(fault)
                }
            }
        } else {
            render().map_err(|e| HandlerFault::from_error(accessor, &e))
        };

        response.content = rendered?;
        Ok(())
    }

    fn respond_with_error(&self, node: NodeId, request: &Request, response: &mut Response, err: &DispatchError) {
        let handler = self.handler(node);
        response.status = err.status();
        let content = {
            let ctx = RenderContext::new(self, node, request, response);
            match err {
                DispatchError::RoutingMismatch { resource, segment } => {
                    warn!(
                        accessor = %ctx.meta().accessor,
                        resource = %resource,
                        segment = %segment,
                        "Handler not found"
                    );
                    handler.render_not_found(&ctx, resource)
                }
                DispatchError::HandlerFault(fault) => {
                    error!(
                        accessor = %fault.accessor,
                        error = %fault.description,
                        "Handler fault"
                    );
                    handler.render_internal_error(&ctx, fault)
                }
            }
        };
        response.content = content;
    }

    fn fan_out(&self, request: &Request, targets: &[String]) -> Response {
        info!(
            dispatch_id = %request.dispatch_id,
            branch_count = targets.len(),
            "Fan-out dispatch"
        );

        let results: Vec<SerializedResponse> = targets
            .iter()
            .map(|target| {
                let mut branch = request.clone();
                branch
                    .fields
                    .insert(self.config().routing_field.clone(), target.as_str());
                branch.dispatch_id = DispatchId::new();
                self.dispatch(branch).serialize()
            })
            .collect();

        let mut response = Response::new();
        match serde_json::to_string(&results) {
            Ok(body) => {
                response.status = StatusCode::MULTI_STATUS;
                response.content_type = content_type::JSON.to_string();
                response.content = body;
            }
            Err(e) => {
                error!(error = %e, "Failed to serialize fan-out results");
                response.status = StatusCode::INTERNAL_SERVER_ERROR;
                response.content = format!("Internal Server Error: {e}");
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Declaration;

    fn tree() -> HandlerTree {
        let root = Declaration::from_fn("Root", |_| Ok("root".to_string()))
            .child(Declaration::from_fn("Content", |_| Ok("content".to_string())))
            .child(Declaration::from_fn("Panicker", |_| -> anyhow::Result<String> {
                panic!("kaboom")
            }));
        HandlerTree::build(&root).unwrap()
    }

    #[test]
    fn test_walk() {
        let tree = tree();
        assert_eq!(tree.walk(&[""]), Ok(tree.root()));
        assert_eq!(tree.walk(&[]), Ok(tree.root()));
        let content = tree.find("root.content").unwrap();
        assert_eq!(tree.walk(&["root", "content"]), Ok(content));
        assert_eq!(tree.walk(&["", "content"]), Ok(content));
        assert_eq!(tree.walk(&["other"]), Err((tree.root(), "other".to_string())));
        assert_eq!(
            tree.walk(&["root", "content", "deeper"]),
            Err((content, "deeper".to_string()))
        );
    }

    #[test]
    fn test_resolve() {
        let tree = tree();
        assert_eq!(tree.resolve(""), Some(tree.root()));
        assert_eq!(tree.resolve("root.content"), tree.find("root.content"));
        assert_eq!(tree.resolve("content"), None);
    }

    #[test]
    fn test_panic_becomes_internal_error() {
        let tree = tree();
        let request = Request::builder().field("requestHandler", "root.panicker").build();
        let response = tree.dispatch(request);
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.content, "Internal Server Error: kaboom");
    }

    #[test]
    fn test_fault_from_panic_payloads() {
        let fault = HandlerFault::from_panic("a", &"static");
        assert_eq!(fault.description, "static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(HandlerFault::from_panic("a", owned.as_ref()).description, "owned");
        let other: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(HandlerFault::from_panic("a", other.as_ref()).description, "handler panicked");
    }

    #[test]
    fn test_dispatch_error_status() {
        let mismatch = DispatchError::RoutingMismatch {
            resource: "root.x".to_string(),
            segment: "x".to_string(),
        };
        assert_eq!(mismatch.status(), StatusCode::NOT_FOUND);
        let fault: DispatchError = HandlerFault {
            accessor: "root".to_string(),
            description: "boom".to_string(),
        }
        .into();
        assert_eq!(fault.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(fault.to_string(), "Handler 'root' failed: boom");
    }
}
