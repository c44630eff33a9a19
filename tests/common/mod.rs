#![allow(dead_code)]

use dynform::handler::{Declaration, HandlerTree};
use dynform::server::Request;

/// `root` with a `content` child and an `exceptionThrower` child whose
/// render always fails with "Error".
pub fn frame() -> Declaration {
    Declaration::from_fn("Root", |ctx| {
        Ok(format!(
            "<html><body><div id=\"{}.content\"></div></body></html>",
            ctx.meta().accessor
        ))
    })
    .child(Declaration::from_fn("Content", |_| Ok("<data></data>".to_string())))
    .child(Declaration::from_fn("ExceptionThrower", |_| {
        Err(anyhow::anyhow!("Error"))
    }))
}

pub fn frame_tree() -> HandlerTree {
    HandlerTree::build(&frame()).expect("frame tree builds")
}

/// GET request routed to `target`.
pub fn routed(target: &str) -> Request {
    Request::builder().field("requestHandler", target).build()
}
