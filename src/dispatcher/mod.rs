//! # Dispatcher Module
//!
//! Routes a request to exactly one node of a [`HandlerTree`](crate::handler::HandlerTree)
//! and turns whatever happens there into a [`Response`](crate::server::Response).
//!
//! ## Routing
//!
//! The target is named by the request's routing field (`requestHandler` by
//! default) as a dotted path such as `frame.content.list`. The first segment
//! must be the root's name or empty; every further segment must name a child
//! of the node reached so far. Intermediate levels cannot be skipped.
//!
//! ```rust
//! use dynform::handler::{Declaration, HandlerTree};
//! use dynform::server::Request;
//!
//! let tree = HandlerTree::build(
//!     &Declaration::from_fn("Root", |_| Ok("root".into()))
//!         .child(Declaration::from_fn("Content", |_| Ok("content".into()))),
//! )
//! .unwrap();
//!
//! let response = tree.dispatch(Request::builder().field("requestHandler", "root.content").build());
//! assert_eq!(response.content, "content");
//! ```
//!
//! ## Outcomes
//!
//! | Situation | Status | Content |
//! |---|---|---|
//! | node rendered | 200 | render output |
//! | unknown segment | 404 | `Error: <routing value> was not found.` |
//! | render error or panic | 500 | `Internal Server Error: <description>` |
//! | list-valued routing field | 207 | JSON array of `{responseText, contentType, status}` |
//!
//! Messages come from the [`Handler`](crate::handler::Handler) hooks of the
//! node where the dispatch stopped, so they can be overridden per node.
//!
//! ## Error Handling
//!
//! Routing and handler failures are terminal for the dispatch but never
//! escape it: [`DispatchError`] values are logged and converted into the
//! response. Panics are caught at the faulting node unless
//! `catch_panics` is disabled in the
//! [`DispatchConfig`](crate::runtime_config::DispatchConfig).
//!
//! ## Concurrency
//!
//! Dispatch only reads the tree, so one tree can be shared across threads.
//! Fan-out branches run in request order, each against a private clone of
//! the request.

mod core;

pub use core::{DispatchError, HandlerFault};
