//! # dynform
//!
//! **dynform** builds pages out of independently addressable controls. A page
//! is a tree of handlers, built once at startup from nested declarations, and
//! any node of it can be rendered on its own by naming its dotted path in the
//! request. A failing control produces an error response for that control
//! only; the rest of the page is unaffected.
//!
//! ## Architecture
//!
//! - **[`fields`]** - key/value multi-map used for request parameters, cookies and metadata
//! - **[`server`]** - per-call [`Request`](server::Request) and [`Response`](server::Response) plus the `http` crate adapter
//! - **[`handler`]** - the [`Handler`](handler::Handler) trait, declarations and the [`HandlerTree`](handler::HandlerTree) builder
//! - **[`dispatcher`]** - routing of a dotted path to one node, fault isolation and fan-out
//! - **[`control`]** - page controls: handlers with a UI lifecycle
//! - **[`page`]** - the HTML document root of a page
//! - **[`runtime_config`]** - dispatch settings from the environment or YAML
//! - **[`logging`]** - `tracing-subscriber` setup
//! - **[`cli`]** - the `dynform` demo binary
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Transport
//!     participant Tree as HandlerTree
//!     participant Node as Handler
//!
//!     Transport->>Tree: dispatch(Request)
//!     alt routing field is a list
//!         Tree->>Tree: dispatch each value on a cloned Request
//!         Tree-->>Transport: 207 + JSON array
//!     else single path
//!         Tree->>Tree: walk path segments
//!         alt unknown segment
//!             Tree-->>Transport: 404 from render_not_found
//!         end
//!         Tree->>Node: render(ctx)
//!         alt Err or panic
//!             Tree-->>Transport: 500 from render_internal_error
//!         end
//!         Node-->>Tree: markup
//!         Tree-->>Transport: 200
//!     end
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use dynform::handler::{Declaration, HandlerTree};
//! use dynform::server::Request;
//! use http::StatusCode;
//!
//! let page = Declaration::from_fn("Root", |ctx| {
//!     let body = ctx.render_child("content")?;
//!     Ok(format!("<main>{body}</main>"))
//! })
//! .child(Declaration::from_fn("Content", |_| Ok("hello".to_string())));
//!
//! let tree = HandlerTree::build(&page).unwrap();
//!
//! let whole = tree.dispatch(Request::new());
//! assert_eq!(whole.content, "<main>hello</main>");
//!
//! let part = tree.dispatch(Request::builder().field("requestHandler", "root.content").build());
//! assert_eq!(part.content, "hello");
//!
//! let missing = tree.dispatch(Request::builder().field("requestHandler", "root.nope").build());
//! assert_eq!(missing.status, StatusCode::NOT_FOUND);
//! assert_eq!(missing.content, "Error: root.nope was not found.");
//! ```
//!
//! ## Concurrency
//!
//! A built [`HandlerTree`](handler::HandlerTree) is `Send + Sync` and never
//! mutated by dispatch; share it behind an `Arc` and dispatch from as many
//! threads as needed. Per-call state lives in the request, the response and
//! the [`RenderContext`](handler::RenderContext).

pub mod cli;
pub mod control;
pub mod dispatcher;
pub mod fields;
pub mod handler;
pub mod ids;
pub mod logging;
pub mod page;
pub mod runtime_config;
pub mod server;

pub use dispatcher::{DispatchError, HandlerFault};
pub use fields::{FieldContainer, FieldValue};
pub use handler::{BuildError, Declaration, Handler, HandlerTree, RenderContext};
pub use runtime_config::DispatchConfig;
pub use server::{Request, Response};
