//! # Handler Module
//!
//! A page is a tree of handlers built once from nested [`Declaration`]s and
//! shared read-only by every dispatch afterwards.
//!
//! ## Building
//!
//! ```rust
//! use dynform::handler::{Declaration, HandlerTree};
//!
//! let root = Declaration::from_fn("Frame", |_ctx| Ok("frame".to_string()))
//!     .shared_fields(["session"])
//!     .child(Declaration::from_fn("Content", |_ctx| Ok("content".to_string())).grab_fields(["page"]));
//!
//! let tree = HandlerTree::build(&root).unwrap();
//! let content = tree.find("frame.content").unwrap();
//! assert_eq!(tree.get(content).label(), "Frame Content");
//! assert!(tree.get(content).grab_fields.contains("session"));
//! ```
//!
//! ## Structure
//!
//! Nodes live in an arena owned by [`HandlerTree`]; a [`NodeId`] indexes both
//! the node metadata ([`NodeMeta`]) and the boxed [`Handler`] behaviour. Parent
//! links are plain ids, never ownership. Arena order is pre-order: the root,
//! then each child subtree in declaration order.
//!
//! Construction is two-phase. Every node is instantiated and linked first;
//! only then does each handler's [`Handler::make_connections`] hook run, so
//! wiring may refer to any node in the finished tree.
//!
//! Declarations whose type name starts with `Abstract` are not instantiated.

mod core;
mod declaration;
mod error;
mod tree;

pub use core::{FnHandler, Handler, RenderContext};
pub use declaration::{Declaration, Factory, ABSTRACT_PREFIX};
pub use error::BuildError;
pub use tree::{HandlerTree, NodeId, NodeMeta, TreeView};

pub(crate) use declaration::short_type_name;
