//! # Control Module
//!
//! Page controls: tree nodes that are also visual units with a
//! request-method driven lifecycle.
//!
//! Implement [`PageControl`] and declare it with
//! [`Declaration::control`](crate::handler::Declaration::control) (or
//! [`ControlHandler::declare`] for controls without a `Default`). The
//! [`ControlHandler`] adapter runs the lifecycle, feeds scripts into the
//! response's script accumulator and, when the control is placed inside a
//! parent, wraps it in a `<section>` preceded by a hidden loading placeholder.
//!
//! ```rust
//! use dynform::control::{Element, PageControl};
//! use dynform::handler::{Declaration, HandlerTree, RenderContext};
//! use dynform::server::Request;
//!
//! #[derive(Default)]
//! struct Greeting;
//!
//! impl PageControl for Greeting {
//!     type Ui = Element;
//!
//!     fn build_ui(&self, _ctx: &mut RenderContext<'_>) -> anyhow::Result<Element> {
//!         Ok(Element::label("Hello"))
//!     }
//! }
//!
//! let tree = HandlerTree::build(&Declaration::control::<Greeting>()).unwrap();
//! let response = tree.dispatch(Request::new());
//! assert_eq!(response.content, "<span class=\"WLabel\">Hello</span>");
//! ```
//!
//! UIs are anything implementing [`Ui`]: the bundled [`Element`] tree or a
//! minijinja backed [`TemplateUi`].

mod core;
mod template;
mod ui;

pub use core::{AutoLoad, AutoReload, ControlHandler, PageControl};
pub use template::TemplateUi;
pub use ui::{escape_html, Element, Ui};
