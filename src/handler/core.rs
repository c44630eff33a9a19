use super::tree::{HandlerTree, NodeId, NodeMeta, TreeView};
use crate::dispatcher::HandlerFault;
use crate::fields::FieldContainer;
use crate::server::{Request, Response};
use std::sync::Arc;

/// Behaviour attached to one node of a [`HandlerTree`].
///
/// Handlers are shared by concurrent dispatches, so every hook except
/// [`Handler::make_connections`] takes `&self`; anything that varies per call
/// belongs in the [`RenderContext`].
pub trait Handler: Send + Sync + 'static {
    /// Runs once after the whole tree exists.
    fn make_connections(&mut self, _tree: TreeView<'_>, _node: NodeId) -> anyhow::Result<()> {
        Ok(())
    }

    /// Produce this node's response content.
    fn render(&self, ctx: &mut RenderContext<'_>) -> anyhow::Result<String>;

    /// Markup used when a parent embeds this node in its own output.
    fn place(&self, ctx: &mut RenderContext<'_>) -> anyhow::Result<String> {
        self.render(ctx)
    }

    fn render_not_found(&self, _ctx: &RenderContext<'_>, resource: &str) -> String {
        format!("Error: {resource} was not found.")
    }

    fn render_internal_error(&self, _ctx: &RenderContext<'_>, fault: &HandlerFault) -> String {
        format!("Internal Server Error: {}", fault.description)
    }
}

type RenderFn = dyn Fn(&mut RenderContext<'_>) -> anyhow::Result<String> + Send + Sync;

/// Handler backed by a render closure.
#[derive(Clone)]
pub struct FnHandler {
    render: Arc<RenderFn>,
}

impl FnHandler {
    pub fn new<F>(render: F) -> Self
    where
        F: Fn(&mut RenderContext<'_>) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            render: Arc::new(render),
        }
    }

    pub(crate) fn from_arc(render: Arc<RenderFn>) -> Self {
        Self { render }
    }
}

impl Handler for FnHandler {
    fn render(&self, ctx: &mut RenderContext<'_>) -> anyhow::Result<String> {
        (self.render)(ctx)
    }
}

/// Everything a handler sees during one call.
///
/// The tree is borrowed shared; the request is read-only and the response is
/// the call's own accumulator.
pub struct RenderContext<'a> {
    tree: &'a HandlerTree,
    node: NodeId,
    request: &'a Request,
    response: &'a mut Response,
    instance_id: Option<&'a str>,
}

impl<'a> RenderContext<'a> {
    /// Context for the node a request was routed to. A non-empty instance
    /// field on the request overrides the node's rendering id.
    pub fn new(
        tree: &'a HandlerTree,
        node: NodeId,
        request: &'a Request,
        response: &'a mut Response,
    ) -> Self {
        let instance_id = Some(request.fields.get_str(&tree.config().instance_field))
            .filter(|id| !id.is_empty());
        Self {
            tree,
            node,
            request,
            response,
            instance_id,
        }
    }

    #[must_use]
    pub fn tree(&self) -> &'a HandlerTree {
        self.tree
    }

    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[must_use]
    pub fn meta(&self) -> &'a NodeMeta {
        self.tree.get(self.node)
    }

    #[must_use]
    pub fn request(&self) -> &'a Request {
        self.request
    }

    #[must_use]
    pub fn response(&self) -> &Response {
        &*self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut *self.response
    }

    /// Id the node renders under for this call only.
    #[must_use]
    pub fn render_id(&self) -> &str {
        self.instance_id.unwrap_or(&self.meta().accessor)
    }

    /// The request fields this node grabs, missing ones as `""`.
    #[must_use]
    pub fn grabbed_fields(&self) -> FieldContainer {
        self.request.fields.subset(&self.meta().grab_fields, "")
    }

    /// Render another node into this call's response.
    pub fn render_node(&mut self, node: NodeId) -> anyhow::Result<String> {
        let tree = self.tree;
        let mut ctx = self.descend(node);
        tree.handler(node).render(&mut ctx)
    }

    /// Render the named direct child.
    pub fn render_child(&mut self, name: &str) -> anyhow::Result<String> {
        let node = self.child_id(name)?;
        self.render_node(node)
    }

    /// Place the named direct child (see [`Handler::place`]).
    pub fn place_child(&mut self, name: &str) -> anyhow::Result<String> {
        let node = self.child_id(name)?;
        let tree = self.tree;
        let mut ctx = self.descend(node);
        tree.handler(node).place(&mut ctx)
    }

    fn child_id(&self, name: &str) -> anyhow::Result<NodeId> {
        self.tree.child(self.node, name).ok_or_else(|| {
            anyhow::anyhow!("'{}' has no child named '{name}'", self.meta().accessor)
        })
    }

    fn descend(&mut self, node: NodeId) -> RenderContext<'_> {
        RenderContext {
            tree: self.tree,
            node,
            request: self.request,
            response: &mut *self.response,
            instance_id: None,
        }
    }
}
