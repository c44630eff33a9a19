use super::core::Handler;
use super::declaration::Declaration;
use super::error::BuildError;
use crate::runtime_config::DispatchConfig;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, error, info};

/// Index of a node in its [`HandlerTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Structural data of one node, fixed once the tree is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeMeta {
    pub name: String,
    /// Declared type name the node was created from
    pub type_name: String,
    /// Dotted path from the root; unique within the tree
    pub accessor: String,
    pub parent: Option<NodeId>,
    /// Children by name, in declaration order
    pub children: Vec<(String, NodeId)>,
    pub grab_fields: BTreeSet<String>,
    pub grab_forms: BTreeSet<String>,
    pub shared_fields: BTreeSet<String>,
    pub shared_forms: BTreeSet<String>,
}

impl NodeMeta {
    /// Human readable name: accessor segments capitalised and space separated
    /// (`frame.content` -> `Frame Content`).
    #[must_use]
    pub fn label(&self) -> String {
        self.accessor
            .split('.')
            .map(|segment| {
                let mut chars = segment.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }

    #[must_use]
    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children
            .iter()
            .find(|(child_name, _)| child_name == name)
            .map(|(_, id)| *id)
    }
}

/// Read-only view of the finished tree structure, handed to connection hooks.
#[derive(Clone, Copy)]
pub struct TreeView<'a> {
    metas: &'a [NodeMeta],
    config: &'a DispatchConfig,
}

impl<'a> TreeView<'a> {
    #[must_use]
    pub fn get(&self, node: NodeId) -> &'a NodeMeta {
        &self.metas[node.0]
    }

    #[must_use]
    pub fn find(&self, accessor: &str) -> Option<NodeId> {
        self.metas
            .iter()
            .position(|meta| meta.accessor == accessor)
            .map(NodeId)
    }

    #[must_use]
    pub fn config(&self) -> &'a DispatchConfig {
        self.config
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.metas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }
}

/// A fully built and connected handler tree.
///
/// Immutable after [`HandlerTree::build`] returns, so a single tree can serve
/// any number of concurrent dispatches.
pub struct HandlerTree {
    metas: Vec<NodeMeta>,
    handlers: Vec<Box<dyn Handler>>,
    config: DispatchConfig,
}

impl fmt::Debug for HandlerTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerTree")
            .field("nodes", &self.metas)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HandlerTree {
    /// Build with the default [`DispatchConfig`].
    pub fn build(root: &Declaration) -> Result<Self, BuildError> {
        Self::build_with_config(root, DispatchConfig::default())
    }

    /// Instantiate `root` and all of its descendants, then run every
    /// handler's connection hook.
    pub fn build_with_config(root: &Declaration, config: DispatchConfig) -> Result<Self, BuildError> {
        let mut tree = Self {
            metas: Vec::new(),
            handlers: Vec::new(),
            config,
        };

        if let Err(e) = tree.instantiate(root, None) {
            error!(accessor = %e.accessor(), error = %e, "Handler tree construction failed");
            return Err(e);
        }
        if let Err(e) = tree.connect() {
            error!(accessor = %e.accessor(), error = %e, "Handler tree connection failed");
            return Err(e);
        }

        info!(
            root = %tree.metas[0].accessor,
            node_count = tree.metas.len(),
            "Handler tree built"
        );
        Ok(tree)
    }

    fn instantiate(&mut self, decl: &Declaration, parent: Option<NodeId>) -> Result<NodeId, BuildError> {
        let name = decl.name();
        let parent_meta = parent.map(|id| &self.metas[id.0]);

        if name.is_empty() || name.contains('.') {
            return Err(BuildError::InvalidName {
                parent: parent_meta.map(|meta| meta.accessor.clone()),
                name,
            });
        }

        let accessor = match parent_meta {
            Some(meta) => format!("{}.{}", meta.accessor, name),
            None => name.clone(),
        };

        let (mut grab_fields, mut grab_forms, mut shared_fields, mut shared_forms) =
            match parent_meta {
                Some(meta) => (
                    meta.shared_fields.clone(),
                    meta.shared_forms.clone(),
                    meta.shared_fields.clone(),
                    meta.shared_forms.clone(),
                ),
                None => Default::default(),
            };
        grab_fields.extend(decl.grab_fields.iter().cloned());
        grab_forms.extend(decl.grab_forms.iter().cloned());
        shared_fields.extend(decl.shared_fields.iter().cloned());
        shared_forms.extend(decl.shared_forms.iter().cloned());

        let handler = decl
            .instantiate()
            .map_err(|source| BuildError::Construction {
                accessor: accessor.clone(),
                source,
            })?;

        let id = NodeId(self.metas.len());
        debug!(
            accessor = %accessor,
            type_name = %decl.type_name(),
            grab_fields = ?grab_fields,
            shared_fields = ?shared_fields,
            "Handler created"
        );
        self.metas.push(NodeMeta {
            name: name.clone(),
            type_name: decl.type_name().to_string(),
            accessor,
            parent,
            children: Vec::new(),
            grab_fields,
            grab_forms,
            shared_fields,
            shared_forms,
        });
        self.handlers.push(handler);

        if let Some(parent) = parent {
            self.metas[parent.0].children.push((name, id));
        }

        for child in &decl.children {
            if child.is_abstract() {
                debug!(
                    parent = %self.metas[id.0].accessor,
                    type_name = %child.type_name(),
                    "Skipping abstract handler declaration"
                );
                continue;
            }
            let child_name = child.name();
            if self.metas[id.0].child(&child_name).is_some() {
                return Err(BuildError::DuplicateChild {
                    parent: self.metas[id.0].accessor.clone(),
                    name: child_name,
                });
            }
            self.instantiate(child, Some(id))?;
        }

        Ok(id)
    }

    fn connect(&mut self) -> Result<(), BuildError> {
        let view = TreeView {
            metas: &self.metas,
            config: &self.config,
        };
        for (index, handler) in self.handlers.iter_mut().enumerate() {
            handler
                .make_connections(view, NodeId(index))
                .map_err(|source| BuildError::Connection {
                    accessor: view.get(NodeId(index)).accessor.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    #[must_use]
    pub fn view(&self) -> TreeView<'_> {
        TreeView {
            metas: &self.metas,
            config: &self.config,
        }
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.metas.len()
    }

    /// Always false; a built tree has at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }

    #[must_use]
    pub fn get(&self, node: NodeId) -> &NodeMeta {
        &self.metas[node.0]
    }

    #[must_use]
    pub fn handler(&self, node: NodeId) -> &dyn Handler {
        self.handlers[node.0].as_ref()
    }

    #[must_use]
    pub fn child(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.get(node).child(name)
    }

    /// Node with the given accessor.
    #[must_use]
    pub fn find(&self, accessor: &str) -> Option<NodeId> {
        self.view().find(accessor)
    }

    /// Every node in pre-order: root first, then each child subtree in
    /// declaration order.
    #[must_use]
    pub fn all_nodes(&self) -> Vec<NodeId> {
        (0..self.metas.len()).map(NodeId).collect()
    }

    /// Client registration statements for every node, in pre-order.
    #[must_use]
    pub fn init_scripts(&self) -> Vec<String> {
        let mut scripts = Vec::with_capacity(self.metas.len() * 3);
        for meta in &self.metas {
            scripts.push(format!("DynamicForm.handlers['{}'] = {{}};", meta.accessor));
            scripts.push(format!(
                "DynamicForm.handlers['{}'].grabFields = {};",
                meta.accessor,
                json_list(&meta.grab_fields)
            ));
            scripts.push(format!(
                "DynamicForm.handlers['{}'].grabForms = {};",
                meta.accessor,
                json_list(&meta.grab_forms)
            ));
        }
        scripts
    }
}

fn json_list(names: &BTreeSet<String>) -> String {
    serde_json::to_string(names).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Declaration, RenderContext};

    fn leaf(type_name: &str) -> Declaration {
        Declaration::from_fn(type_name, |_| Ok(String::new()))
    }

    #[test]
    fn test_label() {
        let tree = HandlerTree::build(&leaf("Frame").child(leaf("Content"))).unwrap();
        assert_eq!(tree.get(tree.root()).label(), "Frame");
        let content = tree.find("frame.content").unwrap();
        assert_eq!(tree.get(content).label(), "Frame Content");
    }

    #[test]
    fn test_preorder_indices() {
        let root = leaf("Root")
            .child(leaf("A").child(leaf("A1")))
            .child(leaf("B"));
        let tree = HandlerTree::build(&root).unwrap();
        let accessors: Vec<_> = tree
            .all_nodes()
            .into_iter()
            .map(|id| tree.get(id).accessor.clone())
            .collect();
        assert_eq!(accessors, vec!["root", "root.a", "root.a.a1", "root.b"]);
    }

    #[test]
    fn test_init_scripts() {
        let root = leaf("Root").shared_fields(["s"]).child(leaf("Child"));
        let tree = HandlerTree::build(&root).unwrap();
        let scripts = tree.init_scripts();
        assert_eq!(scripts.len(), 6);
        assert_eq!(scripts[0], "DynamicForm.handlers['root'] = {};");
        assert_eq!(scripts[1], "DynamicForm.handlers['root'].grabFields = [];");
        assert_eq!(scripts[4], "DynamicForm.handlers['root.child'].grabFields = [\"s\"];");
    }

    struct Linked {
        target: Option<NodeId>,
    }

    impl Handler for Linked {
        fn make_connections(&mut self, tree: TreeView<'_>, _node: NodeId) -> anyhow::Result<()> {
            self.target = tree.find("root.later");
            Ok(())
        }

        fn render(&self, _ctx: &mut RenderContext<'_>) -> anyhow::Result<String> {
            Ok(format!("{:?}", self.target.map(NodeId::index)))
        }
    }

    #[test]
    fn test_connections_see_whole_tree() {
        let root = leaf("Root")
            .child(Declaration::new("Early", || Ok(Box::new(Linked { target: None }) as Box<dyn Handler>)))
            .child(leaf("Later"));
        let tree = HandlerTree::build(&root).unwrap();
        let mut response = crate::server::Response::new();
        let request = crate::server::Request::new();
        let early = tree.find("root.early").unwrap();
        let mut ctx = RenderContext::new(&tree, early, &request, &mut response);
        assert_eq!(tree.handler(early).render(&mut ctx).unwrap(), "Some(2)");
    }
}
