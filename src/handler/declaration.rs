use super::core::{FnHandler, Handler, RenderContext};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Declarations whose type name starts with this are never instantiated.
pub const ABSTRACT_PREFIX: &str = "Abstract";

/// Creates the handler instance for one node.
pub type Factory = Arc<dyn Fn() -> anyhow::Result<Box<dyn Handler>> + Send + Sync>;

/// Static description of a handler and its nested children.
///
/// This is the data form of a page's composition: a type name (from which the
/// node name is derived), a factory, the declared grab/shared sets and the
/// ordered child declarations.
#[derive(Clone)]
pub struct Declaration {
    type_name: String,
    name: Option<String>,
    factory: Factory,
    pub(crate) grab_fields: BTreeSet<String>,
    pub(crate) grab_forms: BTreeSet<String>,
    pub(crate) shared_fields: BTreeSet<String>,
    pub(crate) shared_forms: BTreeSet<String>,
    pub(crate) children: Vec<Declaration>,
}

impl Declaration {
    pub fn new<F>(type_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<Box<dyn Handler>> + Send + Sync + 'static,
    {
        Self {
            type_name: type_name.into(),
            name: None,
            factory: Arc::new(factory),
            grab_fields: BTreeSet::new(),
            grab_forms: BTreeSet::new(),
            shared_fields: BTreeSet::new(),
            shared_forms: BTreeSet::new(),
            children: Vec::new(),
        }
    }

    /// Declare a `Default` handler type; the type name is the Rust type's own.
    #[must_use]
    pub fn of<H: Handler + Default>() -> Self {
        Self::new(short_type_name::<H>(), || {
            Ok(Box::new(H::default()) as Box<dyn Handler>)
        })
    }

    /// Declare a handler whose render output comes from a closure.
    pub fn from_fn<F>(type_name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&mut RenderContext<'_>) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        let render = Arc::new(render);
        Self::new(type_name, move || {
            Ok(Box::new(FnHandler::from_arc(render.clone())) as Box<dyn Handler>)
        })
    }

    /// Override the node name otherwise derived from the type name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn grab_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grab_fields.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn grab_forms<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grab_forms.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn shared_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shared_fields.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn shared_forms<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shared_forms.extend(names.into_iter().map(Into::into));
        self
    }

    /// Append a nested declaration; children keep declaration order.
    pub fn child(mut self, child: Declaration) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Declaration>) -> Self {
        self.children.extend(children);
        self
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Node name: the explicit override, or the type name with its first
    /// letter lower-cased (`FrameContent` -> `frameContent`).
    #[must_use]
    pub fn name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => lower_first(&self.type_name),
        }
    }

    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.type_name.starts_with(ABSTRACT_PREFIX)
    }

    pub(crate) fn instantiate(&self) -> anyhow::Result<Box<dyn Handler>> {
        (self.factory)()
    }
}

impl fmt::Debug for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declaration")
            .field("type_name", &self.type_name)
            .field("name", &self.name)
            .field("grab_fields", &self.grab_fields)
            .field("grab_forms", &self.grab_forms)
            .field("shared_fields", &self.shared_fields)
            .field("shared_forms", &self.shared_forms)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Last path segment of a type's name, generics stripped
/// (`my_app::pages::Frame<T>` -> `Frame`).
pub(crate) fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}
