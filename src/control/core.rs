use super::ui::{Element, Ui};
use crate::handler::{short_type_name, Declaration, Handler, NodeId, RenderContext, TreeView};
use http::Method;
use std::time::Duration;
use tracing::debug;

/// How a placed control gets its initial content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoLoad {
    /// Rendered into the page together with its parent
    #[default]
    Inline,
    /// Left empty and fetched by the client once the page has loaded
    Ajax,
    /// Left empty until something on the client asks for it
    Off,
}

/// Periodic client-side refresh of a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoReload {
    pub interval: Duration,
    /// Refresh without showing the loading placeholder
    pub silent: bool,
}

impl AutoReload {
    /// Client call scheduling the next refresh of element `id`.
    #[must_use]
    pub fn script(&self, id: &str) -> String {
        format!(
            "DynamicForm.get('{}', {}, '', {});",
            id,
            self.silent,
            self.interval.as_millis()
        )
    }
}

/// A handler that is also a UI unit.
///
/// Rendering runs the hooks in a fixed order:
///
/// `build_ui` -> `init_ui` -> `populate_ui` (not for GET) -> `structure_ui` ->
/// `valid_<method>` -> `process_<method>` (only if valid) -> `set_ui_data` ->
/// auto-reload script -> read-only lock (if `can_edit` is false) -> HTML.
///
/// Every hook except `build_ui` has a no-op default.
pub trait PageControl: Send + Sync + 'static {
    type Ui: Ui;

    fn build_ui(&self, ctx: &mut RenderContext<'_>) -> anyhow::Result<Self::Ui>;

    fn init_ui(&self, _ui: &mut Self::Ui, _ctx: &mut RenderContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Copy submitted values into the UI.
    fn populate_ui(&self, _ui: &mut Self::Ui, _ctx: &mut RenderContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Internal structuring step between population and validation.
    fn structure_ui(&self, _ui: &mut Self::Ui, _ctx: &mut RenderContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// GET is always valid; anything else is valid while the UI reports no
    /// errors.
    fn valid(&self, ui: &Self::Ui, ctx: &RenderContext<'_>) -> bool {
        ctx.request().method == Method::GET || !ui.has_errors()
    }

    fn valid_get(&self, _ui: &Self::Ui, _ctx: &RenderContext<'_>) -> bool {
        true
    }

    fn valid_post(&self, ui: &Self::Ui, ctx: &RenderContext<'_>) -> bool {
        self.valid(ui, ctx)
    }

    fn valid_put(&self, ui: &Self::Ui, ctx: &RenderContext<'_>) -> bool {
        self.valid(ui, ctx)
    }

    fn valid_delete(&self, ui: &Self::Ui, ctx: &RenderContext<'_>) -> bool {
        self.valid(ui, ctx)
    }

    fn process_get(&self, _ui: &mut Self::Ui, _ctx: &mut RenderContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn process_post(&self, _ui: &mut Self::Ui, _ctx: &mut RenderContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn process_put(&self, _ui: &mut Self::Ui, _ctx: &mut RenderContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn process_delete(&self, _ui: &mut Self::Ui, _ctx: &mut RenderContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn set_ui_data(&self, _ui: &mut Self::Ui, _ctx: &mut RenderContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Whether the caller may edit; false locks the rendered UI.
    fn can_edit(&self, _ctx: &RenderContext<'_>) -> bool {
        true
    }

    fn auto_load(&self) -> AutoLoad {
        AutoLoad::Inline
    }

    fn auto_reload(&self) -> Option<AutoReload> {
        None
    }

    /// Text shown while the control is being fetched.
    fn loading_text(&self, label: &str) -> String {
        format!("Loading {label}...")
    }

    fn make_connections(&mut self, _tree: TreeView<'_>, _node: NodeId) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Adapts a [`PageControl`] into a tree [`Handler`].
pub struct ControlHandler<C: PageControl> {
    control: C,
    loading: String,
}

impl<C: PageControl> ControlHandler<C> {
    pub fn new(control: C) -> Self {
        Self {
            control,
            loading: String::new(),
        }
    }

    /// Declaration creating a fresh control from `make` for each build.
    pub fn declare<F>(type_name: impl Into<String>, make: F) -> Declaration
    where
        F: Fn() -> C + Send + Sync + 'static,
    {
        Declaration::new(type_name, move || {
            Ok(Box::new(ControlHandler::new(make())) as Box<dyn Handler>)
        })
    }

    #[must_use]
    pub fn control(&self) -> &C {
        &self.control
    }

    /// Hidden placeholder markup, available once the tree is connected.
    #[must_use]
    pub fn loading_html(&self) -> &str {
        &self.loading
    }

    fn run_method_hooks(&self, ui: &mut C::Ui, ctx: &mut RenderContext<'_>) -> anyhow::Result<()> {
        let method = ctx.request().method.clone();
        let (valid, processed) = match method {
            Method::GET => (self.control.valid_get(ui, ctx), true),
            Method::POST => (self.control.valid_post(ui, ctx), true),
            Method::PUT => (self.control.valid_put(ui, ctx), true),
            Method::DELETE => (self.control.valid_delete(ui, ctx), true),
            _ => (false, false),
        };
        if !processed {
            debug!(accessor = %ctx.meta().accessor, method = %method, "No processing hook for method");
            return Ok(());
        }
        if !valid {
            debug!(
                accessor = %ctx.meta().accessor,
                method = %method,
                errors = ui.errors().len(),
                "Validation failed, skipping processing"
            );
            return Ok(());
        }
        match method {
            Method::GET => self.control.process_get(ui, ctx),
            Method::POST => self.control.process_post(ui, ctx),
            Method::PUT => self.control.process_put(ui, ctx),
            _ => self.control.process_delete(ui, ctx),
        }
    }
}

impl Declaration {
    /// Declare a `Default` page control under its own type name.
    #[must_use]
    pub fn control<C: PageControl + Default>() -> Self {
        ControlHandler::<C>::declare(short_type_name::<C>(), C::default)
    }
}

impl<C: PageControl> Handler for ControlHandler<C> {
    fn make_connections(&mut self, tree: TreeView<'_>, node: NodeId) -> anyhow::Result<()> {
        let meta = tree.get(node);
        let mut loading = Element::new("div")
            .with_class("WLoading")
            .with_attribute("id", &format!("{}:Loading", meta.accessor))
            .with_child(Element::new("img").with_attribute("src", "images/throbber.gif"))
            .with_child(Element::label(self.control.loading_text(&meta.label())));
        loading.hide();
        self.loading = loading.to_html()?;
        self.control.make_connections(tree, node)
    }

    fn render(&self, ctx: &mut RenderContext<'_>) -> anyhow::Result<String> {
        // Whoever renders first owns the script accumulator and emits it.
        let owns_scripts = ctx.response().scripts.is_none();
        if owns_scripts {
            ctx.response_mut().scripts_mut();
        }

        let mut ui = self.control.build_ui(ctx)?;
        self.control.init_ui(&mut ui, ctx)?;
        if ctx.request().method != Method::GET {
            self.control.populate_ui(&mut ui, ctx)?;
        }
        self.control.structure_ui(&mut ui, ctx)?;
        self.run_method_hooks(&mut ui, ctx)?;
        self.control.set_ui_data(&mut ui, ctx)?;

        if let Some(reload) = self.control.auto_reload() {
            ui.add_script(reload.script(ctx.render_id()));
        }
        if !self.control.can_edit(ctx) {
            ui.lock();
        }

        let mut html = ui.to_html()?;
        let scripts = ctx.response_mut().scripts_mut();
        for script in ui.take_scripts() {
            scripts.add_script(script);
        }
        if owns_scripts {
            html.push_str(&scripts.to_html());
        }
        Ok(html)
    }

    fn place(&self, ctx: &mut RenderContext<'_>) -> anyhow::Result<String> {
        let id = ctx.render_id().to_string();
        let content = match self.control.auto_load() {
            AutoLoad::Inline => self.render(ctx)?,
            AutoLoad::Ajax => {
                ctx.response_mut()
                    .scripts_mut()
                    .add_script(format!("DynamicForm.get('{id}');"));
                String::new()
            }
            AutoLoad::Off => String::new(),
        };
        Ok(format!(
            "{}<section id=\"{}\" handler=\"{}\">{}</section>",
            self.loading,
            id,
            ctx.meta().accessor,
            content
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_reload_script() {
        let reload = AutoReload {
            interval: Duration::from_secs(30),
            silent: true,
        };
        assert_eq!(reload.script("root.clock"), "DynamicForm.get('root.clock', true, '', 30000);");
    }

    #[test]
    fn test_auto_load_default() {
        assert_eq!(AutoLoad::default(), AutoLoad::Inline);
    }
}
