use super::ui::Ui;
use anyhow::Context;
use minijinja::Environment;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Control UI rendered from a minijinja template.
///
/// The template sees `id`, `attributes`, `data`, `errors` and `editable`.
/// Output is HTML-escaped by default.
#[derive(Debug, Clone)]
pub struct TemplateUi {
    source: Arc<str>,
    id: String,
    attributes: BTreeMap<String, String>,
    data: BTreeMap<String, JsonValue>,
    errors: Vec<String>,
    scripts: Vec<String>,
    locked: bool,
}

impl TemplateUi {
    pub fn new(source: impl Into<Arc<str>>) -> Self {
        Self {
            source: source.into(),
            id: String::new(),
            attributes: BTreeMap::new(),
            data: BTreeMap::new(),
            errors: Vec::new(),
            scripts: Vec::new(),
            locked: false,
        }
    }

    /// Expose a value to the template under `data.<key>`.
    pub fn set_data(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.data.insert(key.into(), value.into());
    }

    /// Id exposed to the template as `id`, usually `ctx.render_id()`.
    pub fn set_id(&mut self, id: &str) {
        self.id = id.to_string();
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        self.attributes.insert(name.to_string(), value.to_string());
    }

    #[must_use]
    pub fn data(&self, key: &str) -> Option<&JsonValue> {
        self.data.get(key)
    }
}

impl Ui for TemplateUi {
    fn add_error(&mut self, message: String) {
        self.errors.push(message);
    }

    fn errors(&self) -> &[String] {
        &self.errors
    }

    fn add_script(&mut self, script: String) {
        self.scripts.push(script);
    }

    fn take_scripts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.scripts)
    }

    fn lock(&mut self) {
        self.locked = true;
    }

    fn is_locked(&self) -> bool {
        self.locked
    }

    fn to_html(&self) -> anyhow::Result<String> {
        let mut env = Environment::new();
        // The .html name turns on auto-escaping.
        env.add_template("control.html", &self.source)
            .context("Failed to parse control template")?;
        let template = env.get_template("control.html")?;
        let rendered = template
            .render(minijinja::context! {
                id => self.id,
                attributes => self.attributes,
                data => self.data,
                errors => self.errors,
                editable => !self.locked,
            })
            .with_context(|| format!("Failed to render control template for '{}'", self.id))?;
        Ok(rendered)
    }
}
