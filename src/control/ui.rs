use std::collections::BTreeMap;
use std::fmt::Write as _;

/// A renderable UI unit built by a page control for one call.
pub trait Ui {
    /// Record a validation error against this UI.
    fn add_error(&mut self, message: String);

    fn errors(&self) -> &[String];

    fn has_errors(&self) -> bool {
        !self.errors().is_empty()
    }

    /// Queue a client-side script that should run once the UI is shown.
    fn add_script(&mut self, script: String);

    /// Hand over queued scripts to the response accumulator.
    fn take_scripts(&mut self) -> Vec<String>;

    /// Switch into read-only presentation.
    fn lock(&mut self);

    fn is_locked(&self) -> bool;

    fn to_html(&self) -> anyhow::Result<String>;
}

/// Minimal HTML element tree used as the default control UI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attributes: BTreeMap<String, String>,
    classes: Vec<String>,
    text: String,
    raw: Option<String>,
    children: Vec<Element>,
    errors: Vec<String>,
    scripts: Vec<String>,
    locked: bool,
}

const VOID_TAGS: &[&str] = &["img", "input", "link", "meta", "br", "hr"];

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// A UI that renders nothing but still carries errors and scripts.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Pre-rendered markup emitted verbatim, e.g. a placed child control.
    pub fn raw(html: impl Into<String>) -> Self {
        Self {
            raw: Some(html.into()),
            ..Self::default()
        }
    }

    pub fn label(text: impl Into<String>) -> Self {
        Self::new("span").with_class("WLabel").with_text(text)
    }

    pub fn hidden(name: &str, value: &str) -> Self {
        Self::new("input")
            .with_attribute("type", "hidden")
            .with_attribute("name", name)
            .with_attribute("value", value)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn add_class(&mut self, class: &str) {
        if !self.classes.iter().any(|c| c == class) {
            self.classes.push(class.to_string());
        }
    }

    pub fn push(&mut self, child: Element) -> &mut Element {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn hide(&mut self) {
        self.attributes
            .insert("style".to_string(), "display:none;".to_string());
    }

    fn write_html(&self, out: &mut String) {
        if let Some(raw) = &self.raw {
            out.push_str(raw);
            return;
        }
        if self.tag.is_empty() {
            for child in &self.children {
                child.write_html(out);
            }
            return;
        }

        let _ = write!(out, "<{}", self.tag);
        if !self.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape_html(&self.classes.join(" ")));
        }
        for (name, value) in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", name, escape_html(value));
        }
        if self.locked {
            out.push_str(" readonly=\"readonly\"");
        }
        if VOID_TAGS.contains(&self.tag.as_str()) {
            out.push_str(" />");
            return;
        }
        out.push('>');
        out.push_str(&escape_html(&self.text));
        for child in &self.children {
            child.write_html(out);
        }
        let _ = write!(out, "</{}>", self.tag);
    }
}

impl Ui for Element {
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
        for child in &mut self.children {
            child.lock();
        }
    }

    fn is_locked(&self) -> bool {
        self.locked
    }

    fn to_html(&self) -> anyhow::Result<String> {
        let mut out = String::new();
        self.write_html(&mut out);
        Ok(out)
    }
}

/// Escape text for use in HTML content and quoted attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_html() {
        let label = Element::label("This is a label").with_attribute("id", "lbl");
        assert_eq!(
            label.to_html().unwrap(),
            "<span class=\"WLabel\" id=\"lbl\">This is a label</span>"
        );
    }

    #[test]
    fn test_empty_renders_children_only() {
        let mut ui = Element::empty().with_attribute("id", "ignored");
        assert_eq!(ui.to_html().unwrap(), "");
        ui.push(Element::label("a"));
        assert_eq!(ui.to_html().unwrap(), "<span class=\"WLabel\">a</span>");
    }

    #[test]
    fn test_raw_markup_is_not_escaped() {
        let ui = Element::new("div").with_child(Element::raw("<b>placed</b>"));
        assert_eq!(ui.to_html().unwrap(), "<div><b>placed</b></div>");
    }

    #[test]
    fn test_void_tag_and_escaping() {
        let hidden = Element::hidden("token", "a\"b<c>");
        assert_eq!(
            hidden.to_html().unwrap(),
            "<input name=\"token\" type=\"hidden\" value=\"a&quot;b&lt;c&gt;\" />"
        );
    }

    #[test]
    fn test_lock_cascades() {
        let mut ui = Element::new("div").with_child(Element::new("input"));
        ui.lock();
        assert!(ui.is_locked());
        assert!(ui.children()[0].is_locked());
        assert_eq!(
            ui.to_html().unwrap(),
            "<div readonly=\"readonly\"><input readonly=\"readonly\" /></div>"
        );
    }

    #[test]
    fn test_errors_and_scripts() {
        let mut ui = Element::new("form");
        assert!(!ui.has_errors());
        ui.add_error("name is required".to_string());
        assert!(ui.has_errors());
        ui.add_script("focus();".to_string());
        assert_eq!(ui.take_scripts(), vec!["focus();".to_string()]);
        assert!(ui.take_scripts().is_empty());
    }
}
