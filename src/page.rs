//! # Page Module
//!
//! The document root of a dynamic page. A [`PageHandler`] renders a complete
//! HTML5 document around its `mainControl` child and seeds the response's
//! script accumulator with the tree's client registration scripts, so every
//! control below it can be refreshed on its own later.

use crate::handler::{short_type_name, Declaration, Handler, RenderContext};
use crate::server::response::ScriptContainer;
use anyhow::Context;
use minijinja::Environment;
use serde::Serialize;

/// Field carrying the CSRF token; shared with every node of a page.
pub const CSRF_FIELD: &str = "csrfmiddlewaretoken";

/// Name of the child placed into the document body.
pub const MAIN_CONTROL: &str = "mainControl";

const DOCUMENT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<title>{{ title }}</title>
<link rel="icon" href="{{ favicon }}" />
{% for file in stylesheets %}<link rel="stylesheet" type="text/css" href="{{ file }}" />
{% endfor %}{% for file in javascripts %}<script type="text/javascript" src="{{ file }}"></script>
{% endfor %}{% for fragment in head %}{{ fragment|safe }}
{% endfor %}</head>
<body>
{% if csrf_token %}<input type="hidden" name="csrfmiddlewaretoken" value="{{ csrf_token }}" />
{% endif %}{% for fragment in body %}{{ fragment|safe }}
{% endfor %}{% if scripts %}<script type="text/javascript">
{{ scripts|join("\n")|safe }}
</script>
{% endif %}</body>
</html>
"#;

/// Document under construction; `modify_document` may change any part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    pub title: String,
    pub favicon: String,
    /// Stylesheets (`.css`) and scripts (anything else)
    pub resource_files: Vec<String>,
    pub csrf_token: Option<String>,
    /// Raw markup appended to `<head>`
    pub head: Vec<String>,
    /// Raw markup fragments of `<body>`, in order
    pub body: Vec<String>,
    /// Script statements emitted at the end of `<body>`
    pub scripts: Vec<String>,
}

#[derive(Serialize)]
struct DocumentContext<'a> {
    title: &'a str,
    favicon: &'a str,
    stylesheets: Vec<&'a str>,
    javascripts: Vec<&'a str>,
    csrf_token: Option<&'a str>,
    head: &'a [String],
    body: &'a [String],
    scripts: &'a [String],
}

impl Document {
    pub fn to_html(&self) -> anyhow::Result<String> {
        let (stylesheets, javascripts): (Vec<&str>, Vec<&str>) = self
            .resource_files
            .iter()
            .map(String::as_str)
            .partition(|file| file.ends_with(".css"));

        let mut env = Environment::new();
        env.add_template("document.html", DOCUMENT_TEMPLATE)
            .context("Failed to parse document template")?;
        let template = env.get_template("document.html")?;
        let html = template
            .render(DocumentContext {
                title: &self.title,
                favicon: &self.favicon,
                stylesheets,
                javascripts,
                csrf_token: self.csrf_token.as_deref(),
                head: &self.head,
                body: &self.body,
                scripts: &self.scripts,
            })
            .context("Failed to render document")?;
        Ok(html)
    }
}

/// Hooks of a whole-page root. All have defaults.
pub trait Page: Send + Sync + 'static {
    /// Defaults to the declared type name of the root.
    fn title(&self, ctx: &RenderContext<'_>) -> String {
        ctx.meta().type_name.clone()
    }

    fn favicon(&self, _ctx: &RenderContext<'_>) -> String {
        "images/favicon.png".to_string()
    }

    fn resource_files(&self, _ctx: &RenderContext<'_>) -> Vec<String> {
        vec![
            "javascript/CommonJavascript.js".to_string(),
            "stylesheets/CommonStyleSheet.css".to_string(),
        ]
    }

    /// Token for the hidden CSRF field; by default the `csrftoken` cookie.
    fn csrf_token(&self, ctx: &RenderContext<'_>) -> Option<String> {
        Some(ctx.request().cookies.get_str("csrftoken"))
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    }

    /// Last chance to change the document before it is rendered.
    fn modify_document(&self, _document: &mut Document, _ctx: &mut RenderContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Adapts a [`Page`] into the root [`Handler`] of a tree.
pub struct PageHandler<P: Page> {
    page: P,
}

impl<P: Page> PageHandler<P> {
    pub fn new(page: P) -> Self {
        Self { page }
    }

    /// Declaration of a page root; the CSRF field is shared with all nodes.
    pub fn declare<F>(type_name: impl Into<String>, make: F) -> Declaration
    where
        F: Fn() -> P + Send + Sync + 'static,
    {
        Declaration::new(type_name, move || {
            Ok(Box::new(PageHandler::new(make())) as Box<dyn Handler>)
        })
        .shared_fields([CSRF_FIELD])
    }

    #[must_use]
    pub fn page(&self) -> &P {
        &self.page
    }
}

impl Declaration {
    /// Declare a `Default` page under its own type name.
    #[must_use]
    pub fn page<P: Page + Default>() -> Self {
        PageHandler::<P>::declare(short_type_name::<P>(), P::default)
    }
}

impl<P: Page> Handler for PageHandler<P> {
    fn render(&self, ctx: &mut RenderContext<'_>) -> anyhow::Result<String> {
        let mut scripts = ScriptContainer::new();
        scripts.add_script(ctx.tree().init_scripts().join("\n"));
        ctx.response_mut().scripts = Some(scripts);

        let mut document = Document {
            title: self.page.title(ctx),
            favicon: self.page.favicon(ctx),
            resource_files: self.page.resource_files(ctx),
            csrf_token: self.page.csrf_token(ctx),
            ..Document::default()
        };

        if ctx.tree().child(ctx.node(), MAIN_CONTROL).is_some() {
            document.body.push(ctx.place_child(MAIN_CONTROL)?);
        }

        self.page.modify_document(&mut document, ctx)?;

        if let Some(scripts) = &ctx.response().scripts {
            document.scripts.extend(scripts.scripts().iter().cloned());
        }
        document.to_html()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_html() {
        let document = Document {
            title: "Home".to_string(),
            favicon: "images/favicon.png".to_string(),
            resource_files: vec!["a.js".to_string(), "b.css".to_string()],
            csrf_token: Some("tok".to_string()),
            head: Vec::new(),
            body: vec!["<p>hi</p>".to_string()],
            scripts: vec!["one();".to_string(), "two();".to_string()],
        };
        let html = document.to_html().unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Home</title>"));
        assert!(html.contains("<link rel=\"stylesheet\" type=\"text/css\" href=\"b.css\" />"));
        assert!(html.contains("<script type=\"text/javascript\" src=\"a.js\"></script>"));
        assert!(html.contains("name=\"csrfmiddlewaretoken\" value=\"tok\""));
        assert!(html.contains("<p>hi</p>"));
        assert!(html.contains("one();\ntwo();"));
    }

    #[test]
    fn test_title_is_escaped() {
        let document = Document {
            title: "<Tom & Jerry>".to_string(),
            ..Document::default()
        };
        let html = document.to_html().unwrap();
        assert!(html.contains("<title>&lt;Tom &amp; Jerry&gt;</title>"));
        assert!(!html.contains("csrfmiddlewaretoken"));
        assert!(!html.contains("<script type=\"text/javascript\">"));
    }
}
