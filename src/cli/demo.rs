//! Built-in demo page used by the `dynform` binary.
//!
//! ```text
//! demoPage                 (page document, shares csrfmiddlewaretoken)
//! └── mainControl          (shares user)
//!     ├── greeting         (template UI, grabs name)
//!     ├── clock            (loaded by AJAX, reloads every 30s)
//!     ├── signup           (POST form with validation)
//!     └── broken           (always fails; only reachable by dispatch)
//! ```

use crate::control::{AutoLoad, AutoReload, ControlHandler, Element, PageControl, TemplateUi, Ui};
use crate::handler::{Declaration, RenderContext};
use crate::page::Page;
use crate::server::Cookie;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const GREETING_TEMPLATE: &str =
    "<p class=\"Greeting\" data-control=\"{{ id }}\">Hello {{ data.name }}!{% if not editable %} (read only){% endif %}</p>";

#[derive(Default)]
struct DemoPage;

impl Page for DemoPage {}

#[derive(Default)]
struct MainControl;

impl PageControl for MainControl {
    type Ui = Element;

    fn build_ui(&self, ctx: &mut RenderContext<'_>) -> anyhow::Result<Element> {
        let mut ui = Element::new("div").with_class("MainControl");
        for child in ["greeting", "clock", "signup"] {
            ui.push(Element::raw(ctx.place_child(child)?));
        }
        Ok(ui)
    }
}

#[derive(Default)]
struct Greeting;

impl PageControl for Greeting {
    type Ui = TemplateUi;

    fn build_ui(&self, ctx: &mut RenderContext<'_>) -> anyhow::Result<TemplateUi> {
        let mut ui = TemplateUi::new(GREETING_TEMPLATE);
        ui.set_id(ctx.render_id());
        Ok(ui)
    }

    fn set_ui_data(&self, ui: &mut TemplateUi, ctx: &mut RenderContext<'_>) -> anyhow::Result<()> {
        let fields = ctx.grabbed_fields();
        let name = fields.first("name", "");
        ui.set_data("name", if name.is_empty() { "stranger" } else { name });
        Ok(())
    }

    fn can_edit(&self, ctx: &RenderContext<'_>) -> bool {
        ctx.request().user.is_some() || !ctx.request().fields.get_str("user").is_empty()
    }
}

#[derive(Default)]
struct Clock;

impl PageControl for Clock {
    type Ui = Element;

    fn build_ui(&self, _ctx: &mut RenderContext<'_>) -> anyhow::Result<Element> {
        Ok(Element::new("span").with_class("Clock"))
    }

    fn set_ui_data(&self, ui: &mut Element, _ctx: &mut RenderContext<'_>) -> anyhow::Result<()> {
        let seconds = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        ui.set_text(format!("{seconds}"));
        Ok(())
    }

    fn auto_load(&self) -> AutoLoad {
        AutoLoad::Ajax
    }

    fn auto_reload(&self) -> Option<AutoReload> {
        Some(AutoReload {
            interval: Duration::from_secs(30),
            silent: true,
        })
    }
}

#[derive(Default)]
struct Signup;

impl PageControl for Signup {
    type Ui = Element;

    fn build_ui(&self, _ctx: &mut RenderContext<'_>) -> anyhow::Result<Element> {
        Ok(Element::new("form").with_class("Signup"))
    }

    fn init_ui(&self, ui: &mut Element, _ctx: &mut RenderContext<'_>) -> anyhow::Result<()> {
        ui.push(Element::new("input").with_attribute("name", "email"));
        Ok(())
    }

    fn populate_ui(&self, ui: &mut Element, ctx: &mut RenderContext<'_>) -> anyhow::Result<()> {
        let email = ctx.request().fields.first("email", "").to_string();
        if !email.contains('@') {
            ui.add_error(format!("'{email}' is not an email address"));
        }
        ui.push(Element::hidden("submitted", &email));
        Ok(())
    }

    fn process_post(&self, ui: &mut Element, ctx: &mut RenderContext<'_>) -> anyhow::Result<()> {
        let email = ctx.request().fields.first("email", "").to_string();
        ctx.response_mut()
            .set_cookie(Cookie::new("signedUp", email).max_age(3600).http_only(true));
        ui.push(Element::label("Thanks for signing up"));
        Ok(())
    }

    fn set_ui_data(&self, ui: &mut Element, _ctx: &mut RenderContext<'_>) -> anyhow::Result<()> {
        let errors: Vec<String> = ui.errors().to_vec();
        for error in errors {
            ui.push(Element::label(error).with_class("Error"));
        }
        Ok(())
    }
}

/// Declaration of the demo page.
#[must_use]
pub fn demo_page() -> Declaration {
    Declaration::page::<DemoPage>().child(
        Declaration::control::<MainControl>()
            .shared_fields(["user"])
            .child(Declaration::control::<Greeting>().grab_fields(["name"]))
            .child(Declaration::control::<Clock>())
            .child(Declaration::control::<Signup>())
            .child(ControlHandler::<Signup>::declare("AbstractSignupBase", Signup::default))
            .child(Declaration::from_fn("Broken", |_| {
                Err(anyhow::anyhow!("demo failure"))
            })),
    )
}
