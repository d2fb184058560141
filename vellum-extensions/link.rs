use serde_json::json;
use vellum_core::{
  commands::CommandRegistry,
  extension::{
    EditorSlot,
    Extension,
  },
};
use vellum_model::{
  schema::{
    AttrSpec,
    HtmlRender,
    ParseRule,
  },
  Attrs,
  Mark,
  MarkSpec,
};

/// Links carry an `href` attribute, so they get explicit set/unset commands
/// instead of a bare toggle.
#[derive(Debug, Default)]
pub struct LinkExtension {
  slot: EditorSlot,
}

impl LinkExtension {
  pub fn new() -> Self {
    LinkExtension::default()
  }
}

impl Extension for LinkExtension {
  fn name(&self) -> &'static str {
    "link"
  }

  fn slot(&self) -> &EditorSlot {
    &self.slot
  }

  fn marks(&self) -> Vec<(String, MarkSpec)> {
    let mut attrs = indexmap::IndexMap::new();
    attrs.insert("href".to_string(), AttrSpec::with_default(json!("")));
    vec![("link".to_string(), MarkSpec {
      attrs,
      parse_html: vec![ParseRule::tag("a").capture_attr("href")],
      render_html: Some(HtmlRender::Tag("a".to_string())),
    })]
  }

  fn add_commands(&self, registry: &mut CommandRegistry) {
    registry.register(
      "setLink",
      "Mark the selection as a link to the given href",
      |ctx, args| {
        if ctx.tr.schema().mark_type("link").is_none() {
          return false;
        }
        let Some(href) = args.str("href") else {
          return false;
        };
        let sel = ctx.tr.selection();
        if sel.is_empty() {
          return false;
        }
        let mut attrs = Attrs::new();
        attrs.insert("href".to_string(), json!(href));
        ctx
          .tr
          .add_mark(sel.from(), sel.to(), Mark::with_attrs("link", attrs))
          .is_ok()
      },
    );
    registry.register("unsetLink", "Remove link marks from the selection", |ctx, _args| {
      let sel = ctx.tr.selection();
      if sel.is_empty() {
        return false;
      }
      ctx.tr.remove_mark(sel.from(), sel.to(), "link").is_ok()
    });
  }
}
