use tracing::warn;
use vellum_core::{
  basic,
  commands::CommandRegistry,
  extension::{
    CommandCall,
    EditorSlot,
    Extension,
  },
  input_rules::{
    mark_input_rule,
    InputRule,
  },
  paste_rules::{
    mark_paste_rule,
    PasteRule,
  },
};
use vellum_model::{
  schema::{
    HtmlRender,
    ParseRule,
  },
  Attrs,
  MarkSpec,
  Schema,
};

#[derive(Debug, Default)]
pub struct EmExtension {
  slot: EditorSlot,
}

impl EmExtension {
  pub fn new() -> Self {
    EmExtension::default()
  }
}

impl Extension for EmExtension {
  fn name(&self) -> &'static str {
    "em"
  }

  fn slot(&self) -> &EditorSlot {
    &self.slot
  }

  fn marks(&self) -> Vec<(String, MarkSpec)> {
    vec![("em".to_string(), MarkSpec {
      parse_html: vec![ParseRule::tag("em"), ParseRule::tag("i")],
      render_html: Some(HtmlRender::Tag("em".to_string())),
      ..MarkSpec::default()
    })]
  }

  fn add_commands(&self, registry: &mut CommandRegistry) {
    registry.register(
      "toggleItalic",
      "Toggle emphasis on the selection",
      |ctx, _args| basic::toggle_mark(ctx, "em", Attrs::new()),
    );
  }

  fn add_keybindings(&self) -> Vec<(String, CommandCall)> {
    vec![
      ("Mod-i".to_string(), CommandCall::bare("toggleItalic")),
      ("Mod-I".to_string(), CommandCall::bare("toggleItalic")),
    ]
  }

  fn add_input_rules(&self, schema: &Schema) -> Vec<InputRule> {
    if schema.mark_type("em").is_none() {
      return Vec::new();
    }
    // A single-star pair; the guard keeps it from eating `**bold**`.
    match mark_input_rule(r"(?:^|[^*])(\*([^*]+)\*)$", "em") {
      Ok(rule) => vec![rule],
      Err(err) => {
        warn!(%err, "invalid em input rule");
        Vec::new()
      },
    }
  }

  fn add_paste_rules(&self, schema: &Schema) -> Vec<PasteRule> {
    if schema.mark_type("em").is_none() {
      return Vec::new();
    }
    match mark_paste_rule(r"(?:^|[^*])(\*([^*]+)\*)(?:[^*]|$)", "em") {
      Ok(rule) => vec![rule],
      Err(err) => {
        warn!(%err, "invalid em paste rule");
        Vec::new()
      },
    }
  }
}
