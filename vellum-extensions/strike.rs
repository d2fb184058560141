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
pub struct StrikeExtension {
  slot: EditorSlot,
}

impl StrikeExtension {
  pub fn new() -> Self {
    StrikeExtension::default()
  }
}

impl Extension for StrikeExtension {
  fn name(&self) -> &'static str {
    "strike"
  }

  fn slot(&self) -> &EditorSlot {
    &self.slot
  }

  fn marks(&self) -> Vec<(String, MarkSpec)> {
    vec![("strike".to_string(), MarkSpec {
      parse_html: vec![
        ParseRule::tag("s"),
        ParseRule::tag("del"),
        ParseRule::tag("strike"),
      ],
      render_html: Some(HtmlRender::Tag("s".to_string())),
      ..MarkSpec::default()
    })]
  }

  fn add_commands(&self, registry: &mut CommandRegistry) {
    registry.register(
      "toggleStrike",
      "Toggle strikethrough on the selection",
      |ctx, _args| basic::toggle_mark(ctx, "strike", Attrs::new()),
    );
  }

  fn add_keybindings(&self) -> Vec<(String, CommandCall)> {
    vec![("Mod-Shift-x".to_string(), CommandCall::bare("toggleStrike"))]
  }

  fn add_input_rules(&self, schema: &Schema) -> Vec<InputRule> {
    if schema.mark_type("strike").is_none() {
      return Vec::new();
    }
    match mark_input_rule(r"(~~([^~]+)~~)$", "strike") {
      Ok(rule) => vec![rule],
      Err(err) => {
        warn!(%err, "invalid strike input rule");
        Vec::new()
      },
    }
  }

  fn add_paste_rules(&self, schema: &Schema) -> Vec<PasteRule> {
    if schema.mark_type("strike").is_none() {
      return Vec::new();
    }
    match mark_paste_rule(r"(~~([^~]+)~~)", "strike") {
      Ok(rule) => vec![rule],
      Err(err) => {
        warn!(%err, "invalid strike paste rule");
        Vec::new()
      },
    }
  }
}
