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

/// Inline code spans.
#[derive(Debug, Default)]
pub struct CodeExtension {
  slot: EditorSlot,
}

impl CodeExtension {
  pub fn new() -> Self {
    CodeExtension::default()
  }
}

impl Extension for CodeExtension {
  fn name(&self) -> &'static str {
    "code"
  }

  fn slot(&self) -> &EditorSlot {
    &self.slot
  }

  fn marks(&self) -> Vec<(String, MarkSpec)> {
    vec![("code".to_string(), MarkSpec {
      parse_html: vec![ParseRule::tag("code")],
      render_html: Some(HtmlRender::Tag("code".to_string())),
      ..MarkSpec::default()
    })]
  }

  fn add_commands(&self, registry: &mut CommandRegistry) {
    registry.register(
      "toggleCode",
      "Toggle inline code on the selection",
      |ctx, _args| basic::toggle_mark(ctx, "code", Attrs::new()),
    );
  }

  fn add_keybindings(&self) -> Vec<(String, CommandCall)> {
    vec![("Mod-e".to_string(), CommandCall::bare("toggleCode"))]
  }

  fn add_input_rules(&self, schema: &Schema) -> Vec<InputRule> {
    if schema.mark_type("code").is_none() {
      return Vec::new();
    }
    match mark_input_rule(r"(`([^`]+)`)$", "code") {
      Ok(rule) => vec![rule],
      Err(err) => {
        warn!(%err, "invalid code input rule");
        Vec::new()
      },
    }
  }

  fn add_paste_rules(&self, schema: &Schema) -> Vec<PasteRule> {
    if schema.mark_type("code").is_none() {
      return Vec::new();
    }
    match mark_paste_rule(r"(`([^`]+)`)", "code") {
      Ok(rule) => vec![rule],
      Err(err) => {
        warn!(%err, "invalid code paste rule");
        Vec::new()
      },
    }
  }
}
