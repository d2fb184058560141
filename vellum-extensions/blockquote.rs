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
    wrapping_input_rule,
    InputRule,
  },
};
use vellum_model::{
  schema::{
    HtmlRender,
    ParseRule,
  },
  Attrs,
  NodeSpec,
  Schema,
};

#[derive(Debug, Default)]
pub struct BlockquoteExtension {
  slot: EditorSlot,
}

impl BlockquoteExtension {
  pub fn new() -> Self {
    BlockquoteExtension::default()
  }
}

impl Extension for BlockquoteExtension {
  fn name(&self) -> &'static str {
    "blockquote"
  }

  fn slot(&self) -> &EditorSlot {
    &self.slot
  }

  fn requires(&self) -> Vec<&'static str> {
    vec!["paragraph"]
  }

  fn nodes(&self) -> Vec<(String, NodeSpec)> {
    vec![("blockquote".to_string(), NodeSpec {
      content: Some("block+".to_string()),
      group: Some("block".to_string()),
      defining: true,
      parse_html: vec![ParseRule::tag("blockquote")],
      render_html: Some(HtmlRender::Tag("blockquote".to_string())),
      ..NodeSpec::default()
    })]
  }

  fn add_commands(&self, registry: &mut CommandRegistry) {
    registry.register(
      "toggleBlockquote",
      "Wrap the selection in a blockquote, or lift it back out",
      |ctx, _args| {
        if basic::wrap_in(ctx, "blockquote", Attrs::new()) {
          return true;
        }
        basic::lift_block(ctx)
      },
    );
  }

  fn add_keybindings(&self) -> Vec<(String, CommandCall)> {
    vec![(
      "Ctrl->".to_string(),
      CommandCall::bare("toggleBlockquote"),
    )]
  }

  fn add_input_rules(&self, schema: &Schema) -> Vec<InputRule> {
    if schema.node_type("blockquote").is_none() {
      return Vec::new();
    }
    match wrapping_input_rule(r"^\s*>\s$", "blockquote") {
      Ok(rule) => vec![rule],
      Err(err) => {
        warn!(%err, "invalid blockquote input rule");
        Vec::new()
      },
    }
  }
}
