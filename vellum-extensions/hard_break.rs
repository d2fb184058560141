use vellum_core::{
  basic,
  commands::CommandRegistry,
  extension::{
    CommandCall,
    EditorSlot,
    Extension,
  },
};
use vellum_model::{
  schema::{
    HtmlRender,
    ParseRule,
  },
  Attrs,
  NodeSpec,
};

/// Inline line breaks within a textblock.
#[derive(Debug, Default)]
pub struct HardBreakExtension {
  slot: EditorSlot,
}

impl HardBreakExtension {
  pub fn new() -> Self {
    HardBreakExtension::default()
  }
}

impl Extension for HardBreakExtension {
  fn name(&self) -> &'static str {
    "hard_break"
  }

  fn slot(&self) -> &EditorSlot {
    &self.slot
  }

  fn nodes(&self) -> Vec<(String, NodeSpec)> {
    vec![("hard_break".to_string(), NodeSpec {
      group: Some("inline".to_string()),
      inline: true,
      parse_html: vec![ParseRule::tag("br")],
      render_html: Some(HtmlRender::Void("br".to_string())),
      ..NodeSpec::default()
    })]
  }

  fn add_commands(&self, registry: &mut CommandRegistry) {
    registry.register(
      "setHardBreak",
      "Insert a line break at the cursor",
      |ctx, _args| basic::insert_node(ctx, "hard_break", Attrs::new()),
    );
  }

  fn add_keybindings(&self) -> Vec<(String, CommandCall)> {
    vec![
      ("Shift-Enter".to_string(), CommandCall::bare("setHardBreak")),
      ("Mod-Enter".to_string(), CommandCall::bare("setHardBreak")),
    ]
  }
}
