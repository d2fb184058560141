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

/// The default textblock. Nearly every other block extension assumes it is
/// present.
#[derive(Debug, Default)]
pub struct ParagraphExtension {
  slot: EditorSlot,
}

impl ParagraphExtension {
  pub fn new() -> Self {
    ParagraphExtension::default()
  }
}

impl Extension for ParagraphExtension {
  fn name(&self) -> &'static str {
    "paragraph"
  }

  fn slot(&self) -> &EditorSlot {
    &self.slot
  }

  fn nodes(&self) -> Vec<(String, NodeSpec)> {
    vec![("paragraph".to_string(), NodeSpec {
      content: Some("inline*".to_string()),
      group: Some("block".to_string()),
      parse_html: vec![ParseRule::tag("p")],
      render_html: Some(HtmlRender::Tag("p".to_string())),
      ..NodeSpec::default()
    })]
  }

  fn add_commands(&self, registry: &mut CommandRegistry) {
    registry.register(
      "setParagraph",
      "Retype the selected blocks as paragraphs",
      |ctx, _args| basic::set_block_type(ctx, "paragraph", Attrs::new()),
    );
  }

  fn add_keybindings(&self) -> Vec<(String, CommandCall)> {
    vec![("Mod-Alt-0".to_string(), CommandCall::bare("setParagraph"))]
  }
}
