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
    textblock_input_rule,
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

/// Preformatted code blocks. The `code` flag makes Enter insert a newline
/// instead of splitting the block.
#[derive(Debug, Default)]
pub struct CodeBlockExtension {
  slot: EditorSlot,
}

impl CodeBlockExtension {
  pub fn new() -> Self {
    CodeBlockExtension::default()
  }
}

impl Extension for CodeBlockExtension {
  fn name(&self) -> &'static str {
    "code_block"
  }

  fn slot(&self) -> &EditorSlot {
    &self.slot
  }

  fn requires(&self) -> Vec<&'static str> {
    vec!["paragraph"]
  }

  fn nodes(&self) -> Vec<(String, NodeSpec)> {
    vec![("code_block".to_string(), NodeSpec {
      content: Some("inline*".to_string()),
      group: Some("block".to_string()),
      defining: true,
      code: true,
      parse_html: vec![ParseRule::tag("pre")],
      render_html: Some(HtmlRender::Tag("pre".to_string())),
      ..NodeSpec::default()
    })]
  }

  fn add_commands(&self, registry: &mut CommandRegistry) {
    registry.register(
      "toggleCodeBlock",
      "Toggle the selected blocks between code block and paragraph",
      |ctx, _args| {
        let sel = ctx.tr.selection();
        let in_code = ctx
          .tr
          .doc()
          .resolve(sel.from())
          .map(|rp| rp.parent().type_name() == "code_block")
          .unwrap_or(false);
        if in_code {
          basic::set_block_type(ctx, "paragraph", Attrs::new())
        } else {
          basic::set_block_type(ctx, "code_block", Attrs::new())
        }
      },
    );
  }

  fn add_keybindings(&self) -> Vec<(String, CommandCall)> {
    vec![("Mod-Alt-c".to_string(), CommandCall::bare("toggleCodeBlock"))]
  }

  fn add_input_rules(&self, schema: &Schema) -> Vec<InputRule> {
    if schema.node_type("code_block").is_none() {
      return Vec::new();
    }
    match textblock_input_rule(r"^```$", "code_block", |_m| Attrs::new()) {
      Ok(rule) => vec![rule],
      Err(err) => {
        warn!(%err, "invalid code block input rule");
        Vec::new()
      },
    }
  }
}
