use tracing::warn;
use vellum_core::{
  basic,
  commands::{
    CommandMeta,
    CommandRegistry,
    MetaField,
  },
  extension::{
    CommandCall,
    EditorSlot,
    Extension,
    QuickInsertSource,
  },
  input_rules::InputRule,
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
pub struct HorizontalRuleExtension {
  slot: EditorSlot,
}

impl HorizontalRuleExtension {
  pub fn new() -> Self {
    HorizontalRuleExtension::default()
  }
}

impl Extension for HorizontalRuleExtension {
  fn name(&self) -> &'static str {
    "horizontal_rule"
  }

  fn slot(&self) -> &EditorSlot {
    &self.slot
  }

  fn nodes(&self) -> Vec<(String, NodeSpec)> {
    vec![("horizontal_rule".to_string(), NodeSpec {
      group: Some("block".to_string()),
      parse_html: vec![ParseRule::tag("hr")],
      render_html: Some(HtmlRender::Void("hr".to_string())),
      ..NodeSpec::default()
    })]
  }

  fn add_commands(&self, registry: &mut CommandRegistry) {
    registry.register_with_meta(
      "setHorizontalRule",
      "Insert a horizontal rule after the current block",
      CommandMeta::new()
        .icon(MetaField::fixed("separator"))
        .label(MetaField::fixed("Divider"))
        .markdown(MetaField::fixed("---")),
      |ctx, _args| basic::insert_node(ctx, "horizontal_rule", Attrs::new()),
    );
  }

  fn quick_insert(&self) -> Option<&dyn QuickInsertSource> {
    Some(self)
  }

  fn add_input_rules(&self, schema: &Schema) -> Vec<InputRule> {
    if schema.node_type("horizontal_rule").is_none() {
      return Vec::new();
    }
    // Typing `---`, `___`, or `***` alone on a line drops a rule above the
    // (now empty) block.
    let rule = InputRule::new(r"^(?:---|___|\*\*\*)$", |tr, m| {
      let Some(whole) = m.group(0) else {
        return false;
      };
      let Some(type_) = tr.schema().node_type("horizontal_rule") else {
        return false;
      };
      let from = whole.from;
      if tr.delete(from, whole.to).is_err() {
        return false;
      }
      let Ok(rp) = tr.doc().resolve(tr.selection().head) else {
        return false;
      };
      let before = rp.before(rp.depth());
      tr.insert_blocks(before, vec![type_.create(Attrs::new(), Vec::new())])
        .is_ok()
    });
    match rule {
      Ok(rule) => vec![rule],
      Err(err) => {
        warn!(%err, "invalid horizontal rule input rule");
        Vec::new()
      },
    }
  }
}

impl QuickInsertSource for HorizontalRuleExtension {
  fn quick_insert_calls(&self) -> Vec<CommandCall> {
    vec![CommandCall::bare("setHorizontalRule")]
  }
}
