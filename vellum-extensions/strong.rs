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
    ShortcutGuide,
    ShortcutGuideSource,
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
pub struct StrongExtension {
  slot: EditorSlot,
}

impl StrongExtension {
  pub fn new() -> Self {
    StrongExtension::default()
  }
}

impl Extension for StrongExtension {
  fn name(&self) -> &'static str {
    "strong"
  }

  fn slot(&self) -> &EditorSlot {
    &self.slot
  }

  fn marks(&self) -> Vec<(String, MarkSpec)> {
    vec![("strong".to_string(), MarkSpec {
      parse_html: vec![ParseRule::tag("strong"), ParseRule::tag("b")],
      render_html: Some(HtmlRender::Tag("strong".to_string())),
      ..MarkSpec::default()
    })]
  }

  fn add_commands(&self, registry: &mut CommandRegistry) {
    registry.register_with_meta(
      "toggleBold",
      "Toggle strong emphasis on the selection",
      CommandMeta::new()
        .icon(MetaField::fixed("bold"))
        .label(MetaField::fixed("Bold"))
        .markdown(MetaField::fixed("**bold**"))
        .shortcut(MetaField::fixed("Mod-b")),
      |ctx, _args| basic::toggle_mark(ctx, "strong", Attrs::new()),
    );
  }

  fn shortcut_guide(&self) -> Option<&dyn ShortcutGuideSource> {
    Some(self)
  }

  fn add_keybindings(&self) -> Vec<(String, CommandCall)> {
    vec![
      ("Mod-b".to_string(), CommandCall::bare("toggleBold")),
      ("Mod-B".to_string(), CommandCall::bare("toggleBold")),
    ]
  }

  fn add_input_rules(&self, schema: &Schema) -> Vec<InputRule> {
    if schema.mark_type("strong").is_none() {
      return Vec::new();
    }
    match mark_input_rule(r"(?:^|[^*])(\*\*([^*]+)\*\*)$", "strong") {
      Ok(rule) => vec![rule],
      Err(err) => {
        warn!(%err, "invalid strong input rule");
        Vec::new()
      },
    }
  }

  fn add_paste_rules(&self, schema: &Schema) -> Vec<PasteRule> {
    if schema.mark_type("strong").is_none() {
      return Vec::new();
    }
    match mark_paste_rule(r"(\*\*([^*]+)\*\*)", "strong") {
      Ok(rule) => vec![rule],
      Err(err) => {
        warn!(%err, "invalid strong paste rule");
        Vec::new()
      },
    }
  }
}

impl ShortcutGuideSource for StrongExtension {
  fn shortcut_guides(&self) -> Vec<ShortcutGuide> {
    vec![ShortcutGuide {
      icon:     "bold".to_string(),
      label:    "Bold".to_string(),
      shortcut: Some("Mod-b".to_string()),
      markdown: Some("**bold**".to_string()),
    }]
  }
}
