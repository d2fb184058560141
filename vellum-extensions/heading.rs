use serde_json::{
  json,
  Value,
};
use tracing::warn;
use vellum_core::{
  basic,
  commands::{
    CommandArgs,
    CommandContext,
    CommandMeta,
    CommandRegistry,
    MetaField,
  },
  extension::{
    CommandCall,
    EditorSlot,
    Extension,
    QuickInsertSource,
    ShortcutGuide,
    ShortcutGuideSource,
  },
  input_rules::{
    textblock_input_rule,
    InputRule,
  },
};
use vellum_model::{
  schema::{
    AttrSpec,
    HtmlRender,
    ParseRule,
  },
  Attrs,
  NodeSpec,
  Schema,
};

#[derive(Debug)]
pub struct HeadingExtension {
  slot:   EditorSlot,
  levels: Vec<u64>,
}

impl Default for HeadingExtension {
  fn default() -> Self {
    HeadingExtension {
      slot:   EditorSlot::new(),
      levels: (1..=6).collect(),
    }
  }
}

impl HeadingExtension {
  pub fn new() -> Self {
    HeadingExtension::default()
  }

  /// Restrict which levels the commands and input rule accept.
  pub fn with_levels(levels: Vec<u64>) -> Self {
    HeadingExtension {
      slot: EditorSlot::new(),
      levels,
    }
  }
}

fn arg_level(args: &CommandArgs) -> u64 {
  args.u64("level").unwrap_or(1)
}

/// The level of the heading the selection starts in, if any.
fn current_level(ctx: &CommandContext<'_>) -> Option<u64> {
  let sel = ctx.tr.selection();
  let rp = ctx.tr.doc().resolve(sel.from()).ok()?;
  if rp.parent().type_name() != "heading" {
    return None;
  }
  rp.parent().attr("level").and_then(Value::as_u64)
}

impl Extension for HeadingExtension {
  fn name(&self) -> &'static str {
    "heading"
  }

  fn slot(&self) -> &EditorSlot {
    &self.slot
  }

  fn requires(&self) -> Vec<&'static str> {
    vec!["paragraph"]
  }

  fn nodes(&self) -> Vec<(String, NodeSpec)> {
    let mut attrs = indexmap::IndexMap::new();
    attrs.insert("level".to_string(), AttrSpec::with_default(json!(1)));
    let parse_html = (1..=6)
      .map(|level| ParseRule::tag(format!("h{level}")).with_attr("level", json!(level)))
      .collect();
    vec![("heading".to_string(), NodeSpec {
      content: Some("inline*".to_string()),
      group: Some("block".to_string()),
      attrs,
      defining: true,
      parse_html,
      render_html: Some(HtmlRender::TagByAttr {
        prefix: "h".to_string(),
        attr:   "level".to_string(),
      }),
      ..NodeSpec::default()
    })]
  }

  fn add_commands(&self, registry: &mut CommandRegistry) {
    let levels = self.levels.clone();
    registry.register_with_meta(
      "setHeading",
      "Retype the selected blocks as a heading of the given level",
      CommandMeta::new()
        .icon(MetaField::derived(|args| format!("h-{}", arg_level(args))))
        .label(MetaField::derived(|args| {
          format!("Heading {}", arg_level(args))
        }))
        .markdown(MetaField::derived(|args| {
          "#".repeat(arg_level(args) as usize)
        }))
        .shortcut(MetaField::derived(|args| {
          format!("Mod-Shift-{}", arg_level(args))
        })),
      move |ctx, args| {
        let level = arg_level(args);
        if !levels.contains(&level) {
          return false;
        }
        let mut attrs = Attrs::new();
        attrs.insert("level".to_string(), json!(level));
        basic::set_block_type(ctx, "heading", attrs)
      },
    );
    let levels = self.levels.clone();
    registry.register(
      "toggleHeading",
      "Toggle between a heading of the given level and a paragraph",
      move |ctx, args| {
        let level = arg_level(args);
        if !levels.contains(&level) {
          return false;
        }
        if current_level(ctx) == Some(level) {
          return basic::set_block_type(ctx, "paragraph", Attrs::new());
        }
        let mut attrs = Attrs::new();
        attrs.insert("level".to_string(), json!(level));
        basic::set_block_type(ctx, "heading", attrs)
      },
    );
  }

  fn add_keybindings(&self) -> Vec<(String, CommandCall)> {
    self
      .levels
      .iter()
      .map(|level| {
        (
          format!("Mod-Shift-{level}"),
          CommandCall::with_args(
            "toggleHeading",
            CommandArgs::from_value(json!({ "level": level })),
          ),
        )
      })
      .collect()
  }

  fn shortcut_guide(&self) -> Option<&dyn ShortcutGuideSource> {
    Some(self)
  }

  fn quick_insert(&self) -> Option<&dyn QuickInsertSource> {
    Some(self)
  }

  fn add_input_rules(&self, schema: &Schema) -> Vec<InputRule> {
    if schema.node_type("heading").is_none() {
      return Vec::new();
    }
    let max = self.levels.iter().max().copied().unwrap_or(6);
    let pattern = format!(r"^(#{{1,{max}}})\s$");
    match textblock_input_rule(&pattern, "heading", |m| {
      let level = m.group(1).map(|g| g.text.chars().count()).unwrap_or(1);
      let mut attrs = Attrs::new();
      attrs.insert("level".to_string(), json!(level));
      attrs
    }) {
      Ok(rule) => vec![rule],
      Err(err) => {
        warn!(%err, "invalid heading input rule");
        Vec::new()
      },
    }
  }
}

impl ShortcutGuideSource for HeadingExtension {
  fn shortcut_guides(&self) -> Vec<ShortcutGuide> {
    self
      .levels
      .iter()
      .map(|level| ShortcutGuide {
        icon:     format!("h-{level}"),
        label:    format!("Heading {level}"),
        shortcut: Some(format!("Mod-Shift-{level}")),
        markdown: Some("#".repeat(*level as usize)),
      })
      .collect()
  }
}

impl QuickInsertSource for HeadingExtension {
  fn quick_insert_calls(&self) -> Vec<CommandCall> {
    self
      .levels
      .iter()
      .map(|level| {
        CommandCall::with_args(
          "setHeading",
          CommandArgs::from_value(json!({ "level": level })),
        )
      })
      .collect()
  }
}
