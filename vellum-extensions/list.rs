//! Bullet and ordered lists.
//!
//! Lists are two levels of wrapping (`bullet_list > list_item > paragraph`),
//! so they get their own commands instead of leaning on the generic wrap and
//! lift: toggling wraps or unwraps both levels, and Enter splits the list
//! item rather than the paragraph.

use tracing::warn;
use vellum_core::{
  commands::{
    CommandContext,
    CommandRegistry,
  },
  extension::{
    CommandCall,
    EditorSlot,
    Extension,
  },
  input_rules::InputRule,
};
use vellum_model::{
  node::{
    BlockRange,
    Fragment,
  },
  schema::{
    HtmlRender,
    ParseRule,
  },
  Attrs,
  NodeSpec,
  Schema,
  Selection,
  Transaction,
};

#[derive(Debug, Default)]
pub struct ListExtension {
  slot: EditorSlot,
}

impl ListExtension {
  pub fn new() -> Self {
    ListExtension::default()
  }
}

/// Depth of the nearest ancestor of the given type, if any.
fn ancestor_depth(tr: &Transaction, pos: usize, type_name: &str) -> Option<usize> {
  let rp = tr.doc().resolve(pos).ok()?;
  (1..=rp.depth())
    .rev()
    .find(|&d| rp.node(d).type_name() == type_name)
}

fn wrap_in_list(ctx: &mut CommandContext<'_>, list_name: &str) -> bool {
  let (Some(list), Some(item)) = (
    ctx.tr.schema().node_type(list_name),
    ctx.tr.schema().node_type("list_item"),
  ) else {
    return false;
  };
  let sel = ctx.tr.selection();
  ctx
    .tr
    .wrap(sel.from(), sel.to(), &[
      (list, Attrs::new()),
      (item, Attrs::new()),
    ])
    .is_ok()
}

/// Lift the selection out of its list item, then out of the list itself.
fn lift_out_of_list(ctx: &mut CommandContext<'_>) -> bool {
  let sel = ctx.tr.selection();
  if ctx.tr.lift(sel.from(), sel.to()).is_err() {
    return false;
  }
  let sel = ctx.tr.selection();
  ctx.tr.lift(sel.from(), sel.to()).is_ok()
}

fn toggle_list(ctx: &mut CommandContext<'_>, list_name: &str) -> bool {
  let sel = ctx.tr.selection();
  match ancestor_depth(ctx.tr, sel.from(), list_name) {
    Some(_) => lift_out_of_list(ctx),
    None => wrap_in_list(ctx, list_name),
  }
}

/// Split the current list item at the cursor, producing two items.
fn split_list_item(ctx: &mut CommandContext<'_>) -> bool {
  if !ctx.tr.selection().is_empty() && ctx.tr.delete_selection().is_err() {
    return false;
  }
  let pos = ctx.tr.selection().head;
  let Ok(rp) = ctx.tr.doc().resolve(pos) else {
    return false;
  };
  let d = rp.depth();
  if d < 2 || !rp.parent().is_textblock() || rp.node(d - 1).type_name() != "list_item" {
    return false;
  }

  let schema = ctx.tr.schema().clone();
  let para = rp.parent().clone();
  let item = rp.node(d - 1).clone();
  let tokens = para.inline_tokens();
  let left = para.with_inline_tokens(&schema, tokens[..rp.parent_offset].to_vec());
  let right = para.with_inline_tokens(&schema, tokens[rp.parent_offset..].to_vec());

  let para_index = rp.index_in(d - 1);
  let children = item.content().to_vec();
  let mut first = children[..para_index].to_vec();
  first.push(left);
  let mut second = vec![right];
  second.extend(children[para_index + 1..].to_vec());
  let item_before = item.with_content(Fragment::from(first));
  let item_after = item.with_content(Fragment::from(second));

  let range = BlockRange {
    depth:       d - 2,
    parent_path: rp.path_to(d - 2),
    start_index: rp.index_in(d - 2),
    end_index:   rp.index_in(d - 2) + 1,
    start_pos:   rp.before(d - 1),
    end_pos:     rp.after(d - 1),
  };
  let cursor = range.start_pos + item_before.node_size() + 2;
  if ctx
    .tr
    .splice_blocks(&range, vec![item_before, item_after])
    .is_err()
  {
    return false;
  }
  ctx.tr.set_selection(Selection::point(cursor));
  true
}

fn two_level_wrap_rule(pattern: &str, list_name: &'static str) -> Option<InputRule> {
  let rule = InputRule::new(pattern, move |tr, m| {
    let Some(whole) = m.group(0) else {
      return false;
    };
    let (Some(list), Some(item)) = (
      tr.schema().node_type(list_name),
      tr.schema().node_type("list_item"),
    ) else {
      return false;
    };
    let from = whole.from;
    if tr.delete(from, whole.to).is_err() {
      return false;
    }
    tr.wrap(from, from, &[(list, Attrs::new()), (item, Attrs::new())])
      .is_ok()
  });
  match rule {
    Ok(rule) => Some(rule),
    Err(err) => {
      warn!(%err, list = list_name, "invalid list input rule");
      None
    },
  }
}

impl Extension for ListExtension {
  fn name(&self) -> &'static str {
    "list"
  }

  fn slot(&self) -> &EditorSlot {
    &self.slot
  }

  fn requires(&self) -> Vec<&'static str> {
    vec!["paragraph"]
  }

  fn nodes(&self) -> Vec<(String, NodeSpec)> {
    vec![
      ("bullet_list".to_string(), NodeSpec {
        content: Some("list_item+".to_string()),
        group: Some("block".to_string()),
        parse_html: vec![ParseRule::tag("ul")],
        render_html: Some(HtmlRender::Tag("ul".to_string())),
        ..NodeSpec::default()
      }),
      ("ordered_list".to_string(), NodeSpec {
        content: Some("list_item+".to_string()),
        group: Some("block".to_string()),
        parse_html: vec![ParseRule::tag("ol")],
        render_html: Some(HtmlRender::Tag("ol".to_string())),
        ..NodeSpec::default()
      }),
      ("list_item".to_string(), NodeSpec {
        content: Some("paragraph block*".to_string()),
        defining: true,
        parse_html: vec![ParseRule::tag("li")],
        render_html: Some(HtmlRender::Tag("li".to_string())),
        ..NodeSpec::default()
      }),
    ]
  }

  fn add_commands(&self, registry: &mut CommandRegistry) {
    registry.register(
      "toggleBulletList",
      "Wrap the selection in a bullet list, or lift it back out",
      |ctx, _args| toggle_list(ctx, "bullet_list"),
    );
    registry.register(
      "toggleOrderedList",
      "Wrap the selection in an ordered list, or lift it back out",
      |ctx, _args| toggle_list(ctx, "ordered_list"),
    );
    registry.register(
      "splitListItem",
      "Split the current list item at the cursor",
      |ctx, _args| split_list_item(ctx),
    );
    registry.register(
      "liftListItem",
      "Lift the current block out of its list",
      |ctx, _args| lift_out_of_list(ctx),
    );
  }

  fn add_keybindings(&self) -> Vec<(String, CommandCall)> {
    vec![
      ("Enter".to_string(), CommandCall::bare("splitListItem")),
      (
        "Mod-Shift-8".to_string(),
        CommandCall::bare("toggleBulletList"),
      ),
      (
        "Mod-Shift-7".to_string(),
        CommandCall::bare("toggleOrderedList"),
      ),
    ]
  }

  fn add_input_rules(&self, schema: &Schema) -> Vec<InputRule> {
    if schema.node_type("list_item").is_none() {
      return Vec::new();
    }
    let mut rules = Vec::new();
    rules.extend(two_level_wrap_rule(r"^\s*[-+*]\s$", "bullet_list"));
    rules.extend(two_level_wrap_rule(r"^\s*\d+\.\s$", "ordered_list"));
    rules
  }
}
