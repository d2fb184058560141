//! Building blocks for commands.
//!
//! These are the document-editing primitives the builtin command extension
//! registers under stable names, and that feature extensions reuse for their
//! own commands and input rules. Each returns whether it applied; a `false`
//! leaves the transaction in an undefined but undispatched state, which is
//! fine because callers only dispatch on success (or, in chains, report the
//! failure through the chain result).

use vellum_model::{
  transaction::range_has_mark,
  view::Effect,
  Attrs,
  Mark,
  Selection,
};

use crate::commands::CommandContext;

/// Toggle a mark across the selection. Empty selections are a no-op: with
/// nothing selected there is nothing to toggle.
pub fn toggle_mark(ctx: &mut CommandContext<'_>, mark_name: &str, attrs: Attrs) -> bool {
  if ctx.tr.schema().mark_type(mark_name).is_none() {
    return false;
  }
  let sel = ctx.tr.selection();
  if sel.is_empty() {
    return false;
  }
  let (from, to) = (sel.from(), sel.to());
  if range_has_mark(ctx.tr.doc(), from, to, mark_name) {
    ctx.tr.remove_mark(from, to, mark_name).is_ok()
  } else {
    ctx
      .tr
      .add_mark(from, to, Mark::with_attrs(mark_name, attrs))
      .is_ok()
  }
}

/// Retype the textblocks covered by the selection.
pub fn set_block_type(ctx: &mut CommandContext<'_>, type_name: &str, attrs: Attrs) -> bool {
  let Some(type_) = ctx.tr.schema().node_type(type_name) else {
    return false;
  };
  let sel = ctx.tr.selection();
  ctx
    .tr
    .set_block_type(sel.from(), sel.to(), &type_, attrs)
    .is_ok()
}

/// Wrap the selected block range in a node of the given type. Fails when
/// the range is already directly wrapped in that type.
pub fn wrap_in(ctx: &mut CommandContext<'_>, type_name: &str, attrs: Attrs) -> bool {
  let Some(type_) = ctx.tr.schema().node_type(type_name) else {
    return false;
  };
  let sel = ctx.tr.selection();
  let (from, to) = (sel.from(), sel.to());
  if let Ok(range) = ctx.tr.doc().block_range(from, to)
    && let Some(parent) = ctx.tr.doc().node_at_path(&range.parent_path)
    && parent.type_name() == type_name
  {
    return false;
  }
  ctx.tr.wrap(from, to, &[(type_, attrs)]).is_ok()
}

/// Lift the selected blocks out of their wrapper.
pub fn lift_block(ctx: &mut CommandContext<'_>) -> bool {
  let sel = ctx.tr.selection();
  ctx.tr.lift(sel.from(), sel.to()).is_ok()
}

/// Split the current textblock at the cursor, replacing any selection.
pub fn split_block(ctx: &mut CommandContext<'_>) -> bool {
  if !ctx.tr.selection().is_empty() && ctx.tr.delete_selection().is_err() {
    return false;
  }
  let pos = ctx.tr.selection().head;
  ctx.tr.split_block(pos).is_ok()
}

/// Inside a code textblock, Enter inserts a literal newline.
pub fn newline_in_code(ctx: &mut CommandContext<'_>) -> bool {
  let pos = ctx.tr.selection().head;
  let Ok(rp) = ctx.tr.doc().resolve(pos) else {
    return false;
  };
  if !rp.parent().is_textblock() || !rp.parent().node_type().spec().code {
    return false;
  }
  if !ctx.tr.selection().is_empty() && ctx.tr.delete_selection().is_err() {
    return false;
  }
  let pos = ctx.tr.selection().head;
  ctx.tr.insert_text(pos, "\n", Vec::new()).is_ok()
}

/// When the cursor sits between blocks, open a fresh default textblock
/// there.
pub fn create_paragraph_near(ctx: &mut CommandContext<'_>) -> bool {
  let pos = ctx.tr.selection().head;
  let Ok(rp) = ctx.tr.doc().resolve(pos) else {
    return false;
  };
  if rp.parent().is_textblock() {
    return false;
  }
  let Some(type_) = ctx.tr.schema().default_textblock() else {
    return false;
  };
  let para = type_.create(Attrs::new(), Vec::new());
  if ctx.tr.insert_blocks(pos, vec![para]).is_err() {
    return false;
  }
  ctx.tr.set_selection(Selection::point(pos + 1));
  true
}

/// Lift an empty wrapped textblock out of its wrapper (Enter at the end of
/// an empty list item or quoted paragraph).
pub fn lift_empty_block(ctx: &mut CommandContext<'_>) -> bool {
  let sel = ctx.tr.selection();
  if !sel.is_empty() {
    return false;
  }
  let Ok(rp) = ctx.tr.doc().resolve(sel.head) else {
    return false;
  };
  if !rp.parent().is_textblock() || rp.parent().content_size() != 0 || rp.depth() < 2 {
    return false;
  }
  ctx.tr.lift(sel.head, sel.head).is_ok()
}

/// Expand the selection to the parent node of the cursor.
pub fn select_parent(ctx: &mut CommandContext<'_>) -> bool {
  let sel = ctx.tr.selection();
  let Ok(rp) = ctx.tr.doc().resolve(sel.from()) else {
    return false;
  };
  let depth = rp.depth();
  if depth == 0 {
    return false;
  }
  ctx
    .tr
    .set_selection(Selection::new(rp.before(depth), rp.after(depth)));
  true
}

pub fn delete_selection(ctx: &mut CommandContext<'_>) -> bool {
  if ctx.tr.selection().is_empty() {
    return false;
  }
  ctx.tr.delete_selection().is_ok()
}

/// Insert a node of the given type at the selection: inline leaves go into
/// the current textblock, blocks after it.
pub fn insert_node(ctx: &mut CommandContext<'_>, type_name: &str, attrs: Attrs) -> bool {
  let Some(type_) = ctx.tr.schema().node_type(type_name) else {
    return false;
  };
  let node = type_.create(attrs, Vec::new());
  if !ctx.tr.selection().is_empty() && ctx.tr.delete_selection().is_err() {
    return false;
  }
  let pos = ctx.tr.selection().head;
  if type_.is_inline() {
    if ctx.tr.insert_inline(pos, node).is_err() {
      return false;
    }
    ctx.tr.set_selection(Selection::point(pos + 1));
    return true;
  }
  let Ok(rp) = ctx.tr.doc().resolve(pos) else {
    return false;
  };
  let pos = if rp.parent().is_textblock() {
    rp.after(rp.depth())
  } else {
    pos
  };
  ctx.tr.insert_blocks(pos, vec![node]).is_ok()
}

/// Move the cursor (or selection) to the given positions.
pub fn set_text_selection(ctx: &mut CommandContext<'_>, anchor: usize, head: usize) -> bool {
  let size = ctx.tr.doc().content_size();
  if anchor > size || head > size {
    return false;
  }
  ctx.tr.set_selection(Selection::new(anchor, head));
  true
}

pub fn undo(ctx: &mut CommandContext<'_>) -> bool {
  if !ctx.info.can_undo {
    return false;
  }
  ctx.effects.push(Effect::Undo);
  true
}

pub fn redo(ctx: &mut CommandContext<'_>) -> bool {
  if !ctx.info.can_redo {
    return false;
  }
  ctx.effects.push(Effect::Redo);
  true
}

pub fn focus(ctx: &mut CommandContext<'_>) -> bool {
  ctx.effects.push(Effect::Focus);
  true
}

#[cfg(test)]
mod tests {
  use serde_json::json;
  use vellum_model::{
    schema::{
      AttrSpec,
      NodeSpec,
      Schema,
    },
    state::State,
    view::ViewInfo,
    MarkSpec,
    Transaction,
  };

  use super::*;

  fn schema() -> Schema {
    let mut heading_attrs = indexmap::IndexMap::new();
    heading_attrs.insert("level".to_string(), AttrSpec::with_default(json!(1)));
    Schema::new(
      [
        ("doc".to_string(), NodeSpec {
          content: Some("block+".to_string()),
          ..NodeSpec::default()
        }),
        ("paragraph".to_string(), NodeSpec {
          content: Some("inline*".to_string()),
          group: Some("block".to_string()),
          ..NodeSpec::default()
        }),
        ("heading".to_string(), NodeSpec {
          content: Some("inline*".to_string()),
          group: Some("block".to_string()),
          attrs: heading_attrs,
          ..NodeSpec::default()
        }),
        ("blockquote".to_string(), NodeSpec {
          content: Some("block+".to_string()),
          group: Some("block".to_string()),
          ..NodeSpec::default()
        }),
        ("text".to_string(), NodeSpec {
          group: Some("inline".to_string()),
          ..NodeSpec::default()
        }),
      ],
      [("strong".to_string(), MarkSpec::default())],
    )
  }

  fn state_with(text: &str) -> State {
    let s = schema();
    let doc = s.node_type("doc").unwrap().create(Attrs::new(), vec![
      s.node_type("paragraph")
        .unwrap()
        .create(Attrs::new(), vec![s.text_node(text, Vec::new())]),
    ]);
    State::new(s, doc)
  }

  fn run(tr: &mut Transaction, state: &State, f: impl FnOnce(&mut CommandContext<'_>) -> bool) -> bool {
    let mut effects = Vec::new();
    let mut ctx = CommandContext {
      tr,
      state,
      apply: true,
      info: ViewInfo {
        editable: true,
        focused:  false,
        can_undo: false,
        can_redo: false,
      },
      effects: &mut effects,
    };
    f(&mut ctx)
  }

  #[test]
  fn toggle_mark_requires_selection() {
    let state = state_with("hello");
    let mut tr = state.tr();
    tr.set_selection(Selection::point(3));
    assert!(!run(&mut tr, &state, |ctx| toggle_mark(ctx, "strong", Attrs::new())));
    assert!(!tr.doc_changed());
  }

  #[test]
  fn toggle_mark_round_trips() {
    let state = state_with("hello");
    let mut tr = state.tr();
    tr.set_selection(Selection::new(1, 6));
    assert!(run(&mut tr, &state, |ctx| toggle_mark(ctx, "strong", Attrs::new())));
    assert!(range_has_mark(tr.doc(), 1, 6, "strong"));
    assert!(run(&mut tr, &state, |ctx| toggle_mark(ctx, "strong", Attrs::new())));
    assert!(!range_has_mark(tr.doc(), 1, 6, "strong"));
  }

  #[test]
  fn wrap_in_refuses_double_wrap() {
    let state = state_with("quoted");
    let mut tr = state.tr();
    tr.set_selection(Selection::new(1, 7));
    assert!(run(&mut tr, &state, |ctx| wrap_in(ctx, "blockquote", Attrs::new())));
    assert!(!run(&mut tr, &state, |ctx| wrap_in(ctx, "blockquote", Attrs::new())));
    assert_eq!(tr.doc().child(0).unwrap().type_name(), "blockquote");
  }

  #[test]
  fn set_block_type_to_heading() {
    let state = state_with("title");
    let mut tr = state.tr();
    tr.set_selection(Selection::point(2));
    let mut attrs = Attrs::new();
    attrs.insert("level".to_string(), json!(3));
    assert!(run(&mut tr, &state, |ctx| set_block_type(ctx, "heading", attrs)));
    assert_eq!(tr.doc().child(0).unwrap().type_name(), "heading");
    assert_eq!(tr.doc().child(0).unwrap().attr("level"), Some(&json!(3)));
  }

  #[test]
  fn unknown_types_fail_cleanly() {
    let state = state_with("x");
    let mut tr = state.tr();
    tr.set_selection(Selection::new(1, 2));
    assert!(!run(&mut tr, &state, |ctx| toggle_mark(ctx, "sparkle", Attrs::new())));
    assert!(!run(&mut tr, &state, |ctx| set_block_type(ctx, "callout", Attrs::new())));
    assert!(!tr.doc_changed());
  }

  #[test]
  fn lift_empty_block_only_fires_on_empty_wrapped_blocks() {
    let state = state_with("full");
    let mut tr = state.tr();
    tr.set_selection(Selection::point(2));
    // Top-level non-empty paragraph: nothing to lift.
    assert!(!run(&mut tr, &state, |ctx| lift_empty_block(ctx)));
  }

  #[test]
  fn undo_respects_history_emptiness() {
    let state = state_with("x");
    let mut tr = state.tr();
    assert!(!run(&mut tr, &state, |ctx| undo(ctx)));
  }
}
