//! Transactions: mutable builders of document changes.
//!
//! A [`Transaction`] is created from a [`State`](crate::state::State), records
//! every edit as a [`Step`], and carries the resulting document and mapped
//! selection. Nothing is visible to the editor until the transaction is
//! dispatched to the view, which applies it atomically to produce the next
//! immutable state.
//!
//! Every operation rebuilds the persistent tree and maps the selection
//! through the change, so a transaction is always internally consistent:
//! `tr.doc()` reflects all recorded steps, in order.

use std::sync::atomic::{
  AtomicU64,
  Ordering,
};

use thiserror::Error;

use crate::{
  node::{
    BlockRange,
    InlineToken,
    Mark,
    Node,
    NodeError,
  },
  schema::{
    Attrs,
    NodeType,
    Schema,
  },
  selection::Selection,
};

pub type Result<T> = std::result::Result<T, TransactionError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
  #[error(transparent)]
  Node(#[from] NodeError),
  #[error("position {0} is not inside a textblock")]
  NotInTextblock(usize),
  #[error("position {0} is not a block boundary")]
  NotABlockBoundary(usize),
  #[error("cannot split at {0}")]
  CannotSplit(usize),
  #[error("cannot lift range {from}..{to}")]
  CannotLift { from: usize, to: usize },
  #[error("replacement content is not valid here")]
  InvalidContent,
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A recorded document change. Descriptive only: the transaction applies
/// edits eagerly, steps exist for history granularity and logging.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
  InsertText { pos: usize, len: usize },
  InsertInline { pos: usize },
  Delete { from: usize, to: usize },
  ReplaceBlocks { from: usize, to: usize, new_len: usize },
  AddMark { from: usize, to: usize, mark: String },
  RemoveMark { from: usize, to: usize, mark: String },
  SetBlockType { from: usize, to: usize, name: String },
  Wrap { from: usize, to: usize, depth: usize },
  Split { pos: usize },
  Lift { from: usize, to: usize },
  ReplaceDocument,
}

#[derive(Clone, Debug)]
pub struct Transaction {
  id:             u64,
  source_version: u64,
  schema:         Schema,
  doc:            Node,
  selection:      Selection,
  steps:          Vec<Step>,
  doc_changed:    bool,
}

impl Transaction {
  pub(crate) fn new(schema: Schema, doc: Node, selection: Selection, source_version: u64) -> Self {
    Transaction {
      id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
      source_version,
      schema,
      doc,
      selection,
      steps: Vec::new(),
      doc_changed: false,
    }
  }

  pub fn id(&self) -> u64 {
    self.id
  }

  pub fn source_version(&self) -> u64 {
    self.source_version
  }

  pub fn schema(&self) -> &Schema {
    &self.schema
  }

  pub fn doc(&self) -> &Node {
    &self.doc
  }

  pub fn selection(&self) -> Selection {
    self.selection
  }

  pub fn steps(&self) -> &[Step] {
    &self.steps
  }

  /// Whether any step changed the document (selection-only transactions
  /// report `false`; undo history ignores them).
  pub fn doc_changed(&self) -> bool {
    self.doc_changed
  }

  fn commit(&mut self, step: Step, doc: Node, map: impl Fn(usize) -> usize) {
    self.selection = Selection::new(map(self.selection.anchor), map(self.selection.head));
    self.doc = doc;
    self.steps.push(step);
    self.doc_changed = true;
  }

  // --- selection -----------------------------------------------------------

  pub fn set_selection(&mut self, selection: Selection) {
    self.selection = selection;
  }

  // --- inline edits --------------------------------------------------------

  /// Insert text at `pos` (which must be inside a textblock).
  pub fn insert_text(&mut self, pos: usize, text: &str, marks: Vec<Mark>) -> Result<()> {
    if text.is_empty() {
      return Ok(());
    }
    let rp = self.doc.resolve(pos)?;
    if !rp.parent().is_textblock() {
      return Err(TransactionError::NotInTextblock(pos));
    }
    let path = rp.parent_path();
    let offset = rp.parent_offset;
    let schema = self.schema.clone();
    let len = text.chars().count();
    let inserted: Vec<InlineToken> = text
      .chars()
      .map(|c| InlineToken::Char(c, marks.clone()))
      .collect();
    let doc = self.doc.update_at_path(&path, |parent| {
      let mut tokens = parent.inline_tokens();
      tokens.splice(offset..offset, inserted);
      parent.with_inline_tokens(&schema, tokens)
    })?;
    self.commit(Step::InsertText { pos, len }, doc, replace_map(pos, pos, len));
    Ok(())
  }

  /// Insert an inline leaf node (e.g. a hard break) at `pos` inside a
  /// textblock.
  pub fn insert_inline(&mut self, pos: usize, node: Node) -> Result<()> {
    let rp = self.doc.resolve(pos)?;
    if !rp.parent().is_textblock() {
      return Err(TransactionError::NotInTextblock(pos));
    }
    let path = rp.parent_path();
    let offset = rp.parent_offset;
    let schema = self.schema.clone();
    let doc = self.doc.update_at_path(&path, |parent| {
      let mut tokens = parent.inline_tokens();
      tokens.splice(offset..offset, [InlineToken::Leaf(node)]);
      parent.with_inline_tokens(&schema, tokens)
    })?;
    self.commit(Step::InsertInline { pos }, doc, replace_map(pos, pos, 1));
    Ok(())
  }

  /// Delete `from..to`. Within one textblock this is an inline splice; a
  /// range covering whole blocks removes them (refilling a container that
  /// would become empty).
  pub fn delete(&mut self, from: usize, to: usize) -> Result<()> {
    if from >= to {
      return Ok(());
    }
    let rf = self.doc.resolve(from)?;
    let rt = self.doc.resolve(to)?;

    if rf.depth() == rt.depth()
      && rf.depth() > 0
      && rf.start(rf.depth()) == rt.start(rt.depth())
      && rf.parent().is_textblock()
    {
      let path = rf.parent_path();
      let (start, end) = (rf.parent_offset, rt.parent_offset);
      let schema = self.schema.clone();
      let doc = self.doc.update_at_path(&path, |parent| {
        let mut tokens = parent.inline_tokens();
        tokens.splice(start..end, std::iter::empty());
        parent.with_inline_tokens(&schema, tokens)
      })?;
      self.commit(Step::Delete { from, to }, doc, replace_map(from, to, 0));
      return Ok(());
    }

    let range = self.doc.block_range(from, to)?;
    let replacement = self.refill(&range, Vec::new())?;
    let new_len: usize = replacement.iter().map(Node::node_size).sum();
    let doc = self.doc.splice_at_path(
      &range.parent_path,
      range.start_index,
      range.end_index,
      replacement,
    )?;
    self.commit(
      Step::Delete { from, to },
      doc,
      replace_map(range.start_pos, range.end_pos, new_len),
    );
    Ok(())
  }

  pub fn delete_selection(&mut self) -> Result<()> {
    let sel = self.selection;
    self.delete(sel.from(), sel.to())
  }

  // --- marks ---------------------------------------------------------------

  pub fn add_mark(&mut self, from: usize, to: usize, mark: Mark) -> Result<()> {
    self.apply_mark(from, to, Some(mark), None)
  }

  pub fn remove_mark(&mut self, from: usize, to: usize, mark_name: &str) -> Result<()> {
    self.apply_mark(from, to, None, Some(mark_name.to_string()))
  }

  fn apply_mark(
    &mut self,
    from: usize,
    to: usize,
    add: Option<Mark>,
    remove: Option<String>,
  ) -> Result<()> {
    let schema = self.schema.clone();
    let mut doc = self.doc.clone();
    for tb in self.doc.textblocks_between(from, to) {
      let len = tb.node.content_size();
      let start = from.saturating_sub(tb.content_start).min(len);
      let end = if to < tb.content_start {
        0
      } else {
        (to - tb.content_start).min(len)
      };
      if start >= end {
        continue;
      }
      doc = doc.update_at_path(&tb.path, |parent| {
        let mut tokens = parent.inline_tokens();
        for token in &mut tokens[start..end] {
          if let InlineToken::Char(_, marks) = token {
            if let Some(mark) = &add {
              *marks = crate::node::add_to_mark_set(marks, mark.clone());
            }
            if let Some(name) = &remove {
              *marks = crate::node::remove_from_mark_set(marks, name);
            }
          }
        }
        parent.with_inline_tokens(&schema, tokens)
      })?;
    }
    let step = match (&add, &remove) {
      (Some(mark), _) => Step::AddMark {
        from,
        to,
        mark: mark.name().to_string(),
      },
      (_, Some(name)) => Step::RemoveMark {
        from,
        to,
        mark: name.clone(),
      },
      _ => return Ok(()),
    };
    self.commit(step, doc, |p| p);
    Ok(())
  }

  // --- block edits ---------------------------------------------------------

  /// Change the type (and attrs) of every textblock intersecting `from..to`.
  pub fn set_block_type(
    &mut self,
    from: usize,
    to: usize,
    type_: &NodeType,
    attrs: Attrs,
  ) -> Result<()> {
    if !type_.is_textblock() {
      return Err(TransactionError::InvalidContent);
    }
    let mut doc = self.doc.clone();
    for tb in self.doc.textblocks_between(from, to) {
      doc = doc.update_at_path(&tb.path, |parent| parent.with_type(type_.clone(), attrs.clone()))?;
    }
    self.commit(
      Step::SetBlockType {
        from,
        to,
        name: type_.name().to_string(),
      },
      doc,
      |p| p,
    );
    Ok(())
  }

  /// Wrap the block range of `from..to` in the given wrapper chain
  /// (outermost first).
  pub fn wrap(&mut self, from: usize, to: usize, wrappers: &[(NodeType, Attrs)]) -> Result<()> {
    if wrappers.is_empty() {
      return Ok(());
    }
    let range = self.doc.block_range(from, to)?;
    let parent = self
      .doc
      .node_at_path(&range.parent_path)
      .ok_or(TransactionError::InvalidContent)?;
    let children: Vec<Node> = parent.content().to_vec()[range.start_index..range.end_index].to_vec();
    let mut wrapped = children;
    for (type_, attrs) in wrappers.iter().rev() {
      wrapped = vec![type_.create(attrs.clone(), wrapped)];
    }
    let doc = self.doc.splice_at_path(
      &range.parent_path,
      range.start_index,
      range.end_index,
      wrapped,
    )?;
    let depth = wrappers.len();
    let (start, end) = (range.start_pos, range.end_pos);
    self.commit(
      Step::Wrap {
        from,
        to,
        depth,
      },
      doc,
      move |p| {
        if p < start {
          p
        } else if p <= end {
          p + depth
        } else {
          p + 2 * depth
        }
      },
    );
    Ok(())
  }

  /// Replace the children of a block range wholesale. Low-level primitive
  /// used by list commands; the caller is responsible for producing content
  /// the parent allows.
  pub fn splice_blocks(&mut self, range: &BlockRange, replacement: Vec<Node>) -> Result<()> {
    let replacement = self.refill(range, replacement)?;
    let new_len: usize = replacement.iter().map(Node::node_size).sum();
    let doc = self.doc.splice_at_path(
      &range.parent_path,
      range.start_index,
      range.end_index,
      replacement,
    )?;
    self.commit(
      Step::ReplaceBlocks {
        from: range.start_pos,
        to: range.end_pos,
        new_len,
      },
      doc,
      replace_map(range.start_pos, range.end_pos, new_len),
    );
    Ok(())
  }

  /// Insert block nodes at a block boundary position.
  pub fn insert_blocks(&mut self, pos: usize, nodes: Vec<Node>) -> Result<()> {
    if nodes.is_empty() {
      return Ok(());
    }
    let rp = self.doc.resolve(pos)?;
    if rp.parent().is_textblock() {
      return Err(TransactionError::NotABlockBoundary(pos));
    }
    let path = rp.parent_path();
    let index = rp.index_in(rp.depth());
    let new_len: usize = nodes.iter().map(Node::node_size).sum();
    let doc = self.doc.splice_at_path(&path, index, index, nodes)?;
    self.commit(
      Step::ReplaceBlocks {
        from: pos,
        to: pos,
        new_len,
      },
      doc,
      replace_map(pos, pos, new_len),
    );
    Ok(())
  }

  /// Split the textblock at `pos` in two. The right half keeps the block
  /// type unless the split point is at the end of the block, in which case
  /// it becomes the default textblock (pressing Enter at the end of a
  /// heading starts a paragraph).
  pub fn split_block(&mut self, pos: usize) -> Result<()> {
    let rp = self.doc.resolve(pos)?;
    let parent = rp.parent().clone();
    if !parent.is_textblock() || rp.depth() == 0 {
      return Err(TransactionError::CannotSplit(pos));
    }
    let depth = rp.depth();
    let offset = rp.parent_offset;
    let schema = self.schema.clone();

    let tokens = parent.inline_tokens();
    let left_tokens = tokens[..offset].to_vec();
    let right_tokens = tokens[offset..].to_vec();
    let left = parent.with_inline_tokens(&schema, left_tokens);
    let right = if right_tokens.is_empty() {
      let default = schema
        .default_textblock()
        .unwrap_or_else(|| parent.node_type().clone());
      default.create(Attrs::new(), Vec::new())
    } else {
      parent.with_inline_tokens(&schema, right_tokens)
    };

    let parent_index = rp.index_in(depth - 1);
    let path = rp.path_to(depth - 1);
    let doc = self
      .doc
      .splice_at_path(&path, parent_index, parent_index + 1, vec![left, right])?;
    self.commit(Step::Split { pos }, doc, replace_map(pos, pos, 2));
    // Cursor moves to the start of the new block.
    if self.selection.is_empty() {
      self.selection = Selection::point(pos + 2);
    }
    Ok(())
  }

  /// Lift the blocks of `from..to` out of their wrapper (e.g. out of a
  /// blockquote or a list item).
  pub fn lift(&mut self, from: usize, to: usize) -> Result<()> {
    let range = self.doc.block_range(from, to)?;
    if range.depth == 0 {
      return Err(TransactionError::CannotLift { from, to });
    }
    let wrapper = self
      .doc
      .node_at_path(&range.parent_path)
      .ok_or(TransactionError::InvalidContent)?
      .clone();
    let children = wrapper.content().to_vec();
    let before: Vec<Node> = children[..range.start_index].to_vec();
    let lifted: Vec<Node> = children[range.start_index..range.end_index].to_vec();
    let after: Vec<Node> = children[range.end_index..].to_vec();

    let mut replacement = Vec::new();
    if !before.is_empty() {
      replacement.push(wrapper.with_content(crate::node::Fragment::from(before.clone())));
    }
    let shift_empty_before = before.is_empty();
    replacement.extend(lifted);
    if !after.is_empty() {
      replacement.push(wrapper.with_content(crate::node::Fragment::from(after)));
    }

    let (parent_path, wrapper_index) = match range.parent_path.split_last() {
      Some((&last, rest)) => (rest.to_vec(), last),
      None => return Err(TransactionError::CannotLift { from, to }),
    };
    let doc = self
      .doc
      .splice_at_path(&parent_path, wrapper_index, wrapper_index + 1, replacement)?;
    // Positions inside the lifted blocks lose the wrapper's opening token
    // when the prefix is empty, and gain a closing one otherwise.
    let (start, end) = (range.start_pos, range.end_pos);
    let delta: i64 = if shift_empty_before { -1 } else { 1 };
    self.commit(Step::Lift { from, to }, doc, move |p| {
      if p >= start && p <= end {
        (p as i64 + delta).max(0) as usize
      } else {
        p
      }
    });
    Ok(())
  }

  /// Replace the whole document.
  pub fn replace_document(&mut self, doc: Node) -> Result<()> {
    let selection = Selection::at_start(&doc);
    self.doc = doc;
    self.selection = selection;
    self.steps.push(Step::ReplaceDocument);
    self.doc_changed = true;
    Ok(())
  }

  /// Refill a container that a splice would leave empty, so documents and
  /// wrappers never end up with no content.
  fn refill(&self, range: &BlockRange, replacement: Vec<Node>) -> Result<Vec<Node>> {
    let parent = self
      .doc
      .node_at_path(&range.parent_path)
      .ok_or(TransactionError::InvalidContent)?;
    let emptied = replacement.is_empty()
      && range.start_index == 0
      && range.end_index == parent.child_count();
    if !emptied {
      return Ok(replacement);
    }
    let default = self
      .schema
      .default_textblock()
      .ok_or(TransactionError::InvalidContent)?;
    Ok(vec![default.create(Attrs::new(), Vec::new())])
  }
}

fn replace_map(from: usize, to: usize, new_len: usize) -> impl Fn(usize) -> usize {
  move |pos| {
    if pos <= from {
      pos
    } else if pos >= to {
      pos - (to - from) + new_len
    } else {
      from + new_len.min(pos - from)
    }
  }
}

/// Whether every character in `from..to` carries the given mark. Empty
/// ranges report `false`.
pub fn range_has_mark(doc: &Node, from: usize, to: usize, mark_name: &str) -> bool {
  let mut seen_char = false;
  for tb in doc.textblocks_between(from, to) {
    let len = tb.node.content_size();
    let start = from.saturating_sub(tb.content_start).min(len);
    let end = if to < tb.content_start {
      0
    } else {
      (to - tb.content_start).min(len)
    };
    if start >= end {
      continue;
    }
    let tokens = tb.node.inline_tokens();
    for token in &tokens[start..end] {
      if let InlineToken::Char(_, marks) = token {
        seen_char = true;
        if !marks.iter().any(|m| m.name() == mark_name) {
          return false;
        }
      }
    }
  }
  seen_char
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::{
    schema::{
      AttrSpec,
      NodeSpec,
    },
    state::State,
  };

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
      [("strong".to_string(), Default::default())],
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

  #[test]
  fn insert_and_delete_text() {
    let state = state_with("hello");
    let mut tr = state.tr();
    tr.insert_text(6, " world", Vec::new()).unwrap();
    assert_eq!(tr.doc().text_content(), "hello world");
    assert!(tr.doc_changed());
    tr.delete(1, 6).unwrap();
    assert_eq!(tr.doc().text_content(), " world");
    assert_eq!(tr.steps().len(), 2);
  }

  #[test]
  fn insert_text_outside_textblock_fails() {
    let state = state_with("x");
    let mut tr = state.tr();
    assert!(matches!(
      tr.insert_text(0, "nope", Vec::new()),
      Err(TransactionError::NotInTextblock(0))
    ));
    assert!(!tr.doc_changed());
  }

  #[test]
  fn add_and_remove_mark() {
    let state = state_with("hello");
    let mut tr = state.tr();
    tr.add_mark(1, 6, Mark::new("strong")).unwrap();
    assert!(range_has_mark(tr.doc(), 1, 6, "strong"));
    assert!(!range_has_mark(tr.doc(), 1, 6, "em"));
    tr.remove_mark(1, 3, "strong").unwrap();
    assert!(!range_has_mark(tr.doc(), 1, 6, "strong"));
    assert!(range_has_mark(tr.doc(), 3, 6, "strong"));
  }

  #[test]
  fn set_block_type_retypes_textblock() {
    let state = state_with("title");
    let mut tr = state.tr();
    let heading = tr.schema().node_type("heading").unwrap();
    let mut attrs = Attrs::new();
    attrs.insert("level".to_string(), json!(2));
    tr.set_block_type(1, 6, &heading, attrs).unwrap();
    assert_eq!(tr.doc().child(0).unwrap().type_name(), "heading");
    assert_eq!(tr.doc().child(0).unwrap().attr("level"), Some(&json!(2)));
    // Size unchanged, content preserved.
    assert_eq!(tr.doc().text_content(), "title");
  }

  #[test]
  fn wrap_in_blockquote_maps_selection() {
    let state = state_with("quoted");
    let mut tr = state.tr();
    tr.set_selection(Selection::new(1, 7));
    let quote = tr.schema().node_type("blockquote").unwrap();
    tr.wrap(1, 7, &[(quote, Attrs::new())]).unwrap();
    let child = tr.doc().child(0).unwrap();
    assert_eq!(child.type_name(), "blockquote");
    assert_eq!(child.child(0).unwrap().type_name(), "paragraph");
    // Selection shifted by the wrapper's opening token.
    assert_eq!(tr.selection(), Selection::new(2, 8));
  }

  #[test]
  fn lift_restores_wrapped_paragraph() {
    let state = state_with("quoted");
    let mut tr = state.tr();
    let quote = tr.schema().node_type("blockquote").unwrap();
    tr.wrap(1, 7, &[(quote, Attrs::new())]).unwrap();
    tr.lift(2, 8).unwrap();
    assert_eq!(tr.doc().child(0).unwrap().type_name(), "paragraph");
    assert_eq!(tr.doc().text_content(), "quoted");
  }

  #[test]
  fn split_block_moves_cursor_into_new_block() {
    let state = state_with("hello");
    let mut tr = state.tr();
    tr.set_selection(Selection::point(3));
    tr.split_block(3).unwrap();
    assert_eq!(tr.doc().child_count(), 2);
    assert_eq!(tr.doc().child(0).unwrap().text_content(), "he");
    assert_eq!(tr.doc().child(1).unwrap().text_content(), "llo");
    assert_eq!(tr.selection(), Selection::point(5));
  }

  #[test]
  fn split_at_end_yields_default_textblock() {
    let state = state_with("title");
    let mut tr = state.tr();
    let heading = tr.schema().node_type("heading").unwrap();
    tr.set_block_type(1, 6, &heading, Attrs::new()).unwrap();
    tr.split_block(6).unwrap();
    assert_eq!(tr.doc().child(0).unwrap().type_name(), "heading");
    assert_eq!(tr.doc().child(1).unwrap().type_name(), "paragraph");
  }

  #[test]
  fn delete_all_blocks_refills_document() {
    let state = state_with("bye");
    let mut tr = state.tr();
    tr.delete(0, tr.doc().content_size()).unwrap();
    assert_eq!(tr.doc().child_count(), 1);
    assert_eq!(tr.doc().child(0).unwrap().type_name(), "paragraph");
    assert_eq!(tr.doc().text_content(), "");
  }

  #[test]
  fn selection_only_transaction_reports_no_doc_change() {
    let state = state_with("hello");
    let mut tr = state.tr();
    tr.set_selection(Selection::new(1, 4));
    assert!(!tr.doc_changed());
    assert!(tr.steps().is_empty());
  }
}
