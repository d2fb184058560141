//! Immutable document tree.
//!
//! Nodes are persistent values: editing never mutates in place, it builds a
//! new tree sharing untouched subtrees (fragments are `Arc`-backed). Positions
//! use token offsets: entering or leaving a non-leaf node costs 1, every text
//! character costs 1, childless leaf nodes cost 1. [`ResolvedPos`] materializes
//! the ancestor chain for a position so edits can reason about depth, parent
//! blocks, and block boundaries without re-walking the tree.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::schema::{
  Attrs,
  NodeType,
  Schema,
  SchemaError,
};

pub type Result<T> = std::result::Result<T, NodeError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NodeError {
  #[error("position {pos} is out of bounds for document of size {size}")]
  PosOutOfBounds { pos: usize, size: usize },
  #[error("position {0} is not inside a textblock")]
  NotInTextblock(usize),
  #[error("no block range between {from} and {to}")]
  NoBlockRange { from: usize, to: usize },
  #[error("invalid child path {0:?}")]
  InvalidPath(Vec<usize>),
  #[error("invalid document JSON: {0}")]
  InvalidJson(String),
  #[error(transparent)]
  Schema(#[from] SchemaError),
}

/// Inline formatting attached to text. Identified by mark type name.
#[derive(Clone, Debug, PartialEq)]
pub struct Mark {
  name:  String,
  attrs: Attrs,
}

impl Mark {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name:  name.into(),
      attrs: Attrs::new(),
    }
  }

  pub fn with_attrs(name: impl Into<String>, attrs: Attrs) -> Self {
    Self {
      name: name.into(),
      attrs,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn attrs(&self) -> &Attrs {
    &self.attrs
  }

  pub fn to_json(&self) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert("type".to_string(), Value::String(self.name.clone()));
    if !self.attrs.is_empty() {
      obj.insert("attrs".to_string(), Value::Object(self.attrs.clone()));
    }
    Value::Object(obj)
  }
}

/// Add `mark` to a mark set unless a mark of the same type is present.
pub fn add_to_mark_set(marks: &[Mark], mark: Mark) -> Vec<Mark> {
  if marks.iter().any(|m| m.name == mark.name) {
    return marks.to_vec();
  }
  let mut out = marks.to_vec();
  out.push(mark);
  out
}

/// Remove marks of the given type from a mark set.
pub fn remove_from_mark_set(marks: &[Mark], name: &str) -> Vec<Mark> {
  marks.iter().filter(|m| m.name != name).cloned().collect()
}

/// Ordered sequence of sibling nodes, shared on clone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fragment(Arc<Vec<Node>>);

impl Fragment {
  pub fn from(nodes: Vec<Node>) -> Self {
    Fragment(Arc::new(nodes))
  }

  pub fn empty() -> Self {
    Fragment::default()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&Node> {
    self.0.get(index)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Node> {
    self.0.iter()
  }

  pub fn to_vec(&self) -> Vec<Node> {
    self.0.as_ref().clone()
  }

  /// Token size of the fragment (sum of child node sizes).
  pub fn size(&self) -> usize {
    self.0.iter().map(Node::node_size).sum()
  }

  pub fn splice(&self, start: usize, end: usize, replacement: Vec<Node>) -> Fragment {
    let mut out = Vec::with_capacity(self.0.len() - (end - start) + replacement.len());
    out.extend_from_slice(&self.0[..start]);
    out.extend(replacement);
    out.extend_from_slice(&self.0[end..]);
    Fragment::from(out)
  }
}

/// Inline content decomposed to per-character granularity, which makes mark
/// and text edits inside a textblock order-independent and trivially correct.
/// Inline leaves (hard breaks) ride along as single tokens.
#[derive(Clone, Debug, PartialEq)]
pub enum InlineToken {
  Char(char, Vec<Mark>),
  Leaf(Node),
}

impl InlineToken {
  pub fn marks(&self) -> &[Mark] {
    match self {
      InlineToken::Char(_, marks) => marks,
      InlineToken::Leaf(node) => &node.marks,
    }
  }
}

/// A document node: a typed, attributed tree value.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
  type_:   NodeType,
  attrs:   Attrs,
  marks:   Vec<Mark>,
  content: Fragment,
  text:    Option<String>,
}

impl Node {
  pub fn new(type_: NodeType, attrs: Attrs, content: Fragment, marks: Vec<Mark>) -> Node {
    Node {
      type_,
      attrs,
      marks,
      content,
      text: None,
    }
  }

  pub fn text(type_: NodeType, text: String, marks: Vec<Mark>) -> Node {
    Node {
      type_,
      attrs: Attrs::new(),
      marks,
      content: Fragment::empty(),
      text: Some(text),
    }
  }

  pub fn node_type(&self) -> &NodeType {
    &self.type_
  }

  pub fn type_name(&self) -> &str {
    self.type_.name()
  }

  pub fn attrs(&self) -> &Attrs {
    &self.attrs
  }

  pub fn attr(&self, name: &str) -> Option<&Value> {
    self.attrs.get(name)
  }

  pub fn marks(&self) -> &[Mark] {
    &self.marks
  }

  pub fn content(&self) -> &Fragment {
    &self.content
  }

  pub fn text_str(&self) -> Option<&str> {
    self.text.as_deref()
  }

  pub fn is_text(&self) -> bool {
    self.text.is_some()
  }

  pub fn is_textblock(&self) -> bool {
    self.type_.is_textblock()
  }

  pub fn is_leaf(&self) -> bool {
    self.type_.is_leaf()
  }

  pub fn is_inline(&self) -> bool {
    self.type_.is_inline()
  }

  pub fn child_count(&self) -> usize {
    self.content.len()
  }

  pub fn child(&self, index: usize) -> Option<&Node> {
    self.content.get(index)
  }

  /// Token size of this node when embedded in a parent.
  pub fn node_size(&self) -> usize {
    if let Some(text) = &self.text {
      text.chars().count()
    } else if self.is_leaf() {
      1
    } else {
      self.content.size() + 2
    }
  }

  /// Token size of the content, i.e. the valid position range inside this
  /// node. For the document node this is the full `0..size` range.
  pub fn content_size(&self) -> usize {
    self.content.size()
  }

  /// Concatenated text of the subtree.
  pub fn text_content(&self) -> String {
    if let Some(text) = &self.text {
      return text.clone();
    }
    let mut out = String::new();
    for child in self.content.iter() {
      out.push_str(&child.text_content());
    }
    out
  }

  /// Textblock text with inline leaves replaced by U+FFFC, used for matching
  /// input rules against what the user sees.
  pub fn textblock_text(&self) -> String {
    let mut out = String::new();
    for child in self.content.iter() {
      match &child.text {
        Some(text) => out.push_str(text),
        None => out.push('\u{FFFC}'),
      }
    }
    out
  }

  pub fn with_attrs(&self, attrs: Attrs) -> Node {
    let mut node = self.clone();
    node.attrs = attrs;
    node
  }

  pub fn with_type(&self, type_: NodeType, attrs: Attrs) -> Node {
    let mut node = self.clone();
    node.type_ = type_.clone();
    node.attrs = attrs;
    let mut filled = node.attrs;
    for (name, spec) in &type_.spec().attrs {
      if !filled.contains_key(name)
        && let Some(default) = &spec.default
      {
        filled.insert(name.clone(), default.clone());
      }
    }
    node.attrs = filled;
    node
  }

  pub fn with_content(&self, content: Fragment) -> Node {
    let mut node = self.clone();
    node.content = content;
    node
  }

  pub fn with_marks(&self, marks: Vec<Mark>) -> Node {
    let mut node = self.clone();
    node.marks = marks;
    node
  }

  // --- path addressing -----------------------------------------------------

  pub fn node_at_path(&self, path: &[usize]) -> Option<&Node> {
    let mut node = self;
    for &index in path {
      node = node.child(index)?;
    }
    Some(node)
  }

  /// Rebuild the tree with the node at `path` replaced by `f(node)`.
  pub fn update_at_path(&self, path: &[usize], f: impl FnOnce(&Node) -> Node) -> Result<Node> {
    match path.split_first() {
      None => Ok(f(self)),
      Some((&index, rest)) => {
        let child = self
          .child(index)
          .ok_or_else(|| NodeError::InvalidPath(path.to_vec()))?;
        let updated = child.update_at_path(rest, f)?;
        Ok(self.with_content(self.content.splice(index, index + 1, vec![updated])))
      },
    }
  }

  /// Rebuild the tree with children `start..end` of the node at `path`
  /// replaced by `replacement`.
  pub fn splice_at_path(
    &self,
    path: &[usize],
    start: usize,
    end: usize,
    replacement: Vec<Node>,
  ) -> Result<Node> {
    self.update_at_path(path, |parent| {
      parent.with_content(parent.content.splice(start, end, replacement))
    })
  }

  // --- inline tokens -------------------------------------------------------

  /// Decompose textblock content into inline tokens.
  pub fn inline_tokens(&self) -> Vec<InlineToken> {
    let mut tokens = Vec::new();
    for child in self.content.iter() {
      match &child.text {
        Some(text) => {
          for c in text.chars() {
            tokens.push(InlineToken::Char(c, child.marks.clone()));
          }
        },
        None => tokens.push(InlineToken::Leaf(child.clone())),
      }
    }
    tokens
  }

  /// Rebuild textblock content from inline tokens, merging adjacent
  /// characters with identical mark sets back into text nodes.
  pub fn with_inline_tokens(&self, schema: &Schema, tokens: Vec<InlineToken>) -> Node {
    let mut children: Vec<Node> = Vec::new();
    let mut run = String::new();
    let mut run_marks: Vec<Mark> = Vec::new();

    let mut flush = |children: &mut Vec<Node>, run: &mut String, marks: &mut Vec<Mark>| {
      if !run.is_empty() {
        children.push(schema.text_node(std::mem::take(run), std::mem::take(marks)));
      }
    };

    for token in tokens {
      match token {
        InlineToken::Char(c, marks) => {
          if marks != run_marks && !run.is_empty() {
            flush(&mut children, &mut run, &mut run_marks);
          }
          run_marks = marks;
          run.push(c);
        },
        InlineToken::Leaf(node) => {
          flush(&mut children, &mut run, &mut run_marks);
          children.push(node);
        },
      }
    }
    flush(&mut children, &mut run, &mut run_marks);
    self.with_content(Fragment::from(children))
  }

  // --- traversal -----------------------------------------------------------

  /// Visit every textblock whose content intersects `from..to`, with the
  /// path to the textblock and the absolute position of its content start.
  pub fn textblocks_between(&self, from: usize, to: usize) -> Vec<TextblockRef> {
    let mut out = Vec::new();
    collect_textblocks(self, &mut Vec::new(), 0, from, to, &mut out);
    out
  }

  // --- JSON ----------------------------------------------------------------

  pub fn to_json(&self) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert(
      "type".to_string(),
      Value::String(self.type_.name().to_string()),
    );
    if let Some(text) = &self.text {
      obj.insert("text".to_string(), Value::String(text.clone()));
    }
    if !self.attrs.is_empty() {
      obj.insert("attrs".to_string(), Value::Object(self.attrs.clone()));
    }
    if !self.marks.is_empty() {
      obj.insert(
        "marks".to_string(),
        Value::Array(self.marks.iter().map(Mark::to_json).collect()),
      );
    }
    if !self.content.is_empty() {
      obj.insert(
        "content".to_string(),
        Value::Array(self.content.iter().map(Node::to_json).collect()),
      );
    }
    Value::Object(obj)
  }

  pub fn from_json(schema: &Schema, value: &Value) -> Result<Node> {
    let obj = value
      .as_object()
      .ok_or_else(|| NodeError::InvalidJson("node must be an object".to_string()))?;
    let type_name = obj
      .get("type")
      .and_then(Value::as_str)
      .ok_or_else(|| NodeError::InvalidJson("node is missing `type`".to_string()))?;
    let marks = match obj.get("marks") {
      Some(Value::Array(items)) => items
        .iter()
        .map(|item| {
          let mark = item
            .as_object()
            .ok_or_else(|| NodeError::InvalidJson("mark must be an object".to_string()))?;
          let name = mark
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| NodeError::InvalidJson("mark is missing `type`".to_string()))?;
          let attrs = mark
            .get("attrs")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
          Ok(Mark::with_attrs(name, attrs))
        })
        .collect::<Result<Vec<_>>>()?,
      _ => Vec::new(),
    };

    if type_name == "text" {
      let text = obj
        .get("text")
        .and_then(Value::as_str)
        .ok_or_else(|| NodeError::InvalidJson("text node is missing `text`".to_string()))?;
      return Ok(schema.text_node(text, marks));
    }

    let type_ = schema
      .node_type(type_name)
      .ok_or_else(|| SchemaError::UnknownNode(type_name.to_string()))?;
    let attrs = obj
      .get("attrs")
      .and_then(Value::as_object)
      .cloned()
      .unwrap_or_default();
    let content = match obj.get("content") {
      Some(Value::Array(items)) => items
        .iter()
        .map(|item| Node::from_json(schema, item))
        .collect::<Result<Vec<_>>>()?,
      _ => Vec::new(),
    };
    Ok(type_.create(attrs, content).with_marks(marks))
  }

  // --- resolution ----------------------------------------------------------

  pub fn resolve(&self, pos: usize) -> Result<ResolvedPos> {
    let size = self.content_size();
    if pos > size {
      return Err(NodeError::PosOutOfBounds { pos, size });
    }

    let mut levels: Vec<Level> = Vec::new();
    let mut node = self.clone();
    let mut start = 0;
    let mut offset = pos;

    loop {
      // Find the child `offset` falls strictly inside of.
      let mut acc = 0;
      let mut index = 0;
      let mut descend: Option<(usize, Node, usize)> = None;
      for (i, child) in node.content.iter().enumerate() {
        let child_size = child.node_size();
        if offset > acc && offset < acc + child_size && !child.is_text() && !child.is_leaf() {
          descend = Some((i, child.clone(), acc));
          break;
        }
        if acc + child_size <= offset {
          acc += child_size;
          index = i + 1;
        } else {
          index = i;
          break;
        }
      }

      match descend {
        Some((i, child, child_offset)) => {
          levels.push(Level {
            node,
            index: i,
            start,
          });
          start = start + child_offset + 1;
          offset = offset - child_offset - 1;
          node = child;
        },
        None => {
          levels.push(Level {
            node,
            index,
            start,
          });
          return Ok(ResolvedPos {
            pos,
            levels,
            parent_offset: offset,
          });
        },
      }
    }
  }

  /// The deepest block-content range shared by `from` and `to`: the parent
  /// whose children `start_index..end_index` fully cover both positions.
  pub fn block_range(&self, from: usize, to: usize) -> Result<BlockRange> {
    let rf = self.resolve(from)?;
    let rt = self.resolve(to.max(from))?;

    let max_depth = rf.depth().min(rt.depth());
    for depth in (0..=max_depth).rev() {
      if rf.start(depth) != rt.start(depth) {
        continue;
      }
      let parent = rf.node(depth);
      if parent.is_textblock() || parent.is_leaf() || parent.is_text() {
        continue;
      }
      let start_index = rf.index_in(depth);
      let mut end_index = rt.index_in(depth);
      // A position at or inside a child extends the range past that child.
      if end_index < start_index {
        continue;
      }
      if rt.depth() > depth || rt.parent_offset > child_offset(parent, end_index) {
        end_index += 1;
      } else if end_index == start_index {
        end_index += 1;
      }
      let parent_path = rf.path_to(depth);
      let start_pos = rf.start(depth) + child_offset(parent, start_index);
      let end_pos = rf.start(depth) + child_offset(parent, end_index);
      return Ok(BlockRange {
        depth,
        parent_path,
        start_index,
        end_index,
        start_pos,
        end_pos,
      });
    }
    Err(NodeError::NoBlockRange { from, to })
  }
}

/// Offset of child `index` inside `parent`'s content.
fn child_offset(parent: &Node, index: usize) -> usize {
  parent
    .content()
    .iter()
    .take(index)
    .map(Node::node_size)
    .sum()
}

fn collect_textblocks(
  node: &Node,
  path: &mut Vec<usize>,
  start: usize,
  from: usize,
  to: usize,
  out: &mut Vec<TextblockRef>,
) {
  let mut offset = start;
  for (i, child) in node.content().iter().enumerate() {
    let child_size = child.node_size();
    let child_end = offset + child_size;
    if child_end >= from && offset <= to {
      if child.is_textblock() {
        path.push(i);
        out.push(TextblockRef {
          path:          path.clone(),
          content_start: offset + 1,
          node:          child.clone(),
        });
        path.pop();
      } else if !child.is_text() && !child.is_leaf() {
        path.push(i);
        collect_textblocks(child, path, offset + 1, from, to, out);
        path.pop();
      }
    }
    offset = child_end;
  }
}

/// A textblock intersecting a position range.
#[derive(Clone, Debug)]
pub struct TextblockRef {
  pub path:          Vec<usize>,
  /// Absolute position of the first inline token.
  pub content_start: usize,
  pub node:          Node,
}

#[derive(Clone, Debug)]
struct Level {
  node:  Node,
  /// Index of the child the resolution descended into, or (at the final
  /// level) the number of children entirely before the position.
  index: usize,
  /// Absolute position of this node's content start.
  start: usize,
}

/// A position with its materialized ancestor chain. Depth 0 is the document.
#[derive(Clone, Debug)]
pub struct ResolvedPos {
  pub pos:           usize,
  levels:            Vec<Level>,
  /// Offset of `pos` inside the deepest node's content.
  pub parent_offset: usize,
}

impl ResolvedPos {
  pub fn depth(&self) -> usize {
    self.levels.len() - 1
  }

  pub fn node(&self, depth: usize) -> &Node {
    &self.levels[depth].node
  }

  /// The node the position points directly into.
  pub fn parent(&self) -> &Node {
    &self.levels[self.levels.len() - 1].node
  }

  /// Index of the child (at `depth`) the position descends into or sits
  /// before.
  pub fn index_in(&self, depth: usize) -> usize {
    self.levels[depth].index
  }

  /// Absolute position of the content start of the node at `depth`.
  pub fn start(&self, depth: usize) -> usize {
    self.levels[depth].start
  }

  /// Absolute position of the content end of the node at `depth`.
  pub fn end(&self, depth: usize) -> usize {
    self.levels[depth].start + self.levels[depth].node.content_size()
  }

  /// Position immediately before the node at `depth` (its opening token).
  pub fn before(&self, depth: usize) -> usize {
    debug_assert!(depth > 0, "the document has no before position");
    self.levels[depth].start - 1
  }

  /// Position immediately after the node at `depth` (past its closing
  /// token).
  pub fn after(&self, depth: usize) -> usize {
    self.end(depth) + 1
  }

  /// Child-index path from the document down to the node at `depth`.
  pub fn path_to(&self, depth: usize) -> Vec<usize> {
    self.levels[..depth].iter().map(|level| level.index).collect()
  }

  /// Child-index path from the document down to the parent node.
  pub fn parent_path(&self) -> Vec<usize> {
    self.path_to(self.depth())
  }
}

/// Result of [`Node::block_range`].
#[derive(Clone, Debug)]
pub struct BlockRange {
  pub depth:       usize,
  pub parent_path: Vec<usize>,
  pub start_index: usize,
  /// Exclusive.
  pub end_index:   usize,
  pub start_pos:   usize,
  pub end_pos:     usize,
}
