//! Schema: the merged set of node and mark types a document may contain.
//!
//! A [`Schema`] is built once from ordered spec maps (insertion order is
//! preserved and observable, which is what makes the extension merge
//! deterministic) and is immutable afterwards. Node and mark types are cheap
//! to clone and compare by name.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

use crate::node::{
  Fragment,
  Mark,
  Node,
};

/// Attribute map attached to nodes and marks.
pub type Attrs = serde_json::Map<String, Value>;

pub type Result<T> = std::result::Result<T, SchemaError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
  #[error("unknown node type `{0}`")]
  UnknownNode(String),
  #[error("unknown mark type `{0}`")]
  UnknownMark(String),
  #[error("schema has no `doc` node type")]
  MissingDoc,
  #[error("schema has no textblock node type to fill content with")]
  NoTextblock,
}

/// Declared attribute on a node or mark spec.
#[derive(Clone, Debug, Default)]
pub struct AttrSpec {
  pub default: Option<Value>,
}

impl AttrSpec {
  pub fn with_default(value: Value) -> Self {
    Self {
      default: Some(value),
    }
  }
}

/// A single HTML tag this type parses from, with optional fixed attrs
/// (e.g. `h2` parses to a heading with `level: 2`) and optional attrs
/// captured from the tag itself (e.g. `a` captures `href`).
#[derive(Clone, Debug)]
pub struct ParseRule {
  pub tag:     String,
  pub attrs:   Option<Attrs>,
  pub capture: Vec<String>,
}

impl ParseRule {
  pub fn tag(tag: impl Into<String>) -> Self {
    Self {
      tag:     tag.into(),
      attrs:   None,
      capture: Vec::new(),
    }
  }

  pub fn with_attr(mut self, key: impl Into<String>, value: Value) -> Self {
    self
      .attrs
      .get_or_insert_with(Attrs::new)
      .insert(key.into(), value);
    self
  }

  /// Copy the named HTML attribute into the parsed node or mark.
  pub fn capture_attr(mut self, name: impl Into<String>) -> Self {
    self.capture.push(name.into());
    self
  }

  /// The attrs this rule produces when matched against a tag carrying
  /// `tag_attrs`: fixed attrs first, then captured attribute values.
  pub fn resolve_attrs(&self, tag_attrs: &[(String, String)]) -> Attrs {
    let mut attrs = self.attrs.clone().unwrap_or_default();
    for name in &self.capture {
      if let Some((_, value)) = tag_attrs.iter().find(|(key, _)| key == name) {
        attrs.insert(name.clone(), Value::String(value.clone()));
      }
    }
    attrs
  }
}

/// How a node or mark renders to HTML.
#[derive(Clone, Debug)]
pub enum HtmlRender {
  /// Wrap content in a fixed tag: `<strong>...</strong>`.
  Tag(String),
  /// Tag derived from an attribute: prefix `h` + attr `level` -> `<h2>`.
  TagByAttr { prefix: String, attr: String },
  /// Childless void element: `<hr>`, `<br>`.
  Void(String),
}

#[derive(Clone, Debug, Default)]
pub struct NodeSpec {
  /// Content expression: `"block+"`, `"inline*"`, `"list_item+"`,
  /// `"paragraph block*"`, or `None` for leaf nodes.
  pub content:     Option<String>,
  pub group:       Option<String>,
  pub inline:      bool,
  pub attrs:       IndexMap<String, AttrSpec>,
  pub defining:    bool,
  /// Textblock holds preformatted code; Enter inserts a newline instead of
  /// splitting.
  pub code:        bool,
  pub parse_html:  Vec<ParseRule>,
  pub render_html: Option<HtmlRender>,
}

#[derive(Clone, Debug, Default)]
pub struct MarkSpec {
  pub attrs:       IndexMap<String, AttrSpec>,
  pub parse_html:  Vec<ParseRule>,
  pub render_html: Option<HtmlRender>,
}

#[derive(Debug)]
struct NodeTypeInner {
  name: String,
  spec: NodeSpec,
}

/// Resolved node type. Compares by name.
#[derive(Clone, Debug)]
pub struct NodeType(Arc<NodeTypeInner>);

impl PartialEq for NodeType {
  fn eq(&self, other: &Self) -> bool {
    self.0.name == other.0.name
  }
}

impl Eq for NodeType {}

impl NodeType {
  pub fn name(&self) -> &str {
    &self.0.name
  }

  pub fn spec(&self) -> &NodeSpec {
    &self.0.spec
  }

  pub fn is_text(&self) -> bool {
    self.0.name == "text"
  }

  /// Leaf nodes allow no content at all (`horizontal_rule`, `hard_break`).
  pub fn is_leaf(&self) -> bool {
    !self.is_text() && self.0.spec.content.is_none()
  }

  pub fn is_inline(&self) -> bool {
    self.is_text() || self.0.spec.inline
  }

  pub fn is_textblock(&self) -> bool {
    self
      .0
      .spec
      .content
      .as_deref()
      .is_some_and(|c| c.starts_with("inline"))
  }

  pub fn is_block(&self) -> bool {
    !self.is_inline()
  }

  /// Create a node of this type, filling declared attr defaults for any
  /// attrs the caller did not provide.
  pub fn create(&self, attrs: Attrs, content: Vec<Node>) -> Node {
    let mut filled = attrs;
    for (name, spec) in &self.0.spec.attrs {
      if !filled.contains_key(name)
        && let Some(default) = &spec.default
      {
        filled.insert(name.clone(), default.clone());
      }
    }
    Node::new(self.clone(), filled, Fragment::from(content), Vec::new())
  }

  /// Create a node of this type and fill its content with the minimal valid
  /// structure (an empty textblock for block containers, nothing for
  /// textblocks and leaves).
  pub fn create_and_fill(&self, schema: &Schema, attrs: Attrs) -> Result<Node> {
    if self.is_leaf() || self.is_textblock() {
      return Ok(self.create(attrs, Vec::new()));
    }
    let Some(expr) = self.0.spec.content.as_deref() else {
      return Ok(self.create(attrs, Vec::new()));
    };
    let first = expr
      .split_whitespace()
      .next()
      .unwrap_or("block")
      .trim_end_matches(['+', '*']);
    let child = if first == "block" {
      schema.default_textblock().ok_or(SchemaError::NoTextblock)?
    } else {
      schema
        .node_type(first)
        .ok_or_else(|| SchemaError::UnknownNode(first.to_string()))?
    };
    let filled = child.create_and_fill(schema, Attrs::new())?;
    Ok(self.create(attrs, vec![filled]))
  }
}

#[derive(Debug)]
struct MarkTypeInner {
  name: String,
  spec: MarkSpec,
}

/// Resolved mark type. Compares by name.
#[derive(Clone, Debug)]
pub struct MarkType(Arc<MarkTypeInner>);

impl PartialEq for MarkType {
  fn eq(&self, other: &Self) -> bool {
    self.0.name == other.0.name
  }
}

impl Eq for MarkType {}

impl MarkType {
  pub fn name(&self) -> &str {
    &self.0.name
  }

  pub fn spec(&self) -> &MarkSpec {
    &self.0.spec
  }

  pub fn create(&self, attrs: Attrs) -> Mark {
    Mark::with_attrs(self.0.name.clone(), attrs)
  }
}

#[derive(Debug)]
struct SchemaInner {
  nodes: IndexMap<String, NodeType>,
  marks: IndexMap<String, MarkType>,
}

/// Build-once, read-only type registry for one editor instance.
#[derive(Clone, Debug)]
pub struct Schema {
  inner: Arc<SchemaInner>,
}

impl Schema {
  pub fn new(
    nodes: impl IntoIterator<Item = (String, NodeSpec)>,
    marks: impl IntoIterator<Item = (String, MarkSpec)>,
  ) -> Schema {
    let nodes = nodes
      .into_iter()
      .map(|(name, spec)| {
        let ty = NodeType(Arc::new(NodeTypeInner {
          name: name.clone(),
          spec,
        }));
        (name, ty)
      })
      .collect();
    let marks = marks
      .into_iter()
      .map(|(name, spec)| {
        let ty = MarkType(Arc::new(MarkTypeInner {
          name: name.clone(),
          spec,
        }));
        (name, ty)
      })
      .collect();
    Schema {
      inner: Arc::new(SchemaInner { nodes, marks }),
    }
  }

  pub fn node_type(&self, name: &str) -> Option<NodeType> {
    self.inner.nodes.get(name).cloned()
  }

  pub fn mark_type(&self, name: &str) -> Option<MarkType> {
    self.inner.marks.get(name).cloned()
  }

  /// Node type names in schema order.
  pub fn node_names(&self) -> impl Iterator<Item = &str> {
    self.inner.nodes.keys().map(String::as_str)
  }

  /// Mark type names in schema order.
  pub fn mark_names(&self) -> impl Iterator<Item = &str> {
    self.inner.marks.keys().map(String::as_str)
  }

  pub fn node_types(&self) -> impl Iterator<Item = &NodeType> {
    self.inner.nodes.values()
  }

  pub fn mark_types(&self) -> impl Iterator<Item = &MarkType> {
    self.inner.marks.values()
  }

  pub fn top_node(&self) -> Result<NodeType> {
    self.node_type("doc").ok_or(SchemaError::MissingDoc)
  }

  pub fn text_node(&self, text: impl Into<String>, marks: Vec<Mark>) -> Node {
    let ty = self
      .node_type("text")
      .unwrap_or_else(|| NodeType(Arc::new(NodeTypeInner {
        name: "text".to_string(),
        spec: NodeSpec {
          group: Some("inline".to_string()),
          ..NodeSpec::default()
        },
      })));
    Node::text(ty, text.into(), marks)
  }

  /// The textblock used to fill empty block containers. Prefers `paragraph`.
  pub fn default_textblock(&self) -> Option<NodeType> {
    if let Some(p) = self.node_type("paragraph") {
      return Some(p);
    }
    self
      .inner
      .nodes
      .values()
      .find(|ty| ty.is_textblock())
      .cloned()
  }

  /// An empty document: the top node filled with one empty textblock.
  pub fn empty_doc(&self) -> Result<Node> {
    self.top_node()?.create_and_fill(self, Attrs::new())
  }
}
