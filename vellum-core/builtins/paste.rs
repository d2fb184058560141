//! Paste handling and Markdown parsing.
//!
//! Pasted content is parsed into a document fragment: HTML through the
//! model's HTML parser, anything else through the Markdown parser provided
//! here as a [`ContentParser`] capability. The parser is schema-aware: it
//! only produces types the merged schema actually has, and degrades
//! gracefully (a heading pasted into a schema without headings becomes a
//! paragraph).

use pulldown_cmark::{
  Event,
  HeadingLevel,
  Options,
  Parser,
  Tag,
  TagEnd,
};
use serde_json::json;
use vellum_model::{
  node::Mark,
  schema::NodeType,
  Attrs,
  Node,
  Schema,
  Selection,
  Transaction,
};

use crate::extension::{
  ContentParser,
  EditorSlot,
  Extension,
};

#[derive(Debug, Default)]
pub struct PasteExtension {
  slot: EditorSlot,
}

impl PasteExtension {
  pub fn new() -> Self {
    PasteExtension::default()
  }
}

impl Extension for PasteExtension {
  fn name(&self) -> &'static str {
    "paste"
  }

  fn slot(&self) -> &EditorSlot {
    &self.slot
  }

  fn content_parser(&self) -> Option<&dyn ContentParser> {
    Some(&MarkdownParser)
  }
}

pub struct MarkdownParser;

impl ContentParser for MarkdownParser {
  fn parse(&self, schema: &Schema, text: &str) -> Option<Node> {
    markdown_to_doc(schema, text).ok()
  }
}

/// Splice a parsed fragment into a transaction at its selection. A single
/// textblock merges inline into the current block; anything larger is
/// inserted as sibling blocks after it.
pub fn insert_parsed(tr: &mut Transaction, parsed: &Node) -> bool {
  if !tr.selection().is_empty() && tr.delete_selection().is_err() {
    return false;
  }
  let pos = tr.selection().head;

  let single_textblock = parsed.child_count() == 1
    && parsed
      .child(0)
      .map(Node::is_textblock)
      .unwrap_or(false);
  if single_textblock {
    let block = parsed.child(0).cloned().unwrap_or_else(|| parsed.clone());
    let mut at = pos;
    for child in block.content().iter() {
      match child.text_str() {
        Some(text) => {
          if tr.insert_text(at, text, child.marks().to_vec()).is_err() {
            return false;
          }
          at += text.chars().count();
        },
        None => {
          if tr.insert_inline(at, child.clone()).is_err() {
            return false;
          }
          at += 1;
        },
      }
    }
    tr.set_selection(Selection::point(at));
    return true;
  }

  let Ok(rp) = tr.doc().resolve(pos) else {
    return false;
  };
  let at = if rp.parent().is_textblock() {
    rp.after(rp.depth())
  } else {
    pos
  };
  tr.insert_blocks(at, parsed.content().to_vec()).is_ok()
}

fn heading_level_number(level: HeadingLevel) -> u64 {
  match level {
    HeadingLevel::H1 => 1,
    HeadingLevel::H2 => 2,
    HeadingLevel::H3 => 3,
    HeadingLevel::H4 => 4,
    HeadingLevel::H5 => 5,
    HeadingLevel::H6 => 6,
  }
}

struct Frame {
  type_:    NodeType,
  attrs:    Attrs,
  children: Vec<Node>,
  inline:   Vec<Node>,
  implicit: bool,
}

struct Builder<'a> {
  schema: &'a Schema,
  stack:  Vec<Frame>,
  /// `None` entries stand for container tags the schema has no type for,
  /// so Start/End events stay balanced while their content flows through.
  opens:  Vec<bool>,
  marks:  Vec<Mark>,
}

impl<'a> Builder<'a> {
  fn open(&mut self, name: &str, attrs: Attrs) {
    match self.schema.node_type(name) {
      Some(type_) => {
        if type_.is_textblock() || type_.is_block() {
          self.close_implicit();
        }
        self.stack.push(Frame {
          type_,
          attrs,
          children: Vec::new(),
          inline: Vec::new(),
          implicit: false,
        });
        self.opens.push(true);
      },
      None => self.opens.push(false),
    }
  }

  /// Textblock containers the schema is missing degrade to a paragraph.
  fn open_textblock(&mut self, name: &str, attrs: Attrs) {
    if self.schema.node_type(name).is_some() {
      self.open(name, attrs);
      return;
    }
    match self.schema.default_textblock() {
      Some(type_) => {
        self.close_implicit();
        self.stack.push(Frame {
          type_,
          attrs: Attrs::new(),
          children: Vec::new(),
          inline: Vec::new(),
          implicit: false,
        });
        self.opens.push(true);
      },
      None => self.opens.push(false),
    }
  }

  fn close(&mut self) {
    if self.opens.pop() == Some(true) {
      self.close_implicit();
      self.pop_frame();
    }
  }

  fn close_implicit(&mut self) {
    while self.stack.last().map(|f| f.implicit).unwrap_or(false) {
      self.pop_frame();
    }
  }

  fn pop_frame(&mut self) {
    let Some(mut frame) = self.stack.pop() else {
      return;
    };
    if !frame.inline.is_empty() {
      let inline = std::mem::take(&mut frame.inline);
      if frame.type_.is_textblock() {
        frame.children.extend(inline);
      } else if let Some(para) = self.schema.default_textblock() {
        frame.children.push(para.create(Attrs::new(), inline));
      }
    }
    let node = frame.type_.create(frame.attrs, frame.children);
    match self.stack.last_mut() {
      Some(parent) => parent.children.push(node),
      None => self.stack.push(Frame {
        type_:    node.node_type().clone(),
        attrs:    node.attrs().clone(),
        children: node.content().to_vec(),
        inline:   Vec::new(),
        implicit: false,
      }),
    }
  }

  fn inline_home(&mut self) {
    let in_textblock = self
      .stack
      .last()
      .map(|f| f.type_.is_textblock())
      .unwrap_or(false);
    if in_textblock {
      return;
    }
    // Tight list items carry text without a paragraph tag.
    if let Some(para) = self.schema.default_textblock() {
      self.stack.push(Frame {
        type_:    para,
        attrs:    Attrs::new(),
        children: Vec::new(),
        inline:   Vec::new(),
        implicit: true,
      });
    }
  }

  fn text(&mut self, text: &str) {
    if text.is_empty() {
      return;
    }
    self.inline_home();
    let node = self.schema.text_node(text, self.marks.clone());
    if let Some(frame) = self.stack.last_mut() {
      frame.inline.push(node);
    }
  }

  fn push_mark(&mut self, name: &str) {
    if self.schema.mark_type(name).is_some() {
      self.marks = vellum_model::node::add_to_mark_set(&self.marks, Mark::new(name));
    }
  }

  fn push_mark_with(&mut self, name: &str, attrs: Attrs) {
    if self.schema.mark_type(name).is_some() {
      self.marks = vellum_model::node::add_to_mark_set(&self.marks, Mark::with_attrs(name, attrs));
    }
  }

  fn pop_mark(&mut self, name: &str) {
    self.marks = vellum_model::node::remove_from_mark_set(&self.marks, name);
  }

  fn leaf(&mut self, name: &str) {
    let Some(type_) = self.schema.node_type(name) else {
      return;
    };
    let node = type_.create(Attrs::new(), Vec::new());
    if type_.is_inline() {
      self.inline_home();
      if let Some(frame) = self.stack.last_mut() {
        frame.inline.push(node);
      }
    } else {
      self.close_implicit();
      if let Some(frame) = self.stack.last_mut() {
        frame.children.push(node);
      }
    }
  }
}

/// Parse Markdown into a document over `schema`.
pub fn markdown_to_doc(
  schema: &Schema,
  markdown: &str,
) -> Result<Node, vellum_model::schema::SchemaError> {
  let top = schema.top_node()?;
  let mut builder = Builder {
    schema,
    stack: vec![Frame {
      type_:    top.clone(),
      attrs:    Attrs::new(),
      children: Vec::new(),
      inline:   Vec::new(),
      implicit: false,
    }],
    opens: Vec::new(),
    marks: Vec::new(),
  };

  let parser = Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH);
  for event in parser {
    match event {
      Event::Start(tag) => match tag {
        Tag::Paragraph => builder.open_textblock("paragraph", Attrs::new()),
        Tag::Heading { level, .. } => {
          let mut attrs = Attrs::new();
          attrs.insert("level".to_string(), json!(heading_level_number(level)));
          builder.open_textblock("heading", attrs);
        },
        Tag::BlockQuote(_) => builder.open("blockquote", Attrs::new()),
        Tag::List(start) => {
          let name = if start.is_some() {
            "ordered_list"
          } else {
            "bullet_list"
          };
          builder.open(name, Attrs::new());
        },
        Tag::Item => builder.open("list_item", Attrs::new()),
        Tag::CodeBlock(_) => builder.open_textblock("code_block", Attrs::new()),
        Tag::Emphasis => builder.push_mark("em"),
        Tag::Strong => builder.push_mark("strong"),
        Tag::Strikethrough => builder.push_mark("strike"),
        Tag::Link { dest_url, .. } => {
          let mut attrs = Attrs::new();
          attrs.insert("href".to_string(), json!(dest_url.to_string()));
          builder.push_mark_with("link", attrs);
        },
        _ => {},
      },
      Event::End(tag) => match tag {
        TagEnd::Paragraph
        | TagEnd::Heading(_)
        | TagEnd::BlockQuote(_)
        | TagEnd::List(_)
        | TagEnd::Item
        | TagEnd::CodeBlock => builder.close(),
        TagEnd::Emphasis => builder.pop_mark("em"),
        TagEnd::Strong => builder.pop_mark("strong"),
        TagEnd::Strikethrough => builder.pop_mark("strike"),
        TagEnd::Link => builder.pop_mark("link"),
        _ => {},
      },
      Event::Text(text) => builder.text(&text),
      Event::Code(text) => {
        builder.push_mark("code");
        builder.text(&text);
        builder.pop_mark("code");
      },
      Event::SoftBreak => builder.text(" "),
      Event::HardBreak => builder.leaf("hard_break"),
      Event::Rule => builder.leaf("horizontal_rule"),
      _ => {},
    }
  }

  while builder.stack.len() > 1 {
    builder.pop_frame();
  }
  let mut children = builder.stack.pop().map(|f| f.children).unwrap_or_default();
  if children.is_empty() {
    let para = schema
      .default_textblock()
      .ok_or(vellum_model::schema::SchemaError::NoTextblock)?;
    children.push(para.create(Attrs::new(), Vec::new()));
  }
  Ok(top.create(Attrs::new(), children))
}
