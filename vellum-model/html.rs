//! HTML serialization and tolerant parsing.
//!
//! Serialization walks the tree and emits the tags declared by each type's
//! `render_html` spec. Parsing is a forgiving hand-rolled tokenizer: unknown
//! tags are transparent, mismatched close tags are ignored, and stray text is
//! wrapped in the schema's default textblock. Garbage in, document out.

use crate::{
  node::{
    Mark,
    Node,
  },
  schema::{
    Attrs,
    HtmlRender,
    MarkType,
    NodeType,
    Schema,
    SchemaError,
  },
};

// --- serialization ---------------------------------------------------------

pub fn to_html(schema: &Schema, doc: &Node) -> String {
  let mut out = String::new();
  for child in doc.content().iter() {
    write_node(schema, child, &mut out);
  }
  out
}

/// Serialize a single node (with its children) to HTML.
pub fn node_html(schema: &Schema, node: &Node) -> String {
  let mut out = String::new();
  write_node(schema, node, &mut out);
  out
}

fn render_tag(node: &Node) -> Option<(String, bool)> {
  match node.node_type().spec().render_html.as_ref()? {
    HtmlRender::Tag(tag) => Some((tag.clone(), false)),
    HtmlRender::TagByAttr { prefix, attr } => {
      let value = node.attr(attr)?;
      let suffix = match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
      };
      Some((format!("{prefix}{suffix}"), false))
    },
    HtmlRender::Void(tag) => Some((tag.clone(), true)),
  }
}

fn write_node(schema: &Schema, node: &Node, out: &mut String) {
  if let Some(text) = node.text_str() {
    // Marks whose type is missing a render spec fall back to their name as
    // the tag, which is right for the conventional strong/em/code names.
    let mut tags: Vec<(String, &Mark)> = Vec::new();
    for mark in node.marks() {
      let render = schema
        .mark_type(mark.name())
        .and_then(|ty| ty.spec().render_html.clone());
      match render {
        Some(HtmlRender::Tag(tag)) => tags.push((tag, mark)),
        Some(_) => {},
        None => tags.push((mark.name().to_string(), mark)),
      }
    }
    for (tag, mark) in &tags {
      out.push('<');
      out.push_str(tag);
      // String attrs become tag attributes (`<a href="...">`).
      for (key, value) in mark.attrs() {
        if let serde_json::Value::String(s) = value {
          out.push(' ');
          out.push_str(key);
          out.push_str("=\"");
          escape_into(s, out);
          out.push('"');
        }
      }
      out.push('>');
    }
    escape_into(text, out);
    for (tag, _) in tags.iter().rev() {
      out.push_str("</");
      out.push_str(tag);
      out.push('>');
    }
    return;
  }
  match render_tag(node) {
    Some((tag, void)) => {
      out.push('<');
      out.push_str(&tag);
      out.push('>');
      if !void {
        for child in node.content().iter() {
          write_node(schema, child, out);
        }
        out.push_str("</");
        out.push_str(&tag);
        out.push('>');
      }
    },
    None => {
      for child in node.content().iter() {
        write_node(schema, child, out);
      }
    },
  }
}

fn escape_into(text: &str, out: &mut String) {
  for c in text.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      _ => out.push(c),
    }
  }
}

// --- parsing ---------------------------------------------------------------

type TagAttrs = Vec<(String, String)>;

#[derive(Debug, PartialEq)]
enum Token {
  Open(String, TagAttrs),
  Close(String),
  SelfClose(String, TagAttrs),
  Text(String),
}

fn tokenize(html: &str) -> Vec<Token> {
  let mut tokens = Vec::new();
  let mut chars = html.char_indices().peekable();
  let bytes = html;
  let mut text_start = 0;

  while let Some((i, c)) = chars.next() {
    if c != '<' {
      continue;
    }
    if i > text_start {
      push_text(&bytes[text_start..i], &mut tokens);
    }
    // Comments and doctype declarations are skipped wholesale.
    if bytes[i..].starts_with("<!--") {
      let end = bytes[i..].find("-->").map(|p| i + p + 3).unwrap_or(bytes.len());
      while let Some(&(j, _)) = chars.peek() {
        if j >= end {
          break;
        }
        chars.next();
      }
      text_start = end;
      continue;
    }
    let end = bytes[i..].find('>').map(|p| i + p).unwrap_or(bytes.len());
    let inner = &bytes[i + 1..end.min(bytes.len())];
    while let Some(&(j, _)) = chars.peek() {
      if j > end {
        break;
      }
      chars.next();
    }
    text_start = end + 1;

    let inner = inner.trim();
    if inner.is_empty() || inner.starts_with('!') || inner.starts_with('?') {
      continue;
    }
    if let Some(name) = inner.strip_prefix('/') {
      let (name, _) = parse_tag(name);
      tokens.push(Token::Close(name));
    } else if inner.ends_with('/') {
      let (name, attrs) = parse_tag(inner);
      tokens.push(Token::SelfClose(name, attrs));
    } else {
      let (name, attrs) = parse_tag(inner);
      tokens.push(Token::Open(name, attrs));
    }
  }
  if text_start < bytes.len() {
    push_text(&bytes[text_start..], &mut tokens);
  }
  tokens
}

/// Split the inside of a tag into its name and its attributes. Values may
/// be double-quoted, single-quoted, or bare; bare attribute names get an
/// empty value.
fn parse_tag(inner: &str) -> (String, TagAttrs) {
  let inner = inner.trim_end_matches('/').trim();
  let name_end = inner
    .find(char::is_whitespace)
    .unwrap_or(inner.len());
  let name = inner[..name_end].to_ascii_lowercase();
  let mut attrs = TagAttrs::new();
  let mut rest = inner[name_end..].trim_start();
  while !rest.is_empty() {
    let key_end = rest
      .find(|c: char| c.is_whitespace() || c == '=')
      .unwrap_or(rest.len());
    let key = rest[..key_end].to_ascii_lowercase();
    rest = rest[key_end..].trim_start();
    match rest.strip_prefix('=') {
      Some(after) => {
        let after = after.trim_start();
        let (value, remaining) = if let Some(quoted) = after.strip_prefix('"') {
          match quoted.find('"') {
            Some(end) => (&quoted[..end], &quoted[end + 1..]),
            None => (quoted, ""),
          }
        } else if let Some(quoted) = after.strip_prefix('\'') {
          match quoted.find('\'') {
            Some(end) => (&quoted[..end], &quoted[end + 1..]),
            None => (quoted, ""),
          }
        } else {
          let end = after.find(char::is_whitespace).unwrap_or(after.len());
          (&after[..end], &after[end..])
        };
        if !key.is_empty() {
          attrs.push((key, decode_entities(value)));
        }
        rest = remaining.trim_start();
      },
      None => {
        if !key.is_empty() {
          attrs.push((key, String::new()));
        }
      },
    }
  }
  (name, attrs)
}

fn push_text(raw: &str, tokens: &mut Vec<Token>) {
  let text = decode_entities(raw);
  if !text.trim().is_empty() {
    tokens.push(Token::Text(text));
  }
}

fn decode_entities(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  let mut rest = raw;
  while let Some(pos) = rest.find('&') {
    out.push_str(&rest[..pos]);
    rest = &rest[pos..];
    let semi = rest
      .char_indices()
      .take(10)
      .find(|&(_, c)| c == ';')
      .map(|(i, _)| i);
    let Some(semi) = semi else {
      out.push('&');
      rest = &rest[1..];
      continue;
    };
    let entity = &rest[1..semi];
    match entity {
      "amp" => out.push('&'),
      "lt" => out.push('<'),
      "gt" => out.push('>'),
      "quot" => out.push('"'),
      "nbsp" => out.push(' '),
      _ => {
        if let Some(code) = entity.strip_prefix('#').and_then(|n| n.parse::<u32>().ok())
          && let Some(c) = char::from_u32(code)
        {
          out.push(c);
        } else {
          out.push('&');
          out.push_str(entity);
          out.push(';');
        }
      },
    }
    rest = &rest[semi + 1..];
  }
  out.push_str(rest);
  out
}

struct Frame {
  type_:    NodeType,
  attrs:    Attrs,
  tag:      String,
  children: Vec<Node>,
  inline:   Vec<Node>,
}

struct Parser<'a> {
  schema: &'a Schema,
  stack:  Vec<Frame>,
  marks:  Vec<Mark>,
}

impl<'a> Parser<'a> {
  fn close_frame(&mut self) -> Result<(), SchemaError> {
    let mut frame = match self.stack.pop() {
      Some(frame) => frame,
      None => return Ok(()),
    };
    if !frame.inline.is_empty() {
      let inline = std::mem::take(&mut frame.inline);
      if frame.type_.is_textblock() {
        frame.children.extend(inline);
      } else {
        // Loose inline content inside a container gets its own textblock.
        let para = self.default_textblock()?;
        frame.children.push(para.create(
          Attrs::new(),
          inline,
        ));
      }
    }
    let node = frame.type_.create(frame.attrs, frame.children);
    match self.stack.last_mut() {
      Some(parent) => parent.children.push(node),
      None => self.stack.push(Frame {
        type_:    node.node_type().clone(),
        attrs:    node.attrs().clone(),
        tag:      String::new(),
        children: node.content().to_vec(),
        inline:   Vec::new(),
      }),
    }
    Ok(())
  }

  fn default_textblock(&self) -> Result<NodeType, SchemaError> {
    self
      .schema
      .default_textblock()
      .ok_or(SchemaError::NoTextblock)
  }

  fn open_inline_home(&mut self) -> Result<(), SchemaError> {
    if self
      .stack
      .last()
      .map(|frame| frame.type_.is_textblock())
      .unwrap_or(false)
    {
      return Ok(());
    }
    let para = self.default_textblock()?;
    self.stack.push(Frame {
      type_:    para,
      attrs:    Attrs::new(),
      tag:      String::new(),
      children: Vec::new(),
      inline:   Vec::new(),
    });
    Ok(())
  }

  fn node_rule(&self, tag: &str, tag_attrs: &[(String, String)]) -> Option<(NodeType, Attrs)> {
    for ty in self.schema.node_types() {
      for rule in &ty.spec().parse_html {
        if rule.tag == tag {
          return Some((ty.clone(), rule.resolve_attrs(tag_attrs)));
        }
      }
    }
    None
  }

  fn mark_rule(&self, tag: &str, tag_attrs: &[(String, String)]) -> Option<(MarkType, Attrs)> {
    for ty in self.schema.mark_types() {
      for rule in &ty.spec().parse_html {
        if rule.tag == tag {
          return Some((ty.clone(), rule.resolve_attrs(tag_attrs)));
        }
      }
    }
    None
  }

  fn open_tag(&mut self, tag: &str, tag_attrs: &[(String, String)]) -> Result<(), SchemaError> {
    if let Some((type_, attrs)) = self.node_rule(tag, tag_attrs) {
      if type_.is_leaf() {
        return self.leaf(&type_, attrs);
      }
      if type_.is_textblock() || !type_.is_inline() {
        // Close an open implicit or explicit textblock before starting a
        // sibling block.
        while self
          .stack
          .last()
          .map(|frame| frame.type_.is_textblock())
          .unwrap_or(false)
        {
          self.close_frame()?;
        }
      }
      self.stack.push(Frame {
        type_,
        attrs,
        tag: tag.to_string(),
        children: Vec::new(),
        inline: Vec::new(),
      });
      return Ok(());
    }
    if let Some((type_, attrs)) = self.mark_rule(tag, tag_attrs) {
      let mark = type_.create(attrs);
      self.marks = crate::node::add_to_mark_set(&self.marks, mark);
    }
    // Unknown tags are transparent.
    Ok(())
  }

  fn leaf(&mut self, type_: &NodeType, attrs: Attrs) -> Result<(), SchemaError> {
    let node = type_
      .create(attrs, Vec::new())
      .with_marks(self.marks.clone());
    if type_.is_inline() {
      self.open_inline_home()?;
      if let Some(frame) = self.stack.last_mut() {
        frame.inline.push(node);
      }
    } else {
      while self
        .stack
        .last()
        .map(|frame| frame.type_.is_textblock())
        .unwrap_or(false)
      {
        self.close_frame()?;
      }
      if let Some(frame) = self.stack.last_mut() {
        frame.children.push(node);
      }
    }
    Ok(())
  }

  fn close_tag(&mut self, tag: &str) -> Result<(), SchemaError> {
    if let Some((type_, _)) = self.mark_rule(tag, &[]) {
      self.marks = crate::node::remove_from_mark_set(&self.marks, type_.name());
      return Ok(());
    }
    // Find a matching open frame; a close tag with no match is ignored.
    let matches = self.stack.iter().rposition(|frame| frame.tag == tag);
    if let Some(index) = matches {
      while self.stack.len() > index {
        self.close_frame()?;
      }
    }
    Ok(())
  }

  fn text(&mut self, text: &str) -> Result<(), SchemaError> {
    self.open_inline_home()?;
    let node = self.schema.text_node(text, self.marks.clone());
    if let Some(frame) = self.stack.last_mut() {
      frame.inline.push(node);
    }
    Ok(())
  }
}

/// Parse HTML into a document over `schema`. Never fails on malformed
/// markup, only on a schema that cannot host a document at all.
pub fn parse_html(schema: &Schema, html: &str) -> Result<Node, SchemaError> {
  let top = schema.top_node()?;
  let mut parser = Parser {
    schema,
    stack: vec![Frame {
      type_:    top.clone(),
      attrs:    Attrs::new(),
      tag:      String::new(),
      children: Vec::new(),
      inline:   Vec::new(),
    }],
    marks: Vec::new(),
  };

  for token in tokenize(html) {
    match token {
      Token::Open(tag, attrs) => parser.open_tag(&tag, &attrs)?,
      Token::SelfClose(tag, attrs) => {
        // <br/> and friends; treated as an open of a leaf-parsing tag.
        parser.open_tag(&tag, &attrs)?;
      },
      Token::Close(tag) => parser.close_tag(&tag)?,
      Token::Text(text) => parser.text(&text)?,
    }
  }

  while parser.stack.len() > 1 {
    parser.close_frame()?;
  }
  let root = parser.stack.pop();
  let mut children = match root {
    Some(mut frame) => {
      if !frame.inline.is_empty() {
        let para = schema.default_textblock().ok_or(SchemaError::NoTextblock)?;
        let inline = std::mem::take(&mut frame.inline);
        frame.children.push(para.create(Attrs::new(), inline));
      }
      frame.children
    },
    None => Vec::new(),
  };
  if children.is_empty() {
    let para = schema.default_textblock().ok_or(SchemaError::NoTextblock)?;
    children.push(para.create(Attrs::new(), Vec::new()));
  }
  Ok(top.create(Attrs::new(), children))
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::schema::{
    AttrSpec,
    NodeSpec,
    ParseRule,
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
          parse_html: vec![ParseRule::tag("p")],
          render_html: Some(HtmlRender::Tag("p".to_string())),
          ..NodeSpec::default()
        }),
        ("heading".to_string(), NodeSpec {
          content: Some("inline*".to_string()),
          group: Some("block".to_string()),
          attrs: heading_attrs,
          parse_html: vec![
            ParseRule::tag("h1").with_attr("level", json!(1)),
            ParseRule::tag("h2").with_attr("level", json!(2)),
          ],
          render_html: Some(HtmlRender::TagByAttr {
            prefix: "h".to_string(),
            attr:   "level".to_string(),
          }),
          ..NodeSpec::default()
        }),
        ("horizontal_rule".to_string(), NodeSpec {
          group: Some("block".to_string()),
          parse_html: vec![ParseRule::tag("hr")],
          render_html: Some(HtmlRender::Void("hr".to_string())),
          ..NodeSpec::default()
        }),
        ("text".to_string(), NodeSpec {
          group: Some("inline".to_string()),
          ..NodeSpec::default()
        }),
      ],
      [
        ("strong".to_string(), mark_spec("strong")),
        ("em".to_string(), mark_spec("em")),
        ("link".to_string(), {
          let mut attrs = indexmap::IndexMap::new();
          attrs.insert("href".to_string(), AttrSpec::with_default(json!("")));
          crate::schema::MarkSpec {
            attrs,
            parse_html: vec![ParseRule::tag("a").capture_attr("href")],
            render_html: Some(HtmlRender::Tag("a".to_string())),
          }
        }),
      ],
    )
  }

  fn mark_spec(tag: &str) -> crate::schema::MarkSpec {
    crate::schema::MarkSpec {
      parse_html: vec![ParseRule::tag(tag)],
      render_html: Some(HtmlRender::Tag(tag.to_string())),
      ..Default::default()
    }
  }

  #[test]
  fn serialize_basic_document() {
    let s = schema();
    let doc = s.node_type("doc").unwrap().create(Attrs::new(), vec![
      s.node_type("heading").unwrap().create(
        {
          let mut attrs = Attrs::new();
          attrs.insert("level".to_string(), json!(2));
          attrs
        },
        vec![s.text_node("Title", Vec::new())],
      ),
      s.node_type("paragraph").unwrap().create(Attrs::new(), vec![
        s.text_node("plain ", Vec::new()),
        s.text_node("bold", vec![Mark::new("strong")]),
      ]),
    ]);
    assert_eq!(
      to_html(&s, &doc),
      "<h2>Title</h2><p>plain <strong>bold</strong></p>"
    );
  }

  #[test]
  fn serialize_escapes_text() {
    let s = schema();
    let doc = s.node_type("doc").unwrap().create(Attrs::new(), vec![
      s.node_type("paragraph")
        .unwrap()
        .create(Attrs::new(), vec![s.text_node("a < b & c", Vec::new())]),
    ]);
    assert_eq!(to_html(&s, &doc), "<p>a &lt; b &amp; c</p>");
  }

  #[test]
  fn parse_round_trip() {
    let s = schema();
    let doc = parse_html(&s, "<h1>Hi</h1><p>some <em>text</em></p><hr>").unwrap();
    assert_eq!(doc.child_count(), 3);
    assert_eq!(doc.child(0).unwrap().type_name(), "heading");
    assert_eq!(doc.child(2).unwrap().type_name(), "horizontal_rule");
    assert_eq!(
      to_html(&s, &doc),
      "<h1>Hi</h1><p>some <em>text</em></p><hr>"
    );
  }

  #[test]
  fn parse_captures_link_href() {
    let s = schema();
    let doc = parse_html(&s, "<p><a href=\"https://example.com\">t</a></p>").unwrap();
    let text = doc.child(0).unwrap().child(0).unwrap();
    let link = text.marks().iter().find(|m| m.name() == "link").unwrap();
    assert_eq!(link.attrs().get("href"), Some(&json!("https://example.com")));
    assert_eq!(
      to_html(&s, &doc),
      "<p><a href=\"https://example.com\">t</a></p>"
    );
  }

  #[test]
  fn parse_reads_single_quoted_and_bare_attrs() {
    let s = schema();
    let doc = parse_html(&s, "<p><a href='/one'>a</a></p>").unwrap();
    let text = doc.child(0).unwrap().child(0).unwrap();
    let link = text.marks().iter().find(|m| m.name() == "link").unwrap();
    assert_eq!(link.attrs().get("href"), Some(&json!("/one")));
  }

  #[test]
  fn parse_tolerates_malformed_markup() {
    let s = schema();
    // Unclosed tags, unknown tags, stray close tags, bare text.
    let doc = parse_html(&s, "<div>loose</div><p>one<p>two</span>").unwrap();
    assert_eq!(doc.child_count(), 3);
    assert_eq!(doc.child(0).unwrap().text_content(), "loose");
    assert_eq!(doc.child(1).unwrap().text_content(), "one");
    assert_eq!(doc.child(2).unwrap().text_content(), "two");
  }

  #[test]
  fn parse_decodes_entities() {
    let s = schema();
    let doc = parse_html(&s, "<p>a &amp; b &lt;tag&gt;</p>").unwrap();
    assert_eq!(doc.text_content(), "a & b <tag>");
  }

  #[test]
  fn parse_empty_input_yields_empty_paragraph() {
    let s = schema();
    let doc = parse_html(&s, "").unwrap();
    assert_eq!(doc.child_count(), 1);
    assert_eq!(doc.child(0).unwrap().type_name(), "paragraph");
  }
}
