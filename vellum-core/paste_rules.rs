//! Paste rules: mark patterns applied to pasted plain text.
//!
//! Where input rules react to typing, paste rules sweep over whole pasted
//! text runs, turning delimiter syntax like `**bold**` into marked text.
//! Each rule's pattern captures the delimited span as group 1 and the inner
//! text as group 2.

use regex::Regex;
use thiserror::Error;
use vellum_model::{
  node::Mark,
  Node,
  Schema,
};

pub type Result<T> = std::result::Result<T, PasteRuleError>;

#[derive(Debug, Error)]
pub enum PasteRuleError {
  #[error("invalid paste rule pattern: {0}")]
  Pattern(#[from] regex::Error),
}

pub struct PasteRule {
  pattern:   Regex,
  mark_name: String,
}

/// A text run with the marks accumulated so far.
#[derive(Clone, Debug, PartialEq)]
pub struct TextRun {
  pub text:  String,
  pub marks: Vec<Mark>,
}

pub fn mark_paste_rule(pattern: &str, mark_name: &str) -> Result<PasteRule> {
  Ok(PasteRule {
    pattern:   Regex::new(pattern)?,
    mark_name: mark_name.to_string(),
  })
}

impl PasteRule {
  pub fn mark_name(&self) -> &str {
    &self.mark_name
  }

  /// Rewrite one run, splitting out marked spans. Runs that already carry
  /// this rule's mark pass through untouched.
  fn apply(&self, run: &TextRun) -> Vec<TextRun> {
    if run.marks.iter().any(|m| m.name() == self.mark_name) {
      return vec![run.clone()];
    }
    let mut out = Vec::new();
    let mut last = 0;
    for caps in self.pattern.captures_iter(&run.text) {
      let (Some(span), Some(inner)) = (caps.get(1), caps.get(2)) else {
        continue;
      };
      if span.start() > last {
        out.push(TextRun {
          text:  run.text[last..span.start()].to_string(),
          marks: run.marks.clone(),
        });
      }
      let mut marks = run.marks.clone();
      marks.push(Mark::new(self.mark_name.clone()));
      out.push(TextRun {
        text: inner.as_str().to_string(),
        marks,
      });
      last = span.end();
    }
    if last < run.text.len() {
      out.push(TextRun {
        text:  run.text[last..].to_string(),
        marks: run.marks.clone(),
      });
    }
    out.retain(|run| !run.text.is_empty());
    out
  }
}

/// Run every rule over a plain text line, producing text nodes.
pub fn apply_paste_rules(schema: &Schema, rules: &[PasteRule], text: &str) -> Vec<Node> {
  let mut runs = vec![TextRun {
    text:  text.to_string(),
    marks: Vec::new(),
  }];
  for rule in rules {
    runs = runs.iter().flat_map(|run| rule.apply(run)).collect();
  }
  runs
    .into_iter()
    .map(|run| schema.text_node(run.text, run.marks))
    .collect()
}

#[cfg(test)]
mod tests {
  use vellum_model::schema::NodeSpec;

  use super::*;

  fn schema() -> Schema {
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
        ("text".to_string(), NodeSpec {
          group: Some("inline".to_string()),
          ..NodeSpec::default()
        }),
      ],
      [("strong".to_string(), Default::default())],
    )
  }

  #[test]
  fn splits_marked_spans_out_of_plain_text() {
    let rule = mark_paste_rule(r"(\*\*([^*]+)\*\*)", "strong").unwrap();
    let nodes = apply_paste_rules(&schema(), &[rule], "a **b** c **d**");
    let texts: Vec<_> = nodes.iter().map(|n| n.text_content()).collect();
    assert_eq!(texts, vec!["a ", "b", " c ", "d"]);
    assert!(nodes[1].marks().iter().any(|m| m.name() == "strong"));
    assert!(nodes[0].marks().is_empty());
  }

  #[test]
  fn unmatched_text_passes_through() {
    let rule = mark_paste_rule(r"(\*\*([^*]+)\*\*)", "strong").unwrap();
    let nodes = apply_paste_rules(&schema(), &[rule], "plain text");
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].text_content(), "plain text");
    assert!(nodes[0].marks().is_empty());
  }
}
