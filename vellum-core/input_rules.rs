//! Input rules: pattern-triggered rewrites of just-typed text.
//!
//! Rules match against the text of the current textblock up to the cursor,
//! after the typed character has landed in the document. Matching that
//! post-insert snapshot keeps rules in lockstep with what the user sees;
//! inline leaves appear as U+FFFC so a pattern cannot run across a hard
//! break. The first matching rule wins.

use regex::Regex;
use thiserror::Error;
use vellum_model::{
  Mark,
  Plugin,
  Selection,
  Transaction,
  Attrs,
};

pub type Result<T> = std::result::Result<T, InputRuleError>;

#[derive(Debug, Error)]
pub enum InputRuleError {
  #[error("invalid input rule pattern: {0}")]
  Pattern(#[from] regex::Error),
}

/// A capture group mapped to absolute document positions.
#[derive(Clone, Debug)]
pub struct MatchGroup {
  pub from: usize,
  pub to:   usize,
  pub text: String,
}

/// A rule match: capture groups with their absolute positions. Group 0 is
/// the whole match.
#[derive(Clone, Debug)]
pub struct RuleMatch {
  groups: Vec<Option<MatchGroup>>,
}

impl RuleMatch {
  fn from_captures(text: &str, caps: &regex::Captures<'_>, content_start: usize) -> Self {
    let char_at = |byte: usize| text[..byte].chars().count();
    let groups = (0..caps.len())
      .map(|i| {
        caps.get(i).map(|m| MatchGroup {
          from: content_start + char_at(m.start()),
          to:   content_start + char_at(m.end()),
          text: m.as_str().to_string(),
        })
      })
      .collect();
    RuleMatch { groups }
  }

  pub fn group(&self, index: usize) -> Option<&MatchGroup> {
    self.groups.get(index).and_then(Option::as_ref)
  }
}

type RuleHandler = Box<dyn Fn(&mut Transaction, &RuleMatch) -> bool>;

pub struct InputRule {
  pattern: Regex,
  handler: RuleHandler,
}

impl InputRule {
  pub fn new(
    pattern: &str,
    handler: impl Fn(&mut Transaction, &RuleMatch) -> bool + 'static,
  ) -> Result<Self> {
    Ok(InputRule {
      pattern: Regex::new(pattern)?,
      handler: Box::new(handler),
    })
  }
}

/// Rule applying a mark to delimited text, e.g. `**bold**`. The pattern
/// must capture the full delimited span as group 1 and the inner text as
/// group 2.
pub fn mark_input_rule(pattern: &str, mark_name: &str) -> Result<InputRule> {
  let mark_name = mark_name.to_string();
  InputRule::new(pattern, move |tr, m| {
    let (Some(span), Some(inner)) = (m.group(1), m.group(2)) else {
      return false;
    };
    let text = inner.text.clone();
    let from = span.from;
    if tr.delete(from, span.to).is_err() {
      return false;
    }
    if tr
      .insert_text(from, &text, vec![Mark::new(mark_name.clone())])
      .is_err()
    {
      return false;
    }
    tr.set_selection(Selection::point(from + text.chars().count()));
    true
  })
}

/// Rule retyping the current textblock, e.g. `## ` into a heading. Attrs
/// are derived from the match (heading level from the number of `#`s).
pub fn textblock_input_rule(
  pattern: &str,
  type_name: &str,
  attrs: impl Fn(&RuleMatch) -> Attrs + 'static,
) -> Result<InputRule> {
  let type_name = type_name.to_string();
  InputRule::new(pattern, move |tr, m| {
    let Some(whole) = m.group(0) else {
      return false;
    };
    let Some(type_) = tr.schema().node_type(&type_name) else {
      return false;
    };
    let from = whole.from;
    if tr.delete(from, whole.to).is_err() {
      return false;
    }
    tr.set_block_type(from, from, &type_, attrs(m)).is_ok()
  })
}

/// Rule wrapping the current textblock, e.g. `> ` into a blockquote.
pub fn wrapping_input_rule(pattern: &str, type_name: &str) -> Result<InputRule> {
  let type_name = type_name.to_string();
  InputRule::new(pattern, move |tr, m| {
    let Some(whole) = m.group(0) else {
      return false;
    };
    let Some(type_) = tr.schema().node_type(&type_name) else {
      return false;
    };
    let from = whole.from;
    if tr.delete(from, whole.to).is_err() {
      return false;
    }
    tr.wrap(from, from, &[(type_, Attrs::new())]).is_ok()
  })
}

/// The plugin the manager appends once all extension rules are collected.
pub fn input_rules_plugin(rules: Vec<InputRule>) -> Plugin {
  Plugin::new("input-rules").after_text_input(move |ctx, _typed| {
    let state = ctx.state();
    let sel = state.selection();
    if !sel.is_empty() {
      return false;
    }
    let Ok(rp) = state.doc().resolve(sel.head) else {
      return false;
    };
    if !rp.parent().is_textblock() {
      return false;
    }
    let text = rp.parent().textblock_text();
    let before: String = text.chars().take(rp.parent_offset).collect();
    if before.is_empty() {
      return false;
    }
    let content_start = rp.start(rp.depth());
    for rule in &rules {
      let Some(caps) = rule.pattern.captures(&before) else {
        continue;
      };
      // Only matches ending at the cursor count.
      if caps
        .get(0)
        .map(|m| m.end() != before.len())
        .unwrap_or(true)
      {
        continue;
      }
      let m = RuleMatch::from_captures(&before, &caps, content_start);
      let mut tr = ctx.tr();
      if (rule.handler)(&mut tr, &m) {
        ctx.submit(tr);
        return true;
      }
    }
    false
  })
}
