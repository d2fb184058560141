//! Canonical ordering for merged schema fragments.
//!
//! Schema types are registered in a fixed order so the merged schema (and
//! everything keyed off it, like paste parsing) is independent of the order
//! extensions were passed in. Types missing from the table sort before all
//! listed ones, preserving their relative order.

const MARK_ORDER: [&str; 6] = ["link", "em", "strong", "code", "underline", "strike"];

const NODE_ORDER: [&str; 15] = [
  "doc",
  "paragraph",
  "blockquote",
  "horizontal_rule",
  "heading",
  "code_block",
  "ordered_list",
  "bullet_list",
  "list_item",
  "todo_list",
  "todo_item",
  "todo",
  "text",
  "image",
  "hard_break",
];

fn priority(order: &[&str], name: &str) -> i64 {
  order
    .iter()
    .position(|entry| *entry == name)
    .map(|index| index as i64)
    .unwrap_or(-1)
}

/// Stable sort of `(name, spec)` pairs by the node priority table.
pub fn sort_nodes<T>(nodes: &mut [(String, T)]) {
  nodes.sort_by_key(|(name, _)| priority(&NODE_ORDER, name));
}

/// Stable sort of `(name, spec)` pairs by the mark priority table.
pub fn sort_marks<T>(marks: &mut [(String, T)]) {
  marks.sort_by_key(|(name, _)| priority(&MARK_ORDER, name));
}
