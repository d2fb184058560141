//! Text selections over token positions.

use crate::node::Node;

/// Anchor/head selection. `anchor` is the fixed side, `head` the moving one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selection {
  pub anchor: usize,
  pub head:   usize,
}

impl Selection {
  pub fn new(anchor: usize, head: usize) -> Self {
    Self { anchor, head }
  }

  pub fn point(pos: usize) -> Self {
    Self {
      anchor: pos,
      head:   pos,
    }
  }

  pub fn from(&self) -> usize {
    self.anchor.min(self.head)
  }

  pub fn to(&self) -> usize {
    self.anchor.max(self.head)
  }

  pub fn is_empty(&self) -> bool {
    self.anchor == self.head
  }

  /// A cursor at the start of the first textblock of `doc`, or position 0
  /// when the document has none.
  pub fn at_start(doc: &Node) -> Self {
    let blocks = doc.textblocks_between(0, doc.content_size());
    match blocks.first() {
      Some(block) => Selection::point(block.content_start),
      None => Selection::point(0),
    }
  }

  /// Map both endpoints through a replacement of `from..to` by `new_len`
  /// tokens.
  pub fn map_replace(&self, from: usize, to: usize, new_len: usize) -> Self {
    Selection {
      anchor: map_pos(self.anchor, from, to, new_len),
      head:   map_pos(self.head, from, to, new_len),
    }
  }
}

fn map_pos(pos: usize, from: usize, to: usize, new_len: usize) -> usize {
  if pos <= from {
    pos
  } else if pos >= to {
    pos - (to - from) + new_len
  } else {
    // Inside the replaced range: collapse to its start.
    from + new_len.min(pos - from)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mapping_through_replacement() {
    let sel = Selection::new(2, 10);
    // Delete 4..6.
    let mapped = sel.map_replace(4, 6, 0);
    assert_eq!(mapped, Selection::new(2, 8));
    // Insert 3 tokens at 1.
    let mapped = sel.map_replace(1, 1, 3);
    assert_eq!(mapped, Selection::new(5, 13));
    // Position inside the replaced range collapses toward its start.
    let sel = Selection::point(5);
    assert_eq!(sel.map_replace(4, 6, 0).head, 4);
  }
}
