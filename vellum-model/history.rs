//! Undo history.
//!
//! The view records a [`Revision`] snapshot of the document and selection
//! before every document-changing dispatch. Because the tree is persistent,
//! a revision is two cheap clones, not a deep copy. Chained commands land as
//! a single dispatch and therefore a single revision, so one undo reverts
//! the whole chain.

use crate::{
  node::Node,
  selection::Selection,
};

#[derive(Clone, Debug)]
pub struct Revision {
  pub doc:       Node,
  pub selection: Selection,
}

#[derive(Debug, Default)]
pub struct History {
  done:   Vec<Revision>,
  undone: Vec<Revision>,
}

impl History {
  pub fn new() -> Self {
    History::default()
  }

  /// Record the pre-change snapshot. Any redo branch is discarded.
  pub fn record(&mut self, doc: Node, selection: Selection) {
    self.done.push(Revision { doc, selection });
    self.undone.clear();
  }

  /// Pop the latest revision, stashing the current snapshot for redo.
  pub fn undo(&mut self, current_doc: &Node, current_selection: Selection) -> Option<Revision> {
    let revision = self.done.pop()?;
    self.undone.push(Revision {
      doc:       current_doc.clone(),
      selection: current_selection,
    });
    Some(revision)
  }

  pub fn redo(&mut self, current_doc: &Node, current_selection: Selection) -> Option<Revision> {
    let revision = self.undone.pop()?;
    self.done.push(Revision {
      doc:       current_doc.clone(),
      selection: current_selection,
    });
    Some(revision)
  }

  pub fn can_undo(&self) -> bool {
    !self.done.is_empty()
  }

  pub fn can_redo(&self) -> bool {
    !self.undone.is_empty()
  }

  pub fn depth(&self) -> usize {
    self.done.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::{
    NodeSpec,
    Schema,
  };

  fn doc_with(text: &str) -> Node {
    let schema = Schema::new(
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
      [],
    );
    let para = schema
      .node_type("paragraph")
      .unwrap()
      .create(Default::default(), vec![schema.text_node(text, Vec::new())]);
    schema
      .node_type("doc")
      .unwrap()
      .create(Default::default(), vec![para])
  }

  #[test]
  fn undo_redo_round_trip() {
    let mut history = History::new();
    let before = doc_with("a");
    let after = doc_with("ab");

    history.record(before.clone(), Selection::point(1));
    assert!(history.can_undo());

    let revision = history.undo(&after, Selection::point(3)).unwrap();
    assert_eq!(revision.doc.text_content(), "a");
    assert!(history.can_redo());
    assert!(!history.can_undo());

    let revision = history.redo(&before, Selection::point(1)).unwrap();
    assert_eq!(revision.doc.text_content(), "ab");
    assert!(history.can_undo());
  }

  #[test]
  fn record_discards_redo_branch() {
    let mut history = History::new();
    history.record(doc_with("a"), Selection::point(1));
    history.undo(&doc_with("ab"), Selection::point(2)).unwrap();
    assert!(history.can_redo());
    history.record(doc_with("ac"), Selection::point(2));
    assert!(!history.can_redo());
  }
}
