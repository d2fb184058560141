//! Immutable editor state.

use thiserror::Error;

use crate::{
  node::Node,
  schema::{
    Schema,
    SchemaError,
  },
  selection::Selection,
  transaction::Transaction,
};

pub type Result<T> = std::result::Result<T, StateError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
  #[error("transaction was created against state version {expected}, current is {current}")]
  StaleTransaction { expected: u64, current: u64 },
}

/// A snapshot of the document, the selection, and a version counter. States
/// are cheap to clone (the document tree is shared) and only ever advance by
/// applying a [`Transaction`] built from the same version.
#[derive(Clone, Debug)]
pub struct State {
  schema:    Schema,
  doc:       Node,
  selection: Selection,
  version:   u64,
}

impl State {
  pub fn new(schema: Schema, doc: Node) -> Self {
    let selection = Selection::at_start(&doc);
    State {
      schema,
      doc,
      selection,
      version: 0,
    }
  }

  /// A state over the schema's minimal valid document.
  pub fn empty(schema: Schema) -> std::result::Result<Self, SchemaError> {
    let doc = schema.empty_doc()?;
    Ok(State::new(schema, doc))
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

  pub fn version(&self) -> u64 {
    self.version
  }

  /// Start a transaction against this state.
  pub fn tr(&self) -> Transaction {
    Transaction::new(
      self.schema.clone(),
      self.doc.clone(),
      self.selection,
      self.version,
    )
  }

  /// Replace the document and selection wholesale, advancing the version.
  /// Used by the view for history restores and amended redispatches, where
  /// the source-version check does not apply.
  pub(crate) fn restored(&self, doc: Node, selection: Selection) -> State {
    State {
      schema: self.schema.clone(),
      doc,
      selection,
      version: self.version + 1,
    }
  }

  /// Produce the next state from a transaction. Fails when the transaction
  /// was built against a different version of the state.
  pub fn apply(&self, tr: &Transaction) -> Result<State> {
    if tr.source_version() != self.version {
      return Err(StateError::StaleTransaction {
        expected: tr.source_version(),
        current:  self.version,
      });
    }
    Ok(State {
      schema:    self.schema.clone(),
      doc:       tr.doc().clone(),
      selection: tr.selection(),
      version:   self.version + 1,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::NodeSpec;

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
      [],
    )
  }

  #[test]
  fn apply_advances_version() {
    let state = State::empty(schema()).unwrap();
    let mut tr = state.tr();
    tr.insert_text(1, "hi", Vec::new()).unwrap();
    let next = state.apply(&tr).unwrap();
    assert_eq!(next.version(), 1);
    assert_eq!(next.doc().text_content(), "hi");
    // The original state is untouched.
    assert_eq!(state.doc().text_content(), "");
  }

  #[test]
  fn apply_rejects_stale_transactions() {
    let state = State::empty(schema()).unwrap();
    let tr = state.tr();
    let mut advance = state.tr();
    advance.insert_text(1, "x", Vec::new()).unwrap();
    let next = state.apply(&advance).unwrap();
    assert!(matches!(
      next.apply(&tr),
      Err(StateError::StaleTransaction {
        expected: 0,
        current:  1,
      })
    ));
  }

  #[test]
  fn empty_state_has_cursor_in_first_textblock() {
    let state = State::empty(schema()).unwrap();
    assert_eq!(state.selection(), Selection::point(1));
  }
}
