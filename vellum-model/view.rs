//! The editor view: owns the live state, the undo history, and the plugin
//! chain, and is the single place transactions are committed.
//!
//! Dispatch is version-checked: a transaction built against an older state
//! is rejected instead of silently clobbering newer edits. The one exception
//! is an *amended* redispatch, where the exact transaction that produced the
//! current state is dispatched again with more steps recorded. The view
//! recognizes it by id and folds it into the existing history entry, so a
//! sequence of commands sharing one transaction undoes as a single step.

use thiserror::Error;
use tracing::{
  trace,
  warn,
};

use crate::{
  history::History,
  node::{
    Mark,
    Node,
  },
  plugin::Plugin,
  selection::Selection,
  state::{
    State,
    StateError,
  },
  transaction::Transaction,
};

pub type Result<T> = std::result::Result<T, ViewError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewError {
  #[error(transparent)]
  State(#[from] StateError),
}

/// Side effects commands request alongside (or instead of) a document
/// change. The view applies them after dispatching.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
  Focus,
  Undo,
  Redo,
}

/// View metadata exposed to plugins and commands.
#[derive(Clone, Copy, Debug)]
pub struct ViewInfo {
  pub editable: bool,
  pub focused:  bool,
  pub can_undo: bool,
  pub can_redo: bool,
}

/// Clipboard payload handed to paste handlers.
#[derive(Clone, Debug, Default)]
pub struct Pasted {
  pub text: String,
  pub html: Option<String>,
}

/// Collects the transactions and effects a plugin handler wants applied.
/// Handlers read state through it and submit outcomes; the view drains the
/// context once the handler chain settles.
pub struct EventContext<'a> {
  state:        &'a State,
  info:         ViewInfo,
  transactions: Vec<Transaction>,
  effects:      Vec<Effect>,
}

impl<'a> EventContext<'a> {
  fn new(state: &'a State, info: ViewInfo) -> Self {
    EventContext {
      state,
      info,
      transactions: Vec::new(),
      effects: Vec::new(),
    }
  }

  pub fn state(&self) -> &State {
    self.state
  }

  pub fn info(&self) -> ViewInfo {
    self.info
  }

  /// Start a transaction against the current state.
  pub fn tr(&self) -> Transaction {
    self.state.tr()
  }

  pub fn submit(&mut self, tr: Transaction) {
    self.transactions.push(tr);
  }

  pub fn add_effect(&mut self, effect: Effect) {
    self.effects.push(effect);
  }

  fn finish(self) -> (Vec<Transaction>, Vec<Effect>) {
    (self.transactions, self.effects)
  }
}

pub struct View {
  state:        State,
  plugins:      Vec<Plugin>,
  // Parallel to `plugins`; `None` for plugins without state.
  plugin_state: Vec<Option<serde_json::Value>>,
  history:      History,
  editable:     bool,
  focused:      bool,
  last_doc_tx:  Option<u64>,
}

impl View {
  pub fn new(state: State, plugins: Vec<Plugin>, editable: bool) -> Self {
    let plugin_state = plugins.iter().map(Plugin::init_state).collect();
    View {
      state,
      plugins,
      plugin_state,
      history: History::new(),
      editable,
      focused: false,
      last_doc_tx: None,
    }
  }

  pub fn state(&self) -> &State {
    &self.state
  }

  pub fn editable(&self) -> bool {
    self.editable
  }

  pub fn set_editable(&mut self, editable: bool) {
    self.editable = editable;
  }

  pub fn focused(&self) -> bool {
    self.focused
  }

  pub fn focus(&mut self) {
    self.focused = true;
  }

  pub fn blur(&mut self) {
    self.focused = false;
  }

  pub fn info(&self) -> ViewInfo {
    ViewInfo {
      editable: self.editable,
      focused:  self.focused,
      can_undo: self.history.can_undo(),
      can_redo: self.history.can_redo(),
    }
  }

  /// Attributes contributed by plugins for the editor's outer element.
  pub fn attributes(&self) -> Vec<(String, String)> {
    self
      .plugins
      .iter()
      .flat_map(|plugin| plugin.attributes().iter().cloned())
      .collect()
  }

  pub fn can_undo(&self) -> bool {
    self.history.can_undo()
  }

  pub fn can_redo(&self) -> bool {
    self.history.can_redo()
  }

  /// Commit a transaction, advancing the state. Selection-only transactions
  /// skip the history; an amended redispatch of the latest document-changing
  /// transaction folds into its existing history entry.
  pub fn dispatch(&mut self, tr: &Transaction) -> Result<()> {
    if tr.doc_changed() {
      if self.last_doc_tx == Some(tr.id()) {
        self.state = self.state.restored(tr.doc().clone(), tr.selection());
      } else {
        let next = self.state.apply(tr)?;
        self
          .history
          .record(self.state.doc().clone(), self.state.selection());
        self.state = next;
        self.last_doc_tx = Some(tr.id());
      }
      trace!(steps = tr.steps().len(), version = self.state.version(), "dispatched");
    } else {
      self.state = self.state.apply(tr)?;
    }
    for (index, plugin) in self.plugins.iter().enumerate() {
      if let Some(value) = self.plugin_state[index].take() {
        self.plugin_state[index] = Some(plugin.apply_state(tr, value, &self.state));
      }
      plugin.observe(tr, &self.state);
    }
    Ok(())
  }

  /// The named plugin's local state, if it keeps any.
  pub fn plugin_state(&self, name: &str) -> Option<&serde_json::Value> {
    self
      .plugins
      .iter()
      .position(|plugin| plugin.name() == name)
      .and_then(|index| self.plugin_state[index].as_ref())
  }

  pub fn undo(&mut self) -> bool {
    let Some(revision) = self
      .history
      .undo(self.state.doc(), self.state.selection())
    else {
      return false;
    };
    self.state = self.state.restored(revision.doc, revision.selection);
    self.last_doc_tx = None;
    true
  }

  pub fn redo(&mut self) -> bool {
    let Some(revision) = self
      .history
      .redo(self.state.doc(), self.state.selection())
    else {
      return false;
    };
    self.state = self.state.restored(revision.doc, revision.selection);
    self.last_doc_tx = None;
    true
  }

  pub fn apply_effect(&mut self, effect: Effect) {
    match effect {
      Effect::Focus => self.focused = true,
      Effect::Undo => {
        self.undo();
      },
      Effect::Redo => {
        self.redo();
      },
    }
  }

  fn drain(&mut self, transactions: Vec<Transaction>, effects: Vec<Effect>) {
    for tr in transactions {
      if let Err(err) = self.dispatch(&tr) {
        warn!(%err, "dropping transaction from event handler");
      }
    }
    for effect in effects {
      self.apply_effect(effect);
    }
  }

  /// Route a key press through the plugin chain. The first handler to claim
  /// it wins; returns whether anyone did.
  pub fn key_down(&mut self, key: &str) -> bool {
    if !self.editable {
      return false;
    }
    let (handled, transactions, effects) = {
      let mut ctx = EventContext::new(&self.state, self.info());
      let mut handled = false;
      for plugin in &self.plugins {
        if plugin.handle_key_down(&mut ctx, key) {
          handled = true;
          break;
        }
      }
      let (transactions, effects) = ctx.finish();
      (handled, transactions, effects)
    };
    self.drain(transactions, effects);
    handled
  }

  /// Type text at the selection. Text-input filters run first and may claim
  /// the event; otherwise the text is inserted (replacing any selection,
  /// inheriting marks from the character before the cursor) and post-input
  /// handlers such as input rules get a look at the result.
  pub fn insert_text(&mut self, text: &str) -> bool {
    if !self.editable || text.is_empty() {
      return false;
    }

    let (handled, transactions, effects) = {
      let mut ctx = EventContext::new(&self.state, self.info());
      let mut handled = false;
      for plugin in &self.plugins {
        if plugin.handle_text_input(&mut ctx, text) {
          handled = true;
          break;
        }
      }
      let (transactions, effects) = ctx.finish();
      (handled, transactions, effects)
    };
    self.drain(transactions, effects);
    if handled {
      return true;
    }

    let mut tr = self.state.tr();
    if !tr.selection().is_empty() && tr.delete_selection().is_err() {
      return false;
    }
    let pos = tr.selection().from();
    let marks = marks_before(tr.doc(), pos);
    if tr.insert_text(pos, text, marks).is_err() {
      return false;
    }
    tr.set_selection(Selection::point(pos + text.chars().count()));
    if self.dispatch(&tr).is_err() {
      return false;
    }

    let (transactions, effects) = {
      let mut ctx = EventContext::new(&self.state, self.info());
      for plugin in &self.plugins {
        if plugin.handle_post_input(&mut ctx, text) {
          break;
        }
      }
      ctx.finish()
    };
    self.drain(transactions, effects);
    true
  }

  /// Paste clipboard content. Paste handlers run first; unclaimed pastes
  /// fall back to plain-text insertion.
  pub fn paste(&mut self, pasted: &Pasted) -> bool {
    if !self.editable {
      return false;
    }
    let (handled, transactions, effects) = {
      let mut ctx = EventContext::new(&self.state, self.info());
      let mut handled = false;
      for plugin in &self.plugins {
        if plugin.handle_paste(&mut ctx, pasted) {
          handled = true;
          break;
        }
      }
      let (transactions, effects) = ctx.finish();
      (handled, transactions, effects)
    };
    self.drain(transactions, effects);
    if handled {
      return true;
    }
    self.insert_text(&pasted.text)
  }
}

/// Marks of the inline token immediately before `pos`, used so typed text
/// continues the surrounding formatting.
fn marks_before(doc: &Node, pos: usize) -> Vec<Mark> {
  let Ok(rp) = doc.resolve(pos) else {
    return Vec::new();
  };
  if !rp.parent().is_textblock() || rp.parent_offset == 0 {
    return Vec::new();
  }
  let tokens = rp.parent().inline_tokens();
  tokens
    .get(rp.parent_offset - 1)
    .map(|token| token.marks().to_vec())
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::{
    NodeSpec,
    Schema,
  };

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

  fn view() -> View {
    View::new(State::empty(schema()).unwrap(), Vec::new(), true)
  }

  #[test]
  fn dispatch_rejects_stale_transaction() {
    let mut view = view();
    let mut stale = view.state().tr();
    let mut tr = view.state().tr();
    tr.insert_text(1, "x", Vec::new()).unwrap();
    view.dispatch(&tr).unwrap();
    stale.insert_text(1, "y", Vec::new()).unwrap();
    assert!(view.dispatch(&stale).is_err());
    assert_eq!(view.state().doc().text_content(), "x");
  }

  #[test]
  fn amended_redispatch_is_one_history_entry() {
    let mut view = view();
    let mut tr = view.state().tr();
    tr.insert_text(1, "a", Vec::new()).unwrap();
    view.dispatch(&tr).unwrap();
    tr.insert_text(2, "b", Vec::new()).unwrap();
    view.dispatch(&tr).unwrap();
    assert_eq!(view.state().doc().text_content(), "ab");
    assert!(view.undo());
    assert_eq!(view.state().doc().text_content(), "");
    assert!(!view.can_undo());
  }

  #[test]
  fn selection_only_dispatch_skips_history() {
    let mut view = view();
    let mut tr = view.state().tr();
    tr.set_selection(Selection::point(1));
    view.dispatch(&tr).unwrap();
    assert!(!view.can_undo());
  }

  #[test]
  fn typed_text_inherits_marks() {
    let mut view = view();
    let mut tr = view.state().tr();
    tr.insert_text(1, "b", vec![Mark::new("strong")]).unwrap();
    tr.set_selection(Selection::point(2));
    view.dispatch(&tr).unwrap();
    assert!(view.insert_text("old"));
    assert_eq!(view.state().doc().text_content(), "bold");
    assert!(crate::transaction::range_has_mark(
      view.state().doc(),
      1,
      5,
      "strong"
    ));
  }

  #[test]
  fn key_handlers_chain_first_claim_wins() {
    let first = Plugin::new("first").on_key_down(|_, key| key == "Enter");
    let second = Plugin::new("second").on_key_down(|ctx, _| {
      let mut tr = ctx.tr();
      tr.insert_text(1, "!", Vec::new()).unwrap();
      ctx.submit(tr);
      true
    });
    let mut view = View::new(State::empty(schema()).unwrap(), vec![first, second], true);
    // First plugin claims Enter without a transaction.
    assert!(view.key_down("Enter"));
    assert_eq!(view.state().doc().text_content(), "");
    // Second plugin gets everything else.
    assert!(view.key_down("a"));
    assert_eq!(view.state().doc().text_content(), "!");
  }

  #[test]
  fn plugin_state_folds_over_transactions() {
    let counter = Plugin::new("counter").with_state(
      || serde_json::json!(0),
      |tr, value, _state| {
        if tr.doc_changed() {
          serde_json::json!(value.as_u64().unwrap_or(0) + 1)
        } else {
          value
        }
      },
    );
    let mut view = View::new(State::empty(schema()).unwrap(), vec![counter], true);
    assert_eq!(view.plugin_state("counter"), Some(&serde_json::json!(0)));
    assert!(view.insert_text("a"));
    assert!(view.insert_text("b"));
    assert_eq!(view.plugin_state("counter"), Some(&serde_json::json!(2)));
    // Selection-only transactions still reach `apply`, which leaves the
    // count alone here.
    let mut tr = view.state().tr();
    tr.set_selection(Selection::point(1));
    view.dispatch(&tr).unwrap();
    assert_eq!(view.plugin_state("counter"), Some(&serde_json::json!(2)));
    assert_eq!(view.plugin_state("keymap"), None);
  }

  #[test]
  fn read_only_view_ignores_events() {
    let mut view = View::new(State::empty(schema()).unwrap(), Vec::new(), false);
    assert!(!view.insert_text("nope"));
    assert!(!view.key_down("Enter"));
    assert_eq!(view.state().doc().text_content(), "");
  }

  #[test]
  fn undo_redo_moves_through_revisions() {
    let mut view = view();
    assert!(!view.undo());
    view.insert_text("one");
    let mut tr = view.state().tr();
    tr.insert_text(4, " two", Vec::new()).unwrap();
    view.dispatch(&tr).unwrap();
    assert_eq!(view.state().doc().text_content(), "one two");
    assert!(view.undo());
    assert_eq!(view.state().doc().text_content(), "one");
    assert!(view.redo());
    assert_eq!(view.state().doc().text_content(), "one two");
  }
}
