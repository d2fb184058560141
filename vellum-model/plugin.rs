//! View plugins.
//!
//! A plugin is a named bundle of event handlers the view consults in
//! registration order. Handlers return `true` to claim an event: the first
//! claimant wins and later plugins are not consulted. Handlers never touch
//! the view directly, they submit transactions and effects through an
//! [`EventContext`](crate::view::EventContext), which the view drains after
//! the handler chain finishes.

use serde_json::Value;

use crate::{
  state::State,
  transaction::Transaction,
  view::{
    EventContext,
    Pasted,
  },
};

pub type KeyHandler = Box<dyn Fn(&mut EventContext<'_>, &str) -> bool>;
pub type TextHandler = Box<dyn Fn(&mut EventContext<'_>, &str) -> bool>;
pub type PasteHandler = Box<dyn Fn(&mut EventContext<'_>, &Pasted) -> bool>;
pub type TransactionObserver = Box<dyn Fn(&Transaction, &State)>;

/// Plugin-local state: `init` produces the starting value, `apply` folds
/// every dispatched transaction into it.
struct PluginState {
  init:  Box<dyn Fn() -> Value>,
  apply: Box<dyn Fn(&Transaction, Value, &State) -> Value>,
}

pub struct Plugin {
  name:           String,
  key_down:       Option<KeyHandler>,
  text_input:     Option<TextHandler>,
  post_input:     Option<TextHandler>,
  paste:          Option<PasteHandler>,
  on_transaction: Option<TransactionObserver>,
  state:          Option<PluginState>,
  attributes:     Vec<(String, String)>,
}

impl std::fmt::Debug for Plugin {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Plugin")
      .field("name", &self.name)
      .field("attributes", &self.attributes)
      .finish_non_exhaustive()
  }
}

impl Plugin {
  pub fn new(name: impl Into<String>) -> Self {
    Plugin {
      name:           name.into(),
      key_down:       None,
      text_input:     None,
      post_input:     None,
      paste:          None,
      on_transaction: None,
      state:          None,
      attributes:     Vec::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Handle a key press before any default behavior.
  pub fn on_key_down(
    mut self,
    handler: impl Fn(&mut EventContext<'_>, &str) -> bool + 'static,
  ) -> Self {
    self.key_down = Some(Box::new(handler));
    self
  }

  /// Filter typed text. Claiming the event suppresses the default insertion.
  pub fn on_text_input(
    mut self,
    handler: impl Fn(&mut EventContext<'_>, &str) -> bool + 'static,
  ) -> Self {
    self.text_input = Some(Box::new(handler));
    self
  }

  /// React to typed text after the default insertion has been applied.
  /// Input rules hang off this hook so they match against the document the
  /// user actually sees.
  pub fn after_text_input(
    mut self,
    handler: impl Fn(&mut EventContext<'_>, &str) -> bool + 'static,
  ) -> Self {
    self.post_input = Some(Box::new(handler));
    self
  }

  /// Handle pasted content. Claiming the event suppresses the default
  /// plain-text insertion.
  pub fn on_paste(
    mut self,
    handler: impl Fn(&mut EventContext<'_>, &Pasted) -> bool + 'static,
  ) -> Self {
    self.paste = Some(Box::new(handler));
    self
  }

  /// Observe every dispatched transaction and the state it produced.
  pub fn on_transaction(mut self, observer: impl Fn(&Transaction, &State) + 'static) -> Self {
    self.on_transaction = Some(Box::new(observer));
    self
  }

  /// Keep a value alongside the plugin. The view seeds it with `init` and
  /// runs `apply` on every dispatched transaction, threading the previous
  /// value through. Read it back with
  /// [`View::plugin_state`](crate::view::View::plugin_state).
  pub fn with_state(
    mut self,
    init: impl Fn() -> Value + 'static,
    apply: impl Fn(&Transaction, Value, &State) -> Value + 'static,
  ) -> Self {
    self.state = Some(PluginState {
      init:  Box::new(init),
      apply: Box::new(apply),
    });
    self
  }

  /// Contribute an attribute to the editor's outer element.
  pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.attributes.push((key.into(), value.into()));
    self
  }

  pub fn attributes(&self) -> &[(String, String)] {
    &self.attributes
  }

  pub(crate) fn handle_key_down(&self, ctx: &mut EventContext<'_>, key: &str) -> bool {
    match &self.key_down {
      Some(handler) => handler(ctx, key),
      None => false,
    }
  }

  pub(crate) fn handle_text_input(&self, ctx: &mut EventContext<'_>, text: &str) -> bool {
    match &self.text_input {
      Some(handler) => handler(ctx, text),
      None => false,
    }
  }

  pub(crate) fn handle_post_input(&self, ctx: &mut EventContext<'_>, text: &str) -> bool {
    match &self.post_input {
      Some(handler) => handler(ctx, text),
      None => false,
    }
  }

  pub(crate) fn handle_paste(&self, ctx: &mut EventContext<'_>, pasted: &Pasted) -> bool {
    match &self.paste {
      Some(handler) => handler(ctx, pasted),
      None => false,
    }
  }

  pub(crate) fn observe(&self, tr: &Transaction, state: &State) {
    if let Some(observer) = &self.on_transaction {
      observer(tr, state);
    }
  }

  pub(crate) fn init_state(&self) -> Option<Value> {
    self.state.as_ref().map(|state| (state.init)())
  }

  pub(crate) fn apply_state(&self, tr: &Transaction, value: Value, state: &State) -> Value {
    match &self.state {
      Some(plugin_state) => (plugin_state.apply)(tr, value, state),
      None => value,
    }
  }
}
