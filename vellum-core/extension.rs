//! The extension contract.
//!
//! An extension is a named bundle of contributions: schema fragments,
//! commands, keybindings, input rules, paste rules, plugins, and node views.
//! All contribution hooks have empty defaults; an extension implements only
//! the ones it cares about, and the [`ExtensionManager`](crate::manager)
//! merges everything into a single editor configuration.
//!
//! Extensions are constructed before the editor exists. They receive a
//! handle through [`Extension::set_editor`], held in an [`EditorSlot`],
//! before any resolution hook runs, so even `add_commands` may reach the
//! editor. Touching the slot on a free-standing extension is a programming
//! error and panics.

use std::rc::Rc;

use once_cell::unsync::OnceCell;
use vellum_model::{
  MarkSpec,
  Node,
  NodeSpec,
  Plugin,
  Schema,
};

use crate::{
  commands::{
    CommandArgs,
    CommandRegistry,
  },
  editor::{
    Editor,
    WeakEditor,
  },
  input_rules::InputRule,
  paste_rules::PasteRule,
};

/// Renders a node type to HTML, overriding the schema-driven serializer.
pub type NodeViewFn = Rc<dyn Fn(&Node) -> String>;

/// A named command invocation, as stored in keybinding tables.
#[derive(Clone, Debug)]
pub struct CommandCall {
  pub name: String,
  pub args: CommandArgs,
}

impl CommandCall {
  pub fn bare(name: impl Into<String>) -> Self {
    CommandCall {
      name: name.into(),
      args: CommandArgs::none(),
    }
  }

  pub fn with_args(name: impl Into<String>, args: CommandArgs) -> Self {
    CommandCall {
      name: name.into(),
      args,
    }
  }
}

/// Deferred editor handle handed to an extension during setup.
#[derive(Debug, Default)]
pub struct EditorSlot {
  cell: OnceCell<WeakEditor>,
}

impl EditorSlot {
  pub fn new() -> Self {
    EditorSlot::default()
  }

  pub(crate) fn bind(&self, editor: &Editor) {
    // Re-binding is a no-op; an extension instance belongs to one editor.
    let _ = self.cell.set(editor.downgrade());
  }

  /// The owning editor.
  ///
  /// # Panics
  ///
  /// Panics when called before the extension was handed to an editor, or
  /// after the editor was dropped.
  pub fn editor(&self) -> Editor {
    match self.cell.get().and_then(WeakEditor::upgrade) {
      Some(editor) => editor,
      None => panic!("accessed `editor` before the editor was created"),
    }
  }

  pub fn try_editor(&self) -> Option<Editor> {
    self.cell.get().and_then(WeakEditor::upgrade)
  }
}

/// Optional capability: turning external text (e.g. Markdown) into a
/// document. The paste pipeline and initial-content loading query
/// extensions for it instead of probing method presence.
pub trait ContentParser {
  fn parse(&self, schema: &Schema, text: &str) -> Option<Node>;
}

/// One row of a shortcut overview: what the feature is called and how to
/// reach it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShortcutGuide {
  pub icon:     String,
  pub label:    String,
  pub shortcut: Option<String>,
  pub markdown: Option<String>,
}

/// Optional capability: contributing rows to the shortcut overview.
pub trait ShortcutGuideSource {
  fn shortcut_guides(&self) -> Vec<ShortcutGuide>;
}

/// Optional capability: offering commands to the quick-insert menu. Each
/// call is resolved against the command's registered metadata; calls naming
/// commands without metadata are dropped.
pub trait QuickInsertSource {
  fn quick_insert_calls(&self) -> Vec<CommandCall>;
}

pub trait Extension {
  fn name(&self) -> &'static str;

  fn slot(&self) -> &EditorSlot;

  fn set_editor(&self, editor: &Editor) {
    self.slot().bind(editor);
  }

  fn editor(&self) -> Editor {
    self.slot().editor()
  }

  /// Names of extensions this one needs present. Missing dependencies fail
  /// editor construction instead of surfacing as broken commands later.
  fn requires(&self) -> Vec<&'static str> {
    Vec::new()
  }

  /// Node types contributed to the schema.
  fn nodes(&self) -> Vec<(String, NodeSpec)> {
    Vec::new()
  }

  /// Mark types contributed to the schema.
  fn marks(&self) -> Vec<(String, MarkSpec)> {
    Vec::new()
  }

  /// Register commands. Later extensions override earlier registrations of
  /// the same name.
  fn add_commands(&self, registry: &mut CommandRegistry) {
    let _ = registry;
  }

  /// Keybindings as `(binding, command call)` pairs.
  fn add_keybindings(&self) -> Vec<(String, CommandCall)> {
    Vec::new()
  }

  fn add_input_rules(&self, schema: &Schema) -> Vec<InputRule> {
    let _ = schema;
    Vec::new()
  }

  fn add_paste_rules(&self, schema: &Schema) -> Vec<PasteRule> {
    let _ = schema;
    Vec::new()
  }

  fn add_plugins(&self) -> Vec<Plugin> {
    Vec::new()
  }

  /// HTML renderers overriding the default serialization per node type.
  fn node_views(&self) -> Vec<(String, NodeViewFn)> {
    Vec::new()
  }

  /// Content-parsing capability, if this extension provides one.
  fn content_parser(&self) -> Option<&dyn ContentParser> {
    None
  }

  /// Shortcut-overview capability, if this extension provides one.
  fn shortcut_guide(&self) -> Option<&dyn ShortcutGuideSource> {
    None
  }

  /// Quick-insert capability, if this extension provides one.
  fn quick_insert(&self) -> Option<&dyn QuickInsertSource> {
    None
  }

  /// Called once after every extension has been bound to the editor.
  /// Cross-extension setup (collecting other extensions' capabilities into
  /// the store, say) belongs here.
  fn before_resolved_all(&self) {}

  fn on_destroy(&self) {}
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  #[should_panic(expected = "accessed `editor` before the editor was created")]
  fn unbound_slot_panics_on_editor() {
    EditorSlot::new().editor();
  }

  #[test]
  fn unbound_slot_try_editor_is_none() {
    assert!(EditorSlot::new().try_editor().is_none());
  }
}
