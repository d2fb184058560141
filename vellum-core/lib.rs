//! Extension composition and command dispatch for the vellum editor toolkit.
//!
//! Everything an editor does arrives through extensions: schema fragments,
//! commands, keybindings, input rules, paste rules, and plugins. The
//! [`manager::ExtensionManager`] merges those contributions deterministically,
//! the [`commands::CommandManager`] runs commands one-shot or chained over a
//! single shared transaction, and [`editor::Editor`] ties both to a live
//! [`vellum_model::View`].

pub mod basic;
pub mod builtins;
pub mod commands;
pub mod editor;
pub mod extension;
pub mod input_rules;
pub mod keymap;
pub mod manager;
pub mod paste_rules;
pub mod sort;
pub mod store;

pub use commands::{
  Chain,
  CommandArgs,
  CommandContext,
  CommandManager,
  CommandMeta,
  CommandRegistry,
  MetaField,
  ResolvedMeta,
};
pub use editor::{
  Content,
  Editor,
  EditorOptions,
};
pub use extension::{
  CommandCall,
  ContentParser,
  EditorSlot,
  Extension,
  QuickInsertSource,
  ShortcutGuide,
  ShortcutGuideSource,
};
pub use manager::{
  ExtensionManager,
  QuickInsertItem,
};
pub use store::ExtensionStore;
