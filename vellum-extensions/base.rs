//! Editing basics that carry no schema of their own: history and structural
//! navigation keybindings over the builtin commands.

use vellum_core::extension::{
  CommandCall,
  EditorSlot,
  Extension,
};

#[derive(Debug, Default)]
pub struct BaseExtension {
  slot: EditorSlot,
}

impl BaseExtension {
  pub fn new() -> Self {
    BaseExtension::default()
  }
}

impl Extension for BaseExtension {
  fn name(&self) -> &'static str {
    "base"
  }

  fn slot(&self) -> &EditorSlot {
    &self.slot
  }

  fn add_keybindings(&self) -> Vec<(String, CommandCall)> {
    vec![
      ("Mod-z".to_string(), CommandCall::bare("undo")),
      ("Shift-Mod-z".to_string(), CommandCall::bare("redo")),
      ("Mod-y".to_string(), CommandCall::bare("redo")),
      ("Escape".to_string(), CommandCall::bare("selectParentNode")),
      ("Mod-BracketLeft".to_string(), CommandCall::bare("lift")),
    ]
  }
}
