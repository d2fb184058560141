//! The inline text type.

use vellum_model::NodeSpec;

use crate::extension::{
  EditorSlot,
  Extension,
};

#[derive(Debug, Default)]
pub struct TextExtension {
  slot: EditorSlot,
}

impl TextExtension {
  pub fn new() -> Self {
    TextExtension::default()
  }
}

impl Extension for TextExtension {
  fn name(&self) -> &'static str {
    "text"
  }

  fn slot(&self) -> &EditorSlot {
    &self.slot
  }

  fn nodes(&self) -> Vec<(String, NodeSpec)> {
    vec![("text".to_string(), NodeSpec {
      group: Some("inline".to_string()),
      inline: true,
      ..NodeSpec::default()
    })]
  }
}
