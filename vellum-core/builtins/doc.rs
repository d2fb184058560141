//! The document root type.

use vellum_model::NodeSpec;

use crate::extension::{
  EditorSlot,
  Extension,
};

#[derive(Debug, Default)]
pub struct DocExtension {
  slot: EditorSlot,
}

impl DocExtension {
  pub fn new() -> Self {
    DocExtension::default()
  }
}

impl Extension for DocExtension {
  fn name(&self) -> &'static str {
    "doc"
  }

  fn slot(&self) -> &EditorSlot {
    &self.slot
  }

  fn nodes(&self) -> Vec<(String, NodeSpec)> {
    vec![("doc".to_string(), NodeSpec {
      content: Some("block+".to_string()),
      ..NodeSpec::default()
    })]
  }
}
