//! Shared extension storage.
//!
//! Each editor owns one store; extensions bound to different editors never
//! see each other's values. Keys are conventionally `extension.field`.

use std::{
  cell::RefCell,
  collections::HashMap,
};

use serde_json::Value;

#[derive(Debug, Default)]
pub struct ExtensionStore {
  values: RefCell<HashMap<String, Value>>,
}

impl ExtensionStore {
  pub fn new() -> Self {
    ExtensionStore::default()
  }

  pub fn set(&self, key: impl Into<String>, value: Value) {
    self.values.borrow_mut().insert(key.into(), value);
  }

  pub fn get(&self, key: &str) -> Option<Value> {
    self.values.borrow().get(key).cloned()
  }

  pub fn remove(&self, key: &str) -> Option<Value> {
    self.values.borrow_mut().remove(key)
  }

  pub fn clear(&self) {
    self.values.borrow_mut().clear();
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn set_get_remove() {
    let store = ExtensionStore::new();
    assert_eq!(store.get("strong.active"), None);
    store.set("strong.active", json!(true));
    assert_eq!(store.get("strong.active"), Some(json!(true)));
    store.set("strong.active", json!(false));
    assert_eq!(store.get("strong.active"), Some(json!(false)));
    assert_eq!(store.remove("strong.active"), Some(json!(false)));
    assert_eq!(store.get("strong.active"), None);
  }
}
