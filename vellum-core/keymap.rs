//! Keybinding parsing and the merged key table.
//!
//! Bindings are written in the usual `Mod-b`, `Shift-Mod-z`, `Ctrl->` style.
//! `Mod` is the platform primary modifier. The merged table maps each
//! binding to a chain of command calls: the view tries them in order and the
//! first command that succeeds claims the key.

use std::{
  fmt,
  str::FromStr,
};

use indexmap::IndexMap;
use thiserror::Error;

use crate::extension::CommandCall;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeymapError {
  #[error("invalid keybinding `{0}`")]
  InvalidBinding(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Keybinding {
  pub key:   String,
  pub shift: bool,
  pub ctrl:  bool,
  pub alt:   bool,
  /// The platform primary modifier (Cmd on macOS, Ctrl elsewhere).
  pub mod_:  bool,
}

impl Keybinding {
  pub fn key(key: impl Into<String>) -> Self {
    Keybinding {
      key:   key.into(),
      shift: false,
      ctrl:  false,
      alt:   false,
      mod_:  false,
    }
  }
}

impl FromStr for Keybinding {
  type Err = KeymapError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let mut binding = Keybinding::key("");
    let mut rest = s;
    loop {
      let consumed = ["Mod-", "Ctrl-", "Alt-", "Shift-", "Cmd-"]
        .iter()
        .find(|prefix| rest.starts_with(**prefix) && rest.len() > prefix.len());
      match consumed {
        Some(prefix) => {
          match *prefix {
            "Mod-" | "Cmd-" => binding.mod_ = true,
            "Ctrl-" => binding.ctrl = true,
            "Alt-" => binding.alt = true,
            "Shift-" => binding.shift = true,
            _ => unreachable!(),
          }
          rest = &rest[prefix.len()..];
        },
        None => break,
      }
    }
    // A dangling modifier (`Mod-`) is not a binding; a literal `-` key is.
    if rest.is_empty() || (rest.len() > 1 && rest.ends_with('-')) {
      return Err(KeymapError::InvalidBinding(s.to_string()));
    }
    binding.key = rest.to_string();
    Ok(binding)
  }
}

impl fmt::Display for Keybinding {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.shift {
      write!(f, "Shift-")?;
    }
    if self.mod_ {
      write!(f, "Mod-")?;
    }
    if self.ctrl {
      write!(f, "Ctrl-")?;
    }
    if self.alt {
      write!(f, "Alt-")?;
    }
    write!(f, "{}", self.key)
  }
}

/// Merged keybinding table. Entries for the same binding accumulate in
/// insertion order; dispatch runs the chain front to back.
#[derive(Default)]
pub struct Keymap {
  bindings: IndexMap<Keybinding, Vec<CommandCall>>,
}

impl Keymap {
  pub fn new() -> Self {
    Keymap::default()
  }

  pub fn bind(&mut self, binding: &str, call: CommandCall) -> Result<(), KeymapError> {
    let binding = binding.parse()?;
    self.bindings.entry(binding).or_default().push(call);
    Ok(())
  }

  pub fn merge(&mut self, other: Keymap) {
    for (binding, calls) in other.bindings {
      self.bindings.entry(binding).or_default().extend(calls);
    }
  }

  pub fn lookup(&self, binding: &Keybinding) -> Option<&[CommandCall]> {
    self.bindings.get(binding).map(Vec::as_slice)
  }

  pub fn is_empty(&self) -> bool {
    self.bindings.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&Keybinding, &[CommandCall])> {
    self
      .bindings
      .iter()
      .map(|(binding, calls)| (binding, calls.as_slice()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_simple_and_modified() {
    let binding: Keybinding = "Mod-b".parse().unwrap();
    assert!(binding.mod_);
    assert_eq!(binding.key, "b");

    let binding: Keybinding = "Shift-Mod-z".parse().unwrap();
    assert!(binding.shift && binding.mod_);
    assert_eq!(binding.key, "z");

    let binding: Keybinding = "Enter".parse().unwrap();
    assert!(!binding.mod_ && !binding.ctrl);
    assert_eq!(binding.key, "Enter");
  }

  #[test]
  fn parse_punctuation_keys() {
    // The key itself may be `-` or `>`.
    let binding: Keybinding = "Ctrl->".parse().unwrap();
    assert!(binding.ctrl);
    assert_eq!(binding.key, ">");

    let binding: Keybinding = "Mod--".parse().unwrap();
    assert!(binding.mod_);
    assert_eq!(binding.key, "-");
  }

  #[test]
  fn parse_rejects_empty_key() {
    assert!("".parse::<Keybinding>().is_err());
    assert!("Mod-".parse::<Keybinding>().is_err());
  }

  #[test]
  fn display_round_trips() {
    for spec in ["Mod-b", "Shift-Mod-z", "Ctrl->", "Alt-ArrowUp", "Escape"] {
      let binding: Keybinding = spec.parse().unwrap();
      let shown = binding.to_string();
      assert_eq!(shown.parse::<Keybinding>().unwrap(), binding);
    }
  }

  #[test]
  fn same_key_bindings_accumulate() {
    let mut keymap = Keymap::new();
    keymap
      .bind("Enter", CommandCall::bare("newlineInCode"))
      .unwrap();
    keymap
      .bind("Enter", CommandCall::bare("splitBlock"))
      .unwrap();
    let binding: Keybinding = "Enter".parse().unwrap();
    let calls = keymap.lookup(&binding).unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].name, "newlineInCode");
  }
}
