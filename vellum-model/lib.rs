//! Document model for the vellum editor toolkit.
//!
//! This crate is the document-side collaborator consumed by `vellum-core`: an
//! immutable node tree constrained by a [`schema::Schema`], a step-recording
//! [`transaction::Transaction`] builder, a pure [`state::State`], and a
//! headless [`view::View`] that owns the state, the plugin pipeline and undo
//! history. `vellum-core` never reaches into document internals; everything
//! flows through transactions.

pub mod history;
pub mod html;
pub mod node;
pub mod plugin;
pub mod schema;
pub mod selection;
pub mod state;
pub mod transaction;
pub mod view;

pub use history::History;
pub use node::{
  Fragment,
  Mark,
  Node,
};
pub use plugin::Plugin;
pub use schema::{
  Attrs,
  MarkSpec,
  NodeSpec,
  Schema,
};
pub use selection::Selection;
pub use state::State;
pub use transaction::Transaction;
pub use view::{
  Effect,
  EventContext,
  Pasted,
  View,
  ViewInfo,
};
