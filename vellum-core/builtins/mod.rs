//! Extensions every editor carries.
//!
//! The manager prepends these before the user's extensions, so every editor
//! has a document type, a text type, the core command set, and paste
//! handling. User extensions may still override any of it: later
//! registrations win.

pub mod command;
pub mod doc;
pub mod paste;
pub mod text;

pub use command::CommandExtension;
pub use doc::DocExtension;
pub use paste::PasteExtension;
pub use text::TextExtension;
