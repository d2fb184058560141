//! Feature extensions for the vellum editor toolkit.
//!
//! Each module contributes one schema type (or a small family, as with
//! lists) together with its commands, keybindings, and input/paste rules.
//! [`preset::starter_extensions`] bundles the usual document set; everything
//! can also be picked individually.

pub mod base;
pub mod blockquote;
pub mod code;
pub mod code_block;
pub mod em;
pub mod hard_break;
pub mod heading;
pub mod horizontal_rule;
pub mod link;
pub mod list;
pub mod paragraph;
pub mod preset;
pub mod strike;
pub mod strong;

pub use base::BaseExtension;
pub use blockquote::BlockquoteExtension;
pub use code::CodeExtension;
pub use code_block::CodeBlockExtension;
pub use em::EmExtension;
pub use hard_break::HardBreakExtension;
pub use heading::HeadingExtension;
pub use horizontal_rule::HorizontalRuleExtension;
pub use link::LinkExtension;
pub use list::ListExtension;
pub use paragraph::ParagraphExtension;
pub use preset::starter_extensions;
pub use strike::StrikeExtension;
pub use strong::StrongExtension;
