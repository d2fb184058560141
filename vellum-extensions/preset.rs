use std::rc::Rc;

use vellum_core::extension::Extension;

use crate::{
  base::BaseExtension,
  blockquote::BlockquoteExtension,
  code::CodeExtension,
  code_block::CodeBlockExtension,
  em::EmExtension,
  hard_break::HardBreakExtension,
  heading::HeadingExtension,
  horizontal_rule::HorizontalRuleExtension,
  link::LinkExtension,
  list::ListExtension,
  paragraph::ParagraphExtension,
  strike::StrikeExtension,
  strong::StrongExtension,
};

/// The usual document editing set: every extension in this crate.
pub fn starter_extensions() -> Vec<Rc<dyn Extension>> {
  vec![
    Rc::new(BaseExtension::new()),
    Rc::new(ParagraphExtension::new()),
    Rc::new(HeadingExtension::new()),
    Rc::new(BlockquoteExtension::new()),
    Rc::new(CodeBlockExtension::new()),
    Rc::new(HorizontalRuleExtension::new()),
    Rc::new(HardBreakExtension::new()),
    Rc::new(ListExtension::new()),
    Rc::new(StrongExtension::new()),
    Rc::new(EmExtension::new()),
    Rc::new(CodeExtension::new()),
    Rc::new(StrikeExtension::new()),
    Rc::new(LinkExtension::new()),
  ]
}
