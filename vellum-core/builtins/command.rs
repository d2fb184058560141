//! The core command set.
//!
//! Registers the document-editing primitives under their stable names, all
//! implemented in [`crate::basic`]. Feature extensions register sugar over
//! these (`toggleBold` delegating to `toggleMark`), and can shadow any of
//! them since later registrations win.

use crate::{
  basic,
  commands::CommandRegistry,
  extension::{
    EditorSlot,
    Extension,
  },
};

#[derive(Debug, Default)]
pub struct CommandExtension {
  slot: EditorSlot,
}

impl CommandExtension {
  pub fn new() -> Self {
    CommandExtension::default()
  }
}

impl Extension for CommandExtension {
  fn name(&self) -> &'static str {
    "commands"
  }

  fn slot(&self) -> &EditorSlot {
    &self.slot
  }

  fn add_commands(&self, registry: &mut CommandRegistry) {
    registry.register(
      "toggleMark",
      "toggle the `mark` across the selection",
      |ctx, args| {
        let Some(mark) = args.str("mark") else {
          return false;
        };
        basic::toggle_mark(ctx, mark, args.attrs("attrs"))
      },
    );
    registry.register(
      "setBlockType",
      "retype the selected textblocks to `type` with `attrs`",
      |ctx, args| {
        let Some(type_name) = args.str("type") else {
          return false;
        };
        basic::set_block_type(ctx, type_name, args.attrs("attrs"))
      },
    );
    registry.register(
      "wrapIn",
      "wrap the selected blocks in a `type` node",
      |ctx, args| {
        let Some(type_name) = args.str("type") else {
          return false;
        };
        basic::wrap_in(ctx, type_name, args.attrs("attrs"))
      },
    );
    registry.register("lift", "lift the selected blocks out of their wrapper", |ctx, _| {
      basic::lift_block(ctx)
    });
    registry.register("splitBlock", "split the current textblock", |ctx, _| {
      basic::split_block(ctx)
    });
    registry.register(
      "newlineInCode",
      "insert a literal newline inside a code block",
      |ctx, _| basic::newline_in_code(ctx),
    );
    registry.register(
      "createParagraphNear",
      "open a paragraph at a between-blocks cursor",
      |ctx, _| basic::create_paragraph_near(ctx),
    );
    registry.register(
      "liftEmptyBlock",
      "lift an empty wrapped textblock",
      |ctx, _| basic::lift_empty_block(ctx),
    );
    registry.register(
      "selectParentNode",
      "expand the selection to the parent node",
      |ctx, _| basic::select_parent(ctx),
    );
    registry.register("deleteSelection", "delete the selected content", |ctx, _| {
      basic::delete_selection(ctx)
    });
    registry.register(
      "insertNode",
      "insert a `type` node at the selection",
      |ctx, args| {
        let Some(type_name) = args.str("type") else {
          return false;
        };
        basic::insert_node(ctx, type_name, args.attrs("attrs"))
      },
    );
    registry.register(
      "setTextSelection",
      "move the selection to `anchor`/`head`",
      |ctx, args| {
        let Some(anchor) = args.u64("anchor") else {
          return false;
        };
        let head = args.u64("head").unwrap_or(anchor);
        basic::set_text_selection(ctx, anchor as usize, head as usize)
      },
    );
    registry.register("undo", "revert the latest history entry", |ctx, _| {
      basic::undo(ctx)
    });
    registry.register("redo", "reapply the latest undone entry", |ctx, _| {
      basic::redo(ctx)
    });
    registry.register("focus", "focus the editor", |ctx, _| basic::focus(ctx));
  }
}
