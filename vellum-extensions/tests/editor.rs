//! End-to-end tests over a fully configured editor.

use std::rc::Rc;

use serde_json::json;
use vellum_core::{
  commands::CommandRegistry,
  editor::EditorError,
  extension::{
    CommandCall,
    EditorSlot,
    Extension,
  },
  manager::ManagerError,
  CommandArgs,
  Content,
  Editor,
  EditorOptions,
};
use vellum_extensions::{
  starter_extensions,
  HeadingExtension,
};
use vellum_model::Plugin;

fn editor_with(content: &str) -> Editor {
  Editor::new(
    EditorOptions::new()
      .content(Content::Html(content.to_string()))
      .extensions(starter_extensions()),
  )
  .unwrap()
}

fn empty_editor() -> Editor {
  let mut options = EditorOptions::new();
  options.extensions = starter_extensions();
  Editor::new(options).unwrap()
}

fn type_str(editor: &Editor, text: &str) {
  for c in text.chars() {
    assert!(editor.insert_text(&c.to_string()));
  }
}

#[test]
fn empty_editor_holds_one_paragraph() {
  let editor = empty_editor();
  assert_eq!(editor.content_html(), "<p></p>");
  assert_eq!(editor.text(), "");
}

#[test]
fn missing_dependency_fails_construction() {
  let result = Editor::new(
    EditorOptions::new().extension(Rc::new(HeadingExtension::new())),
  );
  assert!(matches!(
    result,
    Err(EditorError::Manager(ManagerError::MissingDependency { .. }))
  ));
}

#[test]
fn toggle_bold_over_selection() {
  let editor = editor_with("<p>hello</p>");
  assert!(editor.select(1, 6).unwrap());
  assert!(editor.command("toggleBold", &CommandArgs::none()).unwrap());
  assert_eq!(editor.content_html(), "<p><strong>hello</strong></p>");

  // Toggling again removes the mark.
  assert!(editor.command("toggleBold", &CommandArgs::none()).unwrap());
  assert_eq!(editor.content_html(), "<p>hello</p>");
}

#[test]
fn toggle_bold_needs_a_selection() {
  let editor = editor_with("<p>hello</p>");
  assert!(editor.select(3, 3).unwrap());
  assert!(!editor.command("toggleBold", &CommandArgs::none()).unwrap());
  assert_eq!(editor.content_html(), "<p>hello</p>");
}

#[test]
fn unknown_command_is_an_error() {
  let editor = empty_editor();
  assert!(editor.command("sparkle", &CommandArgs::none()).is_err());
}

#[test]
fn dry_command_leaves_the_document_alone() {
  let editor = editor_with("<p>hello</p>");
  assert!(editor.select(1, 6).unwrap());
  assert!(editor.dry_command("toggleBold", &CommandArgs::none()).unwrap());
  assert_eq!(editor.content_html(), "<p>hello</p>");
}

#[test]
fn chain_is_one_undo_step() {
  let editor = editor_with("<p>hello</p>");
  let ok = editor
    .chain(|c| {
      c.command(
        "setTextSelection",
        &CommandArgs::from_value(json!({ "anchor": 1, "head": 6 })),
      )
      .command("toggleBold", &CommandArgs::none())
      .command(
        "setHeading",
        &CommandArgs::from_value(json!({ "level": 2 })),
      )
    })
    .unwrap();
  assert!(ok);
  assert_eq!(editor.content_html(), "<h2><strong>hello</strong></h2>");

  assert!(editor.undo());
  assert_eq!(editor.content_html(), "<p>hello</p>");
  assert!(!editor.can_undo());
}

#[test]
fn chain_reports_partial_failure_without_short_circuiting() {
  let editor = editor_with("<p>hello</p>");
  let ok = editor
    .chain(|c| {
      c.command("liftEmptyBlock", &CommandArgs::none())
        .command(
          "setHeading",
          &CommandArgs::from_value(json!({ "level": 1 })),
        )
    })
    .unwrap();
  // liftEmptyBlock failed, setHeading still ran.
  assert!(!ok);
  assert_eq!(editor.content_html(), "<h1>hello</h1>");
}

#[test]
fn dry_chain_dispatches_nothing() {
  let editor = editor_with("<p>hello</p>");
  let ok = editor
    .dry_chain(|c| {
      c.command(
        "setHeading",
        &CommandArgs::from_value(json!({ "level": 3 })),
      )
    })
    .unwrap();
  assert!(ok);
  assert_eq!(editor.content_html(), "<p>hello</p>");
  assert!(!editor.can_undo());
}

#[test]
fn keybinding_runs_command() {
  let editor = editor_with("<p>hello</p>");
  assert!(editor.select(1, 6).unwrap());
  assert!(editor.key_down("Mod-b"));
  assert_eq!(editor.content_html(), "<p><strong>hello</strong></p>");
  assert!(!editor.key_down("Mod-Q"));
}

#[test]
fn keybinding_with_args_toggles_heading() {
  let editor = editor_with("<p>hello</p>");
  assert!(editor.key_down("Mod-Shift-2"));
  assert_eq!(editor.content_html(), "<h2>hello</h2>");
  assert!(editor.key_down("Mod-Shift-2"));
  assert_eq!(editor.content_html(), "<p>hello</p>");
}

#[test]
fn enter_splits_paragraph() {
  let editor = editor_with("<p>hello</p>");
  assert!(editor.select(3, 3).unwrap());
  assert!(editor.key_down("Enter"));
  assert_eq!(editor.content_html(), "<p>he</p><p>llo</p>");
  // Cursor moved into the new block.
  assert_eq!(editor.selection().head, 5);
}

#[test]
fn enter_in_code_block_inserts_newline() {
  let editor = editor_with("<pre>code</pre>");
  assert!(editor.select(5, 5).unwrap());
  assert!(editor.key_down("Enter"));
  assert_eq!(editor.doc().child_count(), 1);
  assert_eq!(editor.text(), "code\n");
}

#[test]
fn enter_splits_list_item() {
  let editor = editor_with("<ul><li><p>one</p></li></ul>");
  // doc > ul > li > p: "one" occupies positions 3..6.
  assert!(editor.select(6, 6).unwrap());
  assert!(editor.key_down("Enter"));
  let list = editor.doc().child(0).cloned().unwrap();
  assert_eq!(list.type_name(), "bullet_list");
  assert_eq!(list.child_count(), 2);
  assert_eq!(list.child(0).unwrap().text_content(), "one");
  assert_eq!(list.child(1).unwrap().text_content(), "");
}

#[test]
fn shift_enter_inserts_hard_break() {
  let editor = editor_with("<p>ab</p>");
  assert!(editor.select(2, 2).unwrap());
  assert!(editor.key_down("Shift-Enter"));
  assert_eq!(editor.content_html(), "<p>a<br>b</p>");
}

#[test]
fn heading_input_rule_fires_on_space() {
  let editor = empty_editor();
  type_str(&editor, "## ");
  assert_eq!(editor.content_html(), "<h2></h2>");
  type_str(&editor, "title");
  assert_eq!(editor.content_html(), "<h2>title</h2>");
}

#[test]
fn strong_input_rule_marks_typed_text() {
  let editor = empty_editor();
  type_str(&editor, "say **loud**");
  assert_eq!(editor.content_html(), "<p>say <strong>loud</strong></p>");
}

#[test]
fn blockquote_input_rule_wraps() {
  let editor = empty_editor();
  type_str(&editor, "> ");
  type_str(&editor, "quoted");
  assert_eq!(editor.content_html(), "<blockquote><p>quoted</p></blockquote>");
}

#[test]
fn bullet_list_input_rule_wraps_twice() {
  let editor = empty_editor();
  type_str(&editor, "- ");
  type_str(&editor, "first");
  assert_eq!(
    editor.content_html(),
    "<ul><li><p>first</p></li></ul>"
  );
}

#[test]
fn toggle_bullet_list_round_trips() {
  let editor = editor_with("<p>item</p>");
  assert!(editor.select(1, 5).unwrap());
  assert!(editor
    .command("toggleBulletList", &CommandArgs::none())
    .unwrap());
  assert_eq!(editor.content_html(), "<ul><li><p>item</p></li></ul>");
  assert!(editor
    .command("toggleBulletList", &CommandArgs::none())
    .unwrap());
  assert_eq!(editor.content_html(), "<p>item</p>");
}

#[test]
fn horizontal_rule_inserts_after_block() {
  let editor = editor_with("<p>above</p>");
  assert!(editor.select(6, 6).unwrap());
  assert!(editor
    .command("setHorizontalRule", &CommandArgs::none())
    .unwrap());
  assert_eq!(editor.content_html(), "<p>above</p><hr>");
}

#[test]
fn set_link_carries_href() {
  let editor = editor_with("<p>here</p>");
  assert!(editor.select(1, 5).unwrap());
  assert!(editor
    .command(
      "setLink",
      &CommandArgs::from_value(json!({ "href": "https://example.com" })),
    )
    .unwrap());
  assert_eq!(
    editor.content_html(),
    "<p><a href=\"https://example.com\">here</a></p>"
  );
  assert!(editor.command("unsetLink", &CommandArgs::none()).unwrap());
  assert_eq!(editor.content_html(), "<p>here</p>");
}

#[test]
fn link_href_survives_html_content() {
  let editor = editor_with("<p><a href=\"https://example.com\">t</a></p>");
  assert_eq!(
    editor.content_html(),
    "<p><a href=\"https://example.com\">t</a></p>"
  );
}

#[test]
fn markdown_paste_inserts_blocks() {
  let editor = editor_with("<p>intro</p>");
  assert!(editor.select(6, 6).unwrap());
  assert!(editor.paste("# Title\n\nbody text", None));
  let doc = editor.doc();
  assert_eq!(doc.child_count(), 3);
  assert_eq!(doc.child(0).unwrap().text_content(), "intro");
  assert_eq!(doc.child(1).unwrap().type_name(), "heading");
  assert_eq!(doc.child(1).unwrap().text_content(), "Title");
  assert_eq!(doc.child(2).unwrap().text_content(), "body text");
}

#[test]
fn single_line_markdown_paste_merges_inline() {
  let editor = editor_with("<p>ab</p>");
  assert!(editor.select(2, 2).unwrap());
  assert!(editor.paste("**x**", None));
  assert_eq!(editor.content_html(), "<p>a<strong>x</strong>b</p>");
}

#[test]
fn html_paste_wins_over_text() {
  let editor = editor_with("<p>ab</p>");
  assert!(editor.select(1, 1).unwrap());
  assert!(editor.paste("plain fallback", Some("<em>hi</em>")));
  assert_eq!(editor.content_html(), "<p><em>hi</em>ab</p>");
}

#[test]
fn typing_and_undo_redo() {
  let editor = empty_editor();
  type_str(&editor, "ab");
  assert_eq!(editor.text(), "ab");
  assert!(editor.undo());
  assert_eq!(editor.text(), "a");
  assert!(editor.redo());
  assert_eq!(editor.text(), "ab");
}

#[test]
fn undo_keybinding_respects_empty_history() {
  let editor = empty_editor();
  assert!(!editor.key_down("Mod-z"));
  type_str(&editor, "x");
  assert!(editor.key_down("Mod-z"));
  assert_eq!(editor.text(), "");
  assert!(editor.key_down("Shift-Mod-z"));
  assert_eq!(editor.text(), "x");
}

#[test]
fn selection_changes_are_not_history_entries() {
  let editor = editor_with("<p>hello</p>");
  assert!(editor.select(1, 3).unwrap());
  assert!(editor.select(2, 5).unwrap());
  assert!(!editor.can_undo());
}

#[test]
fn escape_selects_parent() {
  let editor = editor_with("<p>hello</p>");
  assert!(editor.select(3, 3).unwrap());
  assert!(editor.key_down("Escape"));
  let sel = editor.selection();
  assert_eq!((sel.from(), sel.to()), (0, 7));
}

#[test]
fn json_round_trip() {
  let editor = editor_with("<p><strong>hi</strong> there</p>");
  let json = editor.content_json();
  let copy = Editor::new(
    EditorOptions::new()
      .content(Content::Json(json))
      .extensions(starter_extensions()),
  )
  .unwrap();
  assert_eq!(copy.content_html(), editor.content_html());
}

#[test]
fn markdown_initial_content() {
  let editor = Editor::new(
    EditorOptions::new()
      .content(Content::Markdown("## Notes\n\n- a\n- b".to_string()))
      .extensions(starter_extensions()),
  )
  .unwrap();
  assert_eq!(
    editor.content_html(),
    "<h2>Notes</h2><ul><li><p>a</p></li><li><p>b</p></li></ul>"
  );
}

#[test]
fn non_editable_editor_ignores_events() {
  let editor = editor_with("<p>hello</p>");
  editor.set_editable(false);
  assert!(!editor.insert_text("x"));
  assert!(!editor.key_down("Enter"));
  assert_eq!(editor.text(), "hello");
  editor.set_editable(true);
  assert!(editor.insert_text("!"));
}

#[test]
fn destroyed_editor_ignores_events() {
  let editor = editor_with("<p>hello</p>");
  editor.destroy();
  assert!(editor.is_destroyed());
  assert!(!editor.insert_text("x"));
  assert!(!editor.key_down("Mod-b"));
  assert_eq!(editor.text(), "hello");
}

#[test]
fn focus_command_sets_focus() {
  let editor = empty_editor();
  assert!(!editor.focused());
  assert!(editor.command("focus", &CommandArgs::none()).unwrap());
  assert!(editor.focused());
}

#[test]
fn replace_content_is_undoable() {
  let editor = editor_with("<p>old</p>");
  editor
    .replace_content(Content::Html("<h1>new</h1>".to_string()))
    .unwrap();
  assert_eq!(editor.content_html(), "<h1>new</h1>");
  assert!(editor.undo());
  assert_eq!(editor.content_html(), "<p>old</p>");
}

#[test]
fn wrapper_plugin_styles_the_outer_element() {
  let editor = empty_editor();
  let attrs = editor.attributes();
  assert!(attrs.contains(&("class".to_string(), "vellum-editor".to_string())));
}

#[test]
fn command_meta_resolves_against_args() {
  let editor = empty_editor();
  let args = CommandArgs::from_value(json!({ "level": 3 }));
  let meta = editor.command_meta("setHeading", &args).unwrap();
  assert_eq!(meta.label.as_deref(), Some("Heading 3"));
  assert_eq!(meta.markdown.as_deref(), Some("###"));
  assert_eq!(meta.shortcut.as_deref(), Some("Mod-Shift-3"));

  let meta = editor.command_meta("toggleBold", &CommandArgs::none()).unwrap();
  assert_eq!(meta.icon.as_deref(), Some("bold"));
  // Commands registered without metadata yield nothing.
  assert!(editor.command_meta("splitBlock", &CommandArgs::none()).is_none());
  assert!(editor.command_meta("noSuchCommand", &CommandArgs::none()).is_none());
}

#[test]
fn quick_insert_items_follow_configured_levels() {
  let mut extensions = starter_extensions();
  extensions.retain(|ext| ext.name() != "heading");
  extensions.push(Rc::new(HeadingExtension::with_levels(vec![1, 2])));
  let editor = Editor::new(EditorOptions::new().extensions(extensions)).unwrap();

  let items = editor.quick_insert_items();
  let headings: Vec<_> = items
    .iter()
    .filter(|item| item.call.name == "setHeading")
    .collect();
  assert_eq!(headings.len(), 2);
  assert_eq!(headings[0].meta.label.as_deref(), Some("Heading 1"));
  assert_eq!(headings[1].meta.label.as_deref(), Some("Heading 2"));
  assert!(items.iter().any(|item| {
    item.call.name == "setHorizontalRule" && item.meta.icon.as_deref() == Some("separator")
  }));

  // A quick-insert entry is dispatchable as-is.
  assert!(editor
    .command(&headings[1].call.name.clone(), &headings[1].call.args.clone())
    .unwrap());
  assert_eq!(editor.content_html(), "<h2></h2>");
}

#[test]
fn shortcut_guides_collect_across_extensions() {
  let editor = empty_editor();
  let guides = editor.shortcut_guides();
  assert!(guides
    .iter()
    .any(|g| g.label == "Bold" && g.shortcut.as_deref() == Some("Mod-b")));
  // One row per heading level.
  assert_eq!(guides.iter().filter(|g| g.icon.starts_with("h-")).count(), 6);
}

/// Caches the merged guide count during setup, the way an overview panel
/// extension would.
#[derive(Debug, Default)]
struct OverviewExtension {
  slot: EditorSlot,
}

impl Extension for OverviewExtension {
  fn name(&self) -> &'static str {
    "overview"
  }

  fn slot(&self) -> &EditorSlot {
    &self.slot
  }

  fn before_resolved_all(&self) {
    let editor = self.editor();
    let count = editor.shortcut_guides().len();
    editor.store().set("overview.guides", json!(count));
  }
}

/// Reads its editor handle during command registration, which runs before
/// the view or the command manager exist.
#[derive(Debug, Default)]
struct EagerExtension {
  slot: EditorSlot,
}

impl Extension for EagerExtension {
  fn name(&self) -> &'static str {
    "eager"
  }

  fn slot(&self) -> &EditorSlot {
    &self.slot
  }

  fn add_commands(&self, registry: &mut CommandRegistry) {
    let _ = registry;
    let editor = self.editor();
    editor.store().set("eager.saw_editor", json!(true));
  }
}

/// Binds `Mod-m` to a marker-inserting command, optionally gated on the
/// document starting with a trigger string.
#[derive(Debug)]
struct KeyedStamp {
  name:    &'static str,
  command: &'static str,
  trigger: Option<&'static str>,
  text:    &'static str,
  slot:    EditorSlot,
}

impl Extension for KeyedStamp {
  fn name(&self) -> &'static str {
    self.name
  }

  fn slot(&self) -> &EditorSlot {
    &self.slot
  }

  fn add_commands(&self, registry: &mut CommandRegistry) {
    let trigger = self.trigger;
    let text = self.text;
    registry.register(self.command, "Insert a marker", move |ctx, _args| {
      if let Some(trigger) = trigger {
        if !ctx.tr.doc().text_content().starts_with(trigger) {
          return false;
        }
      }
      ctx.tr.insert_text(1, text, Vec::new()).is_ok()
    });
  }

  fn add_keybindings(&self) -> Vec<(String, CommandCall)> {
    vec![("Mod-m".to_string(), CommandCall::bare(self.command))]
  }
}

#[test]
fn shared_keybinding_falls_through_to_later_extension() {
  let stamps = || {
    let mut extensions = starter_extensions();
    extensions.push(Rc::new(KeyedStamp {
      name:    "stamp-go",
      command: "stampGo",
      trigger: Some("go"),
      text:    "G",
      slot:    EditorSlot::default(),
    }) as Rc<dyn Extension>);
    extensions.push(Rc::new(KeyedStamp {
      name:    "stamp-any",
      command: "stampAny",
      trigger: None,
      text:    "A",
      slot:    EditorSlot::default(),
    }));
    extensions
  };

  // The first binding's command declines, so the chain falls through.
  let editor = Editor::new(EditorOptions::new().extensions(stamps())).unwrap();
  assert!(editor.key_down("Mod-m"));
  assert_eq!(editor.text(), "A");

  // When it applies, the first binding wins and the chain stops.
  let editor = Editor::new(
    EditorOptions::new()
      .content(Content::Html("<p>go</p>".to_string()))
      .extensions(stamps()),
  )
  .unwrap();
  assert!(editor.key_down("Mod-m"));
  assert_eq!(editor.text(), "Ggo");
}

#[test]
fn dry_commands_leave_the_editor_untouched() {
  let editor = editor_with("<p>hello</p>");
  assert!(editor.select(1, 4).unwrap());
  let doc = editor.content_json();
  let selection = editor.selection();
  let can_undo = editor.can_undo();
  for name in editor.command_names() {
    let _ = editor.dry_command(&name, &CommandArgs::none());
    assert_eq!(editor.content_json(), doc, "`{name}` changed the document");
    assert_eq!(editor.selection(), selection, "`{name}` moved the selection");
    assert_eq!(editor.can_undo(), can_undo, "`{name}` touched the history");
  }
}

/// Counts document-changing transactions through plugin-local state.
#[derive(Debug, Default)]
struct ChangeCountExtension {
  slot: EditorSlot,
}

impl Extension for ChangeCountExtension {
  fn name(&self) -> &'static str {
    "change-count"
  }

  fn slot(&self) -> &EditorSlot {
    &self.slot
  }

  fn add_plugins(&self) -> Vec<Plugin> {
    vec![Plugin::new("change-count").with_state(
      || json!(0),
      |tr, value, _state| {
        if tr.doc_changed() {
          json!(value.as_u64().unwrap_or(0) + 1)
        } else {
          value
        }
      },
    )]
  }
}

#[test]
fn extension_plugin_state_tracks_edits() {
  let mut extensions = starter_extensions();
  extensions.push(Rc::new(ChangeCountExtension::default()));
  let editor = Editor::new(EditorOptions::new().extensions(extensions)).unwrap();
  assert_eq!(editor.plugin_state("change-count"), Some(json!(0)));
  type_str(&editor, "hi");
  assert_eq!(editor.plugin_state("change-count"), Some(json!(2)));
  // Selection moves leave the count alone.
  assert!(editor.select(1, 1).unwrap());
  assert_eq!(editor.plugin_state("change-count"), Some(json!(2)));
  assert_eq!(editor.plugin_state("no-such-plugin"), None);
}

#[test]
fn extensions_reach_the_editor_during_setup() {
  let mut extensions = starter_extensions();
  extensions.push(Rc::new(EagerExtension::default()));
  let editor = Editor::new(EditorOptions::new().extensions(extensions)).unwrap();
  assert_eq!(editor.store().get("eager.saw_editor"), Some(json!(true)));
  assert!(editor.insert_text("x"));
  assert_eq!(editor.text(), "x");
}

#[test]
fn before_resolved_all_sees_every_extension() {
  let mut extensions = starter_extensions();
  extensions.push(Rc::new(OverviewExtension::default()));
  let editor = Editor::new(EditorOptions::new().extensions(extensions)).unwrap();
  let expected = editor.shortcut_guides().len() as u64;
  assert!(expected > 0);
  assert_eq!(editor.store().get("overview.guides"), Some(json!(expected)));
}
