//! The editor facade.
//!
//! [`Editor`] ties the pieces together: it resolves extensions through the
//! [`ExtensionManager`](crate::manager::ExtensionManager), loads initial
//! content, owns the [`View`] behind shared handles, and exposes command
//! execution, events, and content serialization as one surface.
//!
//! The editor is a cheap `Rc` handle. Extensions hold [`WeakEditor`] handles
//! bound at construction time, so dropping the last strong handle tears the
//! editor down even though extension closures are still alive inside it.

use std::{
  cell::{
    Cell,
    RefCell,
  },
  rc::{
    Rc,
    Weak,
  },
};

use once_cell::unsync::OnceCell;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use vellum_model::{
  html::{
    node_html,
    parse_html,
    to_html,
  },
  node::NodeError,
  schema::SchemaError,
  transaction::TransactionError,
  view::{
    Pasted,
    ViewError,
  },
  Node,
  Schema,
  Selection,
  State,
  View,
};

use crate::{
  commands::{
    Chain,
    CommandArgs,
    CommandError,
    CommandManager,
    ResolvedMeta,
  },
  extension::{
    Extension,
    ShortcutGuide,
  },
  manager::{
    ExtensionManager,
    ManagerError,
    QuickInsertItem,
  },
  store::ExtensionStore,
};

pub type Result<T> = std::result::Result<T, EditorError>;

#[derive(Debug, Error)]
pub enum EditorError {
  #[error(transparent)]
  Manager(#[from] ManagerError),
  #[error(transparent)]
  Schema(#[from] SchemaError),
  #[error(transparent)]
  Node(#[from] NodeError),
  #[error(transparent)]
  Transaction(#[from] TransactionError),
  #[error(transparent)]
  Command(#[from] CommandError),
  #[error(transparent)]
  View(#[from] ViewError),
}

/// Initial or replacement document content.
#[derive(Clone, Debug)]
pub enum Content {
  Html(String),
  Markdown(String),
  Json(Value),
}

pub struct EditorOptions {
  pub extensions: Vec<Rc<dyn Extension>>,
  pub content:    Option<Content>,
  pub editable:   bool,
}

impl Default for EditorOptions {
  fn default() -> Self {
    EditorOptions {
      extensions: Vec::new(),
      content:    None,
      editable:   true,
    }
  }
}

impl EditorOptions {
  pub fn new() -> Self {
    EditorOptions::default()
  }

  pub fn extension(mut self, ext: Rc<dyn Extension>) -> Self {
    self.extensions.push(ext);
    self
  }

  pub fn extensions(mut self, extensions: Vec<Rc<dyn Extension>>) -> Self {
    self.extensions.extend(extensions);
    self
  }

  pub fn content(mut self, content: Content) -> Self {
    self.content = Some(content);
    self
  }

  pub fn editable(mut self, editable: bool) -> Self {
    self.editable = editable;
    self
  }
}

/// The manager, commands, and view land after extension slots are bound, so
/// they live in cells filled at the end of construction. Until then only the
/// store is usable from extension hooks.
struct EditorInner {
  manager:   OnceCell<ExtensionManager>,
  commands:  OnceCell<CommandManager>,
  view:      OnceCell<RefCell<View>>,
  store:     ExtensionStore,
  destroyed: Cell<bool>,
}

impl EditorInner {
  fn manager(&self) -> &ExtensionManager {
    self
      .manager
      .get()
      .expect("editor used before construction finished")
  }

  fn commands(&self) -> &CommandManager {
    self
      .commands
      .get()
      .expect("editor used before construction finished")
  }

  fn view(&self) -> &RefCell<View> {
    self
      .view
      .get()
      .expect("editor used before construction finished")
  }
}

#[derive(Clone)]
pub struct Editor {
  inner: Rc<EditorInner>,
}

#[derive(Clone, Debug)]
pub struct WeakEditor(Weak<EditorInner>);

impl std::fmt::Debug for Editor {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Editor")
      .field("destroyed", &self.inner.destroyed.get())
      .finish_non_exhaustive()
  }
}

impl WeakEditor {
  pub fn upgrade(&self) -> Option<Editor> {
    self.0.upgrade().map(|inner| Editor { inner })
  }
}

impl Editor {
  pub fn new(options: EditorOptions) -> Result<Editor> {
    let editor = Editor {
      inner: Rc::new(EditorInner {
        manager:   OnceCell::new(),
        commands:  OnceCell::new(),
        view:      OnceCell::new(),
        store:     ExtensionStore::new(),
        destroyed: Cell::new(false),
      }),
    };

    // Slots bind before any extension hook runs, so `self.editor()` works
    // inside add_commands, add_plugins, and the other resolution hooks.
    let extensions = ExtensionManager::assemble(options.extensions);
    for ext in &extensions {
      ext.set_editor(&editor);
    }

    let mut manager = ExtensionManager::resolve(extensions)?;
    let schema = manager.schema().clone();
    let doc = match &options.content {
      None => schema.empty_doc()?,
      Some(content) => Editor::content_to_doc(&manager, &schema, content)?,
    };
    let plugins = manager.take_plugins();
    let registry = Rc::clone(manager.registry());
    let state = State::new(schema, doc);
    let view = View::new(state, plugins, options.editable);

    let _ = editor.inner.manager.set(manager);
    let _ = editor.inner.commands.set(CommandManager::new(registry));
    let _ = editor.inner.view.set(RefCell::new(view));

    // Everything is resolved and in place; extensions may now see each
    // other through the editor.
    for ext in editor.inner.manager().extensions() {
      ext.before_resolved_all();
    }
    debug!("editor created");
    Ok(editor)
  }

  fn content_to_doc(
    manager: &ExtensionManager,
    schema: &Schema,
    content: &Content,
  ) -> Result<Node> {
    match content {
      Content::Html(html) => Ok(parse_html(schema, html)?),
      Content::Json(value) => Ok(Node::from_json(schema, value)?),
      Content::Markdown(text) => match manager.parse_content(text) {
        Some(doc) => Ok(doc),
        None => Ok(schema.empty_doc()?),
      },
    }
  }

  pub fn downgrade(&self) -> WeakEditor {
    WeakEditor(Rc::downgrade(&self.inner))
  }

  pub fn schema(&self) -> Schema {
    self.inner.view().borrow().state().schema().clone()
  }

  /// Per-editor shared storage for extension state.
  pub fn store(&self) -> &ExtensionStore {
    &self.inner.store
  }

  pub fn extensions(&self) -> &[Rc<dyn Extension>] {
    self.inner.manager().extensions()
  }

  /// Every registered command name, in resolution order.
  pub fn command_names(&self) -> Vec<String> {
    self
      .inner
      .manager()
      .registry()
      .iter()
      .map(|command| command.name().to_string())
      .collect()
  }

  /// A command's display metadata, resolved against the arguments it would
  /// be called with. `None` when the command is unknown or carries no
  /// metadata.
  pub fn command_meta(&self, name: &str, args: &CommandArgs) -> Option<ResolvedMeta> {
    let meta = self.inner.manager().registry().meta(name)?;
    Some(meta.resolve(args))
  }

  /// Shortcut-overview rows collected from the extensions.
  pub fn shortcut_guides(&self) -> Vec<ShortcutGuide> {
    self.inner.manager().shortcut_guides()
  }

  /// Quick-insert menu entries collected from the extensions.
  pub fn quick_insert_items(&self) -> Vec<QuickInsertItem> {
    self.inner.manager().quick_insert_items()
  }

  // Commands

  /// Run one named command; dispatches when it succeeds.
  pub fn command(&self, name: &str, args: &CommandArgs) -> Result<bool> {
    let mut view = self.inner.view().borrow_mut();
    Ok(self.inner.commands().call(&mut view, name, args)?)
  }

  /// Ask whether a command would succeed, without touching the document.
  pub fn dry_command(&self, name: &str, args: &CommandArgs) -> Result<bool> {
    let view = self.inner.view().borrow();
    Ok(self.inner.commands().dry_call(&view, name, args)?)
  }

  /// Build and run a command chain as a single undo step.
  ///
  /// ```ignore
  /// editor.chain(|c| {
  ///   c.command("splitBlock", &CommandArgs::none())
  ///     .command("setBlockType", &args)
  /// })?;
  /// ```
  pub fn chain(&self, build: impl FnOnce(Chain<'_>) -> Chain<'_>) -> Result<bool> {
    let mut view = self.inner.view().borrow_mut();
    let chain = self.inner.commands().chain(&mut view);
    Ok(build(chain).run()?)
  }

  /// Evaluate a chain without dispatching anything.
  pub fn dry_chain(&self, build: impl FnOnce(Chain<'_>) -> Chain<'_>) -> Result<bool> {
    let mut view = self.inner.view().borrow_mut();
    let chain = self.inner.commands().chain(&mut view);
    Ok(build(chain).dry_run()?)
  }

  // Events

  pub fn key_down(&self, key: &str) -> bool {
    if self.inner.destroyed.get() {
      return false;
    }
    self.inner.view().borrow_mut().key_down(key)
  }

  pub fn insert_text(&self, text: &str) -> bool {
    if self.inner.destroyed.get() {
      return false;
    }
    self.inner.view().borrow_mut().insert_text(text)
  }

  pub fn paste(&self, text: &str, html: Option<&str>) -> bool {
    if self.inner.destroyed.get() {
      return false;
    }
    let pasted = Pasted {
      text: text.to_string(),
      html: html.map(str::to_string),
    };
    self.inner.view().borrow_mut().paste(&pasted)
  }

  // History

  pub fn undo(&self) -> bool {
    self.inner.view().borrow_mut().undo()
  }

  pub fn redo(&self) -> bool {
    self.inner.view().borrow_mut().redo()
  }

  pub fn can_undo(&self) -> bool {
    self.inner.view().borrow().can_undo()
  }

  pub fn can_redo(&self) -> bool {
    self.inner.view().borrow().can_redo()
  }

  // State and content

  pub fn doc(&self) -> Node {
    self.inner.view().borrow().state().doc().clone()
  }

  pub fn selection(&self) -> Selection {
    self.inner.view().borrow().state().selection()
  }

  pub fn select(&self, anchor: usize, head: usize) -> Result<bool> {
    self.command(
      "setTextSelection",
      &CommandArgs::from_value(serde_json::json!({
        "anchor": anchor,
        "head": head,
      })),
    )
  }

  pub fn text(&self) -> String {
    self.inner.view().borrow().state().doc().text_content()
  }

  pub fn content_json(&self) -> Value {
    self.inner.view().borrow().state().doc().to_json()
  }

  /// Serialize the document to HTML, routing top-level blocks through any
  /// registered node views.
  pub fn content_html(&self) -> String {
    let view = self.inner.view().borrow();
    let state = view.state();
    let overrides = self.inner.manager().node_views();
    if overrides.is_empty() {
      return to_html(state.schema(), state.doc());
    }
    let mut out = String::new();
    for child in state.doc().content().iter() {
      match overrides.get(child.type_name()) {
        Some(render) => out.push_str(&render(child)),
        None => out.push_str(&node_html(state.schema(), child)),
      }
    }
    out
  }

  /// Replace the whole document, as one history step.
  pub fn replace_content(&self, content: Content) -> Result<()> {
    let schema = self.schema();
    let doc = Editor::content_to_doc(self.inner.manager(), &schema, &content)?;
    let mut view = self.inner.view().borrow_mut();
    let mut tr = view.state().tr();
    tr.replace_document(doc)?;
    view.dispatch(&tr)?;
    Ok(())
  }

  // View state

  pub fn editable(&self) -> bool {
    self.inner.view().borrow().editable()
  }

  pub fn set_editable(&self, editable: bool) {
    self.inner.view().borrow_mut().set_editable(editable);
  }

  pub fn focused(&self) -> bool {
    self.inner.view().borrow().focused()
  }

  pub fn focus(&self) {
    self.inner.view().borrow_mut().focus();
  }

  pub fn blur(&self) {
    self.inner.view().borrow_mut().blur();
  }

  /// Attributes contributed to the editor's outer element by plugins.
  pub fn attributes(&self) -> Vec<(String, String)> {
    self.inner.view().borrow().attributes()
  }

  /// The named plugin's local state, if it keeps any.
  pub fn plugin_state(&self, name: &str) -> Option<Value> {
    self.inner.view().borrow().plugin_state(name).cloned()
  }

  // Lifecycle

  pub fn is_destroyed(&self) -> bool {
    self.inner.destroyed.get()
  }

  /// Tear the editor down: extensions get their `on_destroy` hook in
  /// reverse registration order, and further events are ignored.
  pub fn destroy(&self) {
    if self.inner.destroyed.replace(true) {
      return;
    }
    self.inner.manager().destroy();
    self.inner.view().borrow_mut().blur();
    self.inner.store.clear();
    debug!("editor destroyed");
  }
}
