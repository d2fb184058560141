//! Extension resolution.
//!
//! The manager takes the extension list an editor was configured with and
//! turns it into everything the runtime needs: a merged schema, the command
//! registry, the keybinding table, the input and paste rules, the plugin
//! stack, and the node view overrides. Built-in extensions (`doc`, `text`,
//! `commands`, `paste`) are prepended unless the caller supplies an
//! extension with the same name.
//!
//! Resolution order matters everywhere: schema entries and commands are
//! last-wins, keybinding chains and plugins accumulate in order. Schema
//! types are sorted into a canonical order before the schema is built, so
//! serialization output does not depend on extension registration order.

use std::{
  collections::HashSet,
  rc::Rc,
};

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use vellum_model::{
  html::parse_html,
  schema::SchemaError,
  MarkSpec,
  Node,
  NodeSpec,
  Plugin,
  Schema,
};

use crate::{
  builtins::{
    paste::insert_parsed,
    CommandExtension,
    DocExtension,
    PasteExtension,
    TextExtension,
  },
  commands::{
    CommandRegistry,
    ResolvedMeta,
  },
  extension::{
    CommandCall,
    Extension,
    NodeViewFn,
    QuickInsertSource,
    ShortcutGuide,
    ShortcutGuideSource,
  },
  input_rules::input_rules_plugin,
  keymap::{
    Keybinding,
    Keymap,
    KeymapError,
  },
  paste_rules::{
    apply_paste_rules,
    PasteRule,
  },
  sort,
};

pub type Result<T> = std::result::Result<T, ManagerError>;

#[derive(Debug, Error)]
pub enum ManagerError {
  #[error("extension `{extension}` requires `{requires}`, which is not registered")]
  MissingDependency { extension: String, requires: String },
  #[error(transparent)]
  Keymap(#[from] KeymapError),
  #[error(transparent)]
  Schema(#[from] SchemaError),
}

/// A resolved quick-insert entry: the call to dispatch and the metadata to
/// show for it.
#[derive(Debug)]
pub struct QuickInsertItem {
  pub call: CommandCall,
  pub meta: ResolvedMeta,
}

pub struct ExtensionManager {
  extensions: Vec<Rc<dyn Extension>>,
  schema:     Schema,
  registry:   Rc<CommandRegistry>,
  plugins:    Option<Vec<Plugin>>,
  node_views: IndexMap<String, NodeViewFn>,
}

impl ExtensionManager {
  /// Prepend the built-in extensions to a configured list. Only `name()` is
  /// consulted here, so it is safe to call before editor slots are bound.
  pub fn assemble(configured: Vec<Rc<dyn Extension>>) -> Vec<Rc<dyn Extension>> {
    let mut extensions: Vec<Rc<dyn Extension>> = Vec::new();
    let builtins: [Rc<dyn Extension>; 4] = [
      Rc::new(DocExtension::new()),
      Rc::new(TextExtension::new()),
      Rc::new(CommandExtension::new()),
      Rc::new(PasteExtension::new()),
    ];
    for builtin in builtins {
      if !configured.iter().any(|ext| ext.name() == builtin.name()) {
        extensions.push(builtin);
      }
    }
    extensions.extend(configured);
    extensions
  }

  /// Resolve an extension list into a full editor configuration.
  pub fn process(configured: Vec<Rc<dyn Extension>>) -> Result<Self> {
    ExtensionManager::resolve(ExtensionManager::assemble(configured))
  }

  /// Resolve an assembled list. Every extension hook runs here, so callers
  /// that hand out editor access must bind slots first.
  pub fn resolve(extensions: Vec<Rc<dyn Extension>>) -> Result<Self> {
    let names: HashSet<&str> = extensions.iter().map(|ext| ext.name()).collect();
    for ext in &extensions {
      for dep in ext.requires() {
        if !names.contains(dep) {
          return Err(ManagerError::MissingDependency {
            extension: ext.name().to_string(),
            requires:  dep.to_string(),
          });
        }
      }
    }

    // Schema fragments merge last-wins by name, then sort canonically.
    let mut node_specs: IndexMap<String, NodeSpec> = IndexMap::new();
    let mut mark_specs: IndexMap<String, MarkSpec> = IndexMap::new();
    for ext in &extensions {
      for (name, spec) in ext.nodes() {
        node_specs.insert(name, spec);
      }
      for (name, spec) in ext.marks() {
        mark_specs.insert(name, spec);
      }
    }
    let mut nodes: Vec<(String, NodeSpec)> = node_specs.into_iter().collect();
    let mut marks: Vec<(String, MarkSpec)> = mark_specs.into_iter().collect();
    sort::sort_nodes(&mut nodes);
    sort::sort_marks(&mut marks);
    let schema = Schema::new(nodes, marks);
    schema.top_node()?;

    let mut registry = CommandRegistry::new();
    for ext in &extensions {
      ext.add_commands(&mut registry);
    }
    let registry = Rc::new(registry);

    let mut keymap = Keymap::new();
    for ext in &extensions {
      for (binding, call) in ext.add_keybindings() {
        keymap.bind(&binding, call)?;
      }
    }

    let mut input_rules = Vec::new();
    let mut paste_rules = Vec::new();
    for ext in &extensions {
      input_rules.extend(ext.add_input_rules(&schema));
      paste_rules.extend(ext.add_paste_rules(&schema));
    }

    let mut plugins = Vec::new();
    for ext in &extensions {
      plugins.extend(ext.add_plugins());
    }
    plugins.push(input_rules_plugin(input_rules));
    plugins.push(keymap_plugin(keymap, Rc::clone(&registry)));
    plugins.push(keymap_plugin(base_keymap()?, Rc::clone(&registry)));
    plugins.push(paste_plugin(
      schema.clone(),
      paste_rules,
      extensions.clone(),
    ));
    // Styling hook for hosts that render the editor's outer element.
    plugins.push(Plugin::new("wrapper").with_attribute("class", "vellum-editor"));

    let mut node_views = IndexMap::new();
    for ext in &extensions {
      for (name, view) in ext.node_views() {
        node_views.insert(name, view);
      }
    }

    debug!(
      extensions = extensions.len(),
      nodes = schema.node_names().count(),
      marks = schema.mark_names().count(),
      commands = registry.len(),
      "extension manager resolved"
    );

    Ok(ExtensionManager {
      extensions,
      schema,
      registry,
      plugins: Some(plugins),
      node_views,
    })
  }

  pub fn schema(&self) -> &Schema {
    &self.schema
  }

  pub fn registry(&self) -> &Rc<CommandRegistry> {
    &self.registry
  }

  pub fn extensions(&self) -> &[Rc<dyn Extension>] {
    &self.extensions
  }

  pub fn node_views(&self) -> &IndexMap<String, NodeViewFn> {
    &self.node_views
  }

  /// The resolved plugin stack, handed out once to the view.
  pub(crate) fn take_plugins(&mut self) -> Vec<Plugin> {
    self.plugins.take().unwrap_or_default()
  }

  /// Shortcut-overview rows from every extension that contributes them.
  pub fn shortcut_guides(&self) -> Vec<ShortcutGuide> {
    self
      .extensions
      .iter()
      .filter_map(|ext| ext.shortcut_guide())
      .flat_map(ShortcutGuideSource::shortcut_guides)
      .collect()
  }

  /// Quick-insert menu entries: every contributed command call paired with
  /// its metadata. Calls naming commands without metadata are dropped, so a
  /// menu never shows an unlabelable entry.
  pub fn quick_insert_items(&self) -> Vec<QuickInsertItem> {
    self
      .extensions
      .iter()
      .filter_map(|ext| ext.quick_insert())
      .flat_map(QuickInsertSource::quick_insert_calls)
      .filter_map(|call| {
        let meta = self.registry.meta(&call.name)?.resolve(&call.args);
        Some(QuickInsertItem { call, meta })
      })
      .collect()
  }

  /// Parse external text through the first extension that can. The built-in
  /// paste extension supplies a Markdown parser, so this normally succeeds.
  pub fn parse_content(&self, text: &str) -> Option<Node> {
    self
      .extensions
      .iter()
      .find_map(|ext| ext.content_parser()?.parse(&self.schema, text))
  }

  pub fn destroy(&self) {
    for ext in self.extensions.iter().rev() {
      ext.on_destroy();
    }
  }
}

fn keymap_plugin(keymap: Keymap, registry: Rc<CommandRegistry>) -> Plugin {
  Plugin::new("keymap").on_key_down(move |ctx, key| {
    let Ok(binding) = key.parse::<Keybinding>() else {
      return false;
    };
    match keymap.lookup(&binding) {
      Some(calls) => registry.dispatch_first(ctx, calls),
      None => false,
    }
  })
}

/// Fallback bindings consulted after every extension keymap.
fn base_keymap() -> std::result::Result<Keymap, KeymapError> {
  let mut keymap = Keymap::new();
  for name in [
    "newlineInCode",
    "createParagraphNear",
    "liftEmptyBlock",
    "splitBlock",
  ] {
    keymap.bind("Enter", CommandCall::bare(name))?;
  }
  keymap.bind("Backspace", CommandCall::bare("deleteSelection"))?;
  keymap.bind("Delete", CommandCall::bare("deleteSelection"))?;
  Ok(keymap)
}

/// Paste pipeline: HTML when offered, then extension content parsers, then
/// plain text filtered through the paste rules.
fn paste_plugin(
  schema: Schema,
  rules: Vec<PasteRule>,
  extensions: Vec<Rc<dyn Extension>>,
) -> Plugin {
  Plugin::new("paste").on_paste(move |ctx, pasted| {
    if let Some(html) = &pasted.html {
      if let Ok(doc) = parse_html(&schema, html) {
        let mut tr = ctx.tr();
        if insert_parsed(&mut tr, &doc) {
          ctx.submit(tr);
          return true;
        }
      }
    }
    for ext in &extensions {
      let Some(parser) = ext.content_parser() else {
        continue;
      };
      let Some(doc) = parser.parse(&schema, &pasted.text) else {
        continue;
      };
      let mut tr = ctx.tr();
      if insert_parsed(&mut tr, &doc) {
        ctx.submit(tr);
        return true;
      }
    }
    let mut tr = ctx.tr();
    let mut at = tr.selection().from();
    if !tr.selection().is_empty() && tr.delete_selection().is_err() {
      return false;
    }
    for node in apply_paste_rules(&schema, &rules, &pasted.text) {
      let Some(text) = node.text_str() else {
        continue;
      };
      if tr.insert_text(at, text, node.marks().to_vec()).is_err() {
        return false;
      }
      at += text.chars().count();
    }
    tr.set_selection(vellum_model::Selection::point(at));
    ctx.submit(tr);
    true
  })
}
