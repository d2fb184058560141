//! Command registration and dispatch.
//!
//! Commands are named, argument-taking functions over a transaction. The
//! registry is built once by the extension manager; execution happens in two
//! modes:
//!
//! - *run-once*: [`CommandManager::call`] gives the command a transaction
//!   and dispatches it immediately when the command succeeds. Repeated calls
//!   through an [`OnceCommands`] session keep amending the same transaction,
//!   so they collapse into one undo step.
//! - *chained*: [`CommandManager::chain`] threads one transaction through
//!   every command in the chain and dispatches nothing until [`Chain::run`].
//!   The chain owns its transaction, so a command cannot accidentally
//!   dispatch against a different one. Dropping the chain without `run` (or
//!   using [`Chain::dry_run`]) leaves the editor untouched.
//!
//! Both modes have dry variants that never dispatch: the transaction is
//! simply discarded, which makes "would this command apply?" queries safe by
//! construction.

use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use vellum_model::{
  state::State,
  view::{
    Effect,
    EventContext,
    View,
    ViewError,
    ViewInfo,
  },
  Attrs,
  Transaction,
};

use crate::extension::CommandCall;

pub type Result<T> = std::result::Result<T, CommandError>;

#[derive(Debug, Error)]
pub enum CommandError {
  #[error("unknown command `{0}`")]
  Unknown(String),
  #[error(transparent)]
  View(#[from] ViewError),
}

/// Arguments passed to a command, as loose JSON. Node and mark types are
/// referred to by name.
#[derive(Clone, Debug, Default)]
pub struct CommandArgs(Value);

impl CommandArgs {
  pub fn none() -> Self {
    CommandArgs(Value::Null)
  }

  pub fn from_value(value: Value) -> Self {
    CommandArgs(value)
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }

  pub fn str(&self, key: &str) -> Option<&str> {
    self.get(key).and_then(Value::as_str)
  }

  pub fn u64(&self, key: &str) -> Option<u64> {
    self.get(key).and_then(Value::as_u64)
  }

  /// The object under `key`, as node attrs. Missing or non-object values
  /// yield empty attrs.
  pub fn attrs(&self, key: &str) -> Attrs {
    self
      .get(key)
      .and_then(Value::as_object)
      .cloned()
      .unwrap_or_default()
  }
}

/// Everything a command sees: the transaction it edits, the state it was
/// created from, and a sink for view effects. `apply` is `false` during dry
/// runs; commands may skip work that only matters when the transaction will
/// be dispatched.
pub struct CommandContext<'a> {
  pub tr:      &'a mut Transaction,
  pub state:   &'a State,
  pub apply:   bool,
  pub info:    ViewInfo,
  pub effects: &'a mut Vec<Effect>,
}

type CommandFn = Box<dyn Fn(&mut CommandContext<'_>, &CommandArgs) -> bool>;

/// One display field of a command's metadata: either a fixed string or a
/// function of the arguments the command would be called with (a heading
/// command labels itself "Heading 2" only once it knows the level).
pub enum MetaField {
  Fixed(String),
  Derived(Box<dyn Fn(&CommandArgs) -> String>),
}

impl MetaField {
  pub fn fixed(text: impl Into<String>) -> Self {
    MetaField::Fixed(text.into())
  }

  pub fn derived(f: impl Fn(&CommandArgs) -> String + 'static) -> Self {
    MetaField::Derived(Box::new(f))
  }

  pub fn resolve(&self, args: &CommandArgs) -> String {
    match self {
      MetaField::Fixed(text) => text.clone(),
      MetaField::Derived(f) => f(args),
    }
  }
}

impl std::fmt::Debug for MetaField {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      MetaField::Fixed(text) => f.debug_tuple("Fixed").field(text).finish(),
      MetaField::Derived(_) => f.debug_tuple("Derived").field(&"..").finish(),
    }
  }
}

/// Display metadata registered alongside a command so menu surfaces (quick
/// insert, shortcut overviews) can present it without a parallel table that
/// could drift out of sync with the implementation.
#[derive(Debug, Default)]
pub struct CommandMeta {
  pub icon:     Option<MetaField>,
  pub label:    Option<MetaField>,
  pub markdown: Option<MetaField>,
  pub shortcut: Option<MetaField>,
}

impl CommandMeta {
  pub fn new() -> Self {
    CommandMeta::default()
  }

  pub fn icon(mut self, field: MetaField) -> Self {
    self.icon = Some(field);
    self
  }

  pub fn label(mut self, field: MetaField) -> Self {
    self.label = Some(field);
    self
  }

  pub fn markdown(mut self, field: MetaField) -> Self {
    self.markdown = Some(field);
    self
  }

  pub fn shortcut(mut self, field: MetaField) -> Self {
    self.shortcut = Some(field);
    self
  }

  pub fn resolve(&self, args: &CommandArgs) -> ResolvedMeta {
    ResolvedMeta {
      icon:     self.icon.as_ref().map(|f| f.resolve(args)),
      label:    self.label.as_ref().map(|f| f.resolve(args)),
      markdown: self.markdown.as_ref().map(|f| f.resolve(args)),
      shortcut: self.shortcut.as_ref().map(|f| f.resolve(args)),
    }
  }
}

/// [`CommandMeta`] with every field resolved against concrete arguments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedMeta {
  pub icon:     Option<String>,
  pub label:    Option<String>,
  pub markdown: Option<String>,
  pub shortcut: Option<String>,
}

pub struct Command {
  name: &'static str,
  doc:  &'static str,
  meta: Option<CommandMeta>,
  run:  CommandFn,
}

impl Command {
  pub fn name(&self) -> &'static str {
    self.name
  }

  pub fn doc(&self) -> &'static str {
    self.doc
  }

  pub fn meta(&self) -> Option<&CommandMeta> {
    self.meta.as_ref()
  }
}

/// Name-keyed command table. Registration is last-wins: an extension later
/// in the resolved order replaces earlier commands of the same name.
#[derive(Default)]
pub struct CommandRegistry {
  commands: IndexMap<&'static str, Command>,
}

impl CommandRegistry {
  pub fn new() -> Self {
    CommandRegistry::default()
  }

  pub fn register(
    &mut self,
    name: &'static str,
    doc: &'static str,
    run: impl Fn(&mut CommandContext<'_>, &CommandArgs) -> bool + 'static,
  ) {
    self.insert(Command {
      name,
      doc,
      meta: None,
      run: Box::new(run),
    });
  }

  /// Register a command together with its display metadata. One entry point
  /// keeps the menu surface and the implementation from diverging.
  pub fn register_with_meta(
    &mut self,
    name: &'static str,
    doc: &'static str,
    meta: CommandMeta,
    run: impl Fn(&mut CommandContext<'_>, &CommandArgs) -> bool + 'static,
  ) {
    self.insert(Command {
      name,
      doc,
      meta: Some(meta),
      run: Box::new(run),
    });
  }

  fn insert(&mut self, command: Command) {
    let name = command.name;
    if self.commands.insert(name, command).is_some() {
      warn!(command = name, "command overridden by a later extension");
    }
  }

  pub fn get(&self, name: &str) -> Option<&Command> {
    self.commands.get(name)
  }

  pub fn meta(&self, name: &str) -> Option<&CommandMeta> {
    self.commands.get(name)?.meta()
  }

  pub fn contains(&self, name: &str) -> bool {
    self.commands.contains_key(name)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Command> {
    self.commands.values()
  }

  pub fn len(&self) -> usize {
    self.commands.len()
  }

  pub fn is_empty(&self) -> bool {
    self.commands.is_empty()
  }

  fn run(&self, name: &str, ctx: &mut CommandContext<'_>, args: &CommandArgs) -> Result<bool> {
    let command = self
      .commands
      .get(name)
      .ok_or_else(|| CommandError::Unknown(name.to_string()))?;
    Ok((command.run)(ctx, args))
  }

  /// Try each call in order, each on a fresh transaction; submit the first
  /// that succeeds into the event context. Keybinding chains resolve here.
  pub fn dispatch_first(&self, ctx: &mut EventContext<'_>, calls: &[CommandCall]) -> bool {
    for call in calls {
      let Some(command) = self.commands.get(call.name.as_str()) else {
        warn!(command = call.name, "keybinding refers to unknown command");
        continue;
      };
      let mut tr = ctx.tr();
      let mut effects = Vec::new();
      let ok = {
        let mut cctx = CommandContext {
          tr:      &mut tr,
          state:   ctx.state(),
          apply:   true,
          info:    ctx.info(),
          effects: &mut effects,
        };
        (command.run)(&mut cctx, &call.args)
      };
      if ok {
        ctx.submit(tr);
        for effect in effects {
          ctx.add_effect(effect);
        }
        return true;
      }
    }
    false
  }
}

/// Command execution over a live view.
#[derive(Clone)]
pub struct CommandManager {
  registry: Rc<CommandRegistry>,
}

impl CommandManager {
  pub(crate) fn new(registry: Rc<CommandRegistry>) -> Self {
    CommandManager { registry }
  }

  pub fn registry(&self) -> &CommandRegistry {
    &self.registry
  }

  /// Run one command and dispatch its transaction when it succeeds.
  pub fn call(&self, view: &mut View, name: &str, args: &CommandArgs) -> Result<bool> {
    let mut session = self.once(view);
    session.call(name, args)
  }

  /// Run one command without dispatching. The document is untouched no
  /// matter what the command does to its transaction.
  pub fn dry_call(&self, view: &View, name: &str, args: &CommandArgs) -> Result<bool> {
    let mut tr = view.state().tr();
    let mut effects = Vec::new();
    let mut ctx = CommandContext {
      tr:      &mut tr,
      state:   view.state(),
      apply:   false,
      info:    view.info(),
      effects: &mut effects,
    };
    self.registry.run(name, &mut ctx, args)
  }

  /// A run-once session: every successful call dispatches immediately, but
  /// calls share one transaction so the session undoes as a single step.
  pub fn once<'v>(&self, view: &'v mut View) -> OnceCommands<'v> {
    OnceCommands {
      registry: Rc::clone(&self.registry),
      view,
      tr: None,
    }
  }

  /// Start a chain: commands accumulate on one transaction, committed by
  /// [`Chain::run`].
  pub fn chain<'v>(&self, view: &'v mut View) -> Chain<'v> {
    let tr = view.state().tr();
    Chain {
      registry: Rc::clone(&self.registry),
      view,
      tr,
      effects: Vec::new(),
      all: true,
      error: None,
    }
  }
}

pub struct OnceCommands<'v> {
  registry: Rc<CommandRegistry>,
  view:     &'v mut View,
  tr:       Option<Transaction>,
}

impl OnceCommands<'_> {
  pub fn call(&mut self, name: &str, args: &CommandArgs) -> Result<bool> {
    let mut tr = match self.tr.take() {
      Some(tr) => tr,
      None => self.view.state().tr(),
    };
    let mut effects = Vec::new();
    let ok = {
      let mut ctx = CommandContext {
        tr:      &mut tr,
        state:   self.view.state(),
        apply:   true,
        info:    self.view.info(),
        effects: &mut effects,
      };
      self.registry.run(name, &mut ctx, args)?
    };
    if ok {
      self.view.dispatch(&tr)?;
      for effect in effects {
        self.view.apply_effect(effect);
      }
      // Keep the transaction: later calls amend it.
      self.tr = Some(tr);
    }
    Ok(ok)
  }
}

pub struct Chain<'v> {
  registry: Rc<CommandRegistry>,
  view:     &'v mut View,
  tr:       Transaction,
  effects:  Vec<Effect>,
  all:      bool,
  error:    Option<CommandError>,
}

impl Chain<'_> {
  /// Append a command. Failures do not short-circuit: every command in the
  /// chain executes, and [`Chain::run`] reports whether all succeeded.
  pub fn command(mut self, name: &str, args: &CommandArgs) -> Self {
    if self.error.is_some() {
      return self;
    }
    let result = {
      let mut ctx = CommandContext {
        tr:      &mut self.tr,
        state:   self.view.state(),
        apply:   true,
        info:    self.view.info(),
        effects: &mut self.effects,
      };
      self.registry.run(name, &mut ctx, args)
    };
    match result {
      Ok(ok) => self.all = self.all && ok,
      Err(err) => self.error = Some(err),
    }
    self
  }

  /// Commit the chain in one dispatch (one undo step) and apply effects.
  /// Returns whether every command in the chain succeeded.
  pub fn run(self) -> Result<bool> {
    if let Some(err) = self.error {
      return Err(err);
    }
    self.view.dispatch(&self.tr)?;
    for effect in self.effects {
      self.view.apply_effect(effect);
    }
    Ok(self.all)
  }

  /// Evaluate the chain without dispatching anything.
  pub fn dry_run(self) -> Result<bool> {
    match self.error {
      Some(err) => Err(err),
      None => Ok(self.all),
    }
  }
}
