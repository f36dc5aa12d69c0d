//! Module declarations and the registry that holds them.

use crate::annotate::{Annotated, Instance};
use crate::core::{provider_key, ServiceProvider};
use crate::error::Result;
use crate::registrar::Registrar;
use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// One queued registration call, replayed against a [`Registrar`] when the
/// owning module loads.
#[derive(Clone)]
pub(crate) struct Registration {
  pub(crate) verb: &'static str,
  pub(crate) name: String,
  apply: Rc<dyn Fn(&Registrar) -> Result<()>>,
}

impl Registration {
  fn new<F>(verb: &'static str, name: &str, apply: F) -> Self
  where
    F: Fn(&Registrar, &str) -> Result<()> + 'static,
  {
    let owned = name.to_owned();
    Self {
      verb,
      name: name.to_owned(),
      apply: Rc::new(move |registrar| apply(registrar, &owned)),
    }
  }

  pub(crate) fn replay(&self, registrar: &Registrar) -> Result<()> {
    (self.apply)(registrar)
  }
}

/// A named bundle of registrations, configuration blocks and run blocks.
///
/// Nothing queued on a module touches an injector until the module is
/// loaded. Every verb returns `&mut Self` so declarations can be chained.
pub struct Module {
  name: String,
  requires: Vec<String>,
  pub(crate) invoke_queue: Vec<Registration>,
  pub(crate) config_queue: Vec<Annotated>,
  pub(crate) run_blocks: Vec<Annotated>,
}

impl fmt::Debug for Module {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Module")
      .field("name", &self.name)
      .field("requires", &self.requires)
      .field(
        "invoke_queue",
        &self
          .invoke_queue
          .iter()
          .map(|r| format!("{}({})", r.verb, r.name))
          .collect::<Vec<_>>(),
      )
      .field("config_blocks", &self.config_queue.len())
      .field("run_blocks", &self.run_blocks.len())
      .finish()
  }
}

impl Module {
  fn new(name: &str, requires: &[&str]) -> Self {
    Self {
      name: name.to_owned(),
      requires: requires.iter().map(|r| (*r).to_owned()).collect(),
      invoke_queue: Vec::new(),
      config_queue: Vec::new(),
      run_blocks: Vec::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn requires(&self) -> &[String] {
    &self.requires
  }

  fn push(&mut self, registration: Registration) -> &mut Self {
    self.invoke_queue.push(registration);
    self
  }

  pub fn constant<T: Any>(&mut self, name: &str, value: T) -> &mut Self {
    let value: Instance = Rc::new(value);
    self.push(Registration::new("constant", name, move |r, name| {
      r.constant_instance(name, value.clone())
    }))
  }

  pub fn value<T: Any>(&mut self, name: &str, value: T) -> &mut Self {
    let value: Instance = Rc::new(value);
    self.push(Registration::new("value", name, move |r, name| {
      r.value_instance(name, value.clone())
    }))
  }

  pub fn factory(&mut self, name: &str, f: Annotated) -> &mut Self {
    self.factory_with(name, f, true)
  }

  pub fn factory_with(&mut self, name: &str, f: Annotated, enforce_return: bool) -> &mut Self {
    self.push(Registration::new("factory", name, move |r, name| {
      r.factory_with(name, f.clone(), enforce_return)
    }))
  }

  pub fn service(&mut self, name: &str, ctor: Annotated) -> &mut Self {
    self.push(Registration::new("service", name, move |r, name| {
      r.service(name, ctor.clone())
    }))
  }

  pub fn provider<P: ServiceProvider>(&mut self, name: &str, provider: Rc<P>) -> &mut Self {
    self.push(Registration::new("provider", name, move |r, name| {
      r.provider(name, provider.clone())
    }))
  }

  /// Queues a provider that is itself built by an annotated constructor.
  pub fn provider_type<P: ServiceProvider>(&mut self, name: &str, ctor: Annotated) -> &mut Self {
    self.push(Registration::new("provider", name, move |r, name| {
      r.provider_type::<P>(name, &ctor)
    }))
  }

  pub fn decorator(&mut self, name: &str, decorate: Annotated) -> &mut Self {
    self.push(Registration::new("decorator", name, move |r, name| {
      r.decorator(name, decorate.clone())
    }))
  }

  /// Queues a configuration block, invoked against providers and constants.
  pub fn config(&mut self, block: Annotated) -> &mut Self {
    self.config_queue.push(block);
    self
  }

  /// Queues a call on the provider registered for `service`.
  pub fn configure<P, F>(&mut self, service: &str, f: F) -> &mut Self
  where
    P: ServiceProvider,
    F: Fn(&P) + 'static,
  {
    let token = provider_key(service);
    self.config(Annotated::action(&[token.as_str()], move |args| {
      f(&*args.get::<P>(0)?);
      Ok(())
    }))
  }

  /// Queues a startup callback, run once every module has loaded.
  pub fn run(&mut self, block: Annotated) -> &mut Self {
    self.run_blocks.push(block);
    self
  }
}

/// Explicitly owned set of declared modules.
#[derive(Default, Debug)]
pub struct ModuleRegistry {
  modules: HashMap<String, Module>,
}

impl ModuleRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Declares `name`, replacing any earlier declaration with the same name.
  pub fn module(&mut self, name: &str, requires: &[&str]) -> &mut Module {
    let module = Module::new(name, requires);
    match self.modules.entry(name.to_owned()) {
      Entry::Occupied(mut slot) => {
        slot.insert(module);
        slot.into_mut()
      }
      Entry::Vacant(slot) => slot.insert(module),
    }
  }

  pub fn get(&self, name: &str) -> Option<&Module> {
    self.modules.get(name)
  }

  /// Reopens a declared module to queue more work on it.
  pub fn get_mut(&mut self, name: &str) -> Option<&mut Module> {
    self.modules.get_mut(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.modules.contains_key(name)
  }
}

/// A reference to something the loader should load.
#[derive(Clone, Debug)]
pub enum ModuleRef {
  /// A module declared in the registry.
  Named(String),
  /// A function invoked against the provider phase. If it produces an
  /// [`Annotated`], that value is queued as a run block.
  Inline(Annotated),
}

impl From<&str> for ModuleRef {
  fn from(name: &str) -> Self {
    ModuleRef::Named(name.to_owned())
  }
}

impl From<String> for ModuleRef {
  fn from(name: String) -> Self {
    ModuleRef::Named(name)
  }
}

impl From<Annotated> for ModuleRef {
  fn from(f: Annotated) -> Self {
    ModuleRef::Inline(f)
  }
}
