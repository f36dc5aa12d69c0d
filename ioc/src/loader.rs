//! Loads module graphs into an injector.

use crate::annotate::Annotated;
use crate::error::{InjectError, Result};
use crate::injector::{Injector, Phase};
use crate::module::{ModuleRef, ModuleRegistry};
use crate::registrar::Registrar;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Walks the requirement graph depth-first, loading every module once.
struct ModuleLoader<'a> {
  registry: &'a ModuleRegistry,
  injector: &'a Injector,
  registrar: Registrar,
  loaded: HashSet<String>,
  run_blocks: Vec<Annotated>,
}

impl<'a> ModuleLoader<'a> {
  fn new(registry: &'a ModuleRegistry, injector: &'a Injector) -> Self {
    Self {
      registry,
      injector,
      registrar: injector.registrar(),
      loaded: HashSet::new(),
      run_blocks: Vec::new(),
    }
  }

  fn load(&mut self, module: &ModuleRef) -> Result<()> {
    match module {
      ModuleRef::Named(name) => self.load_named(name),
      ModuleRef::Inline(f) => {
        let produced = self.injector.invoke_in(Phase::Provider, f, None, None)?;
        if let Some(block) = produced.and_then(|p| p.downcast::<Annotated>().ok()) {
          self.run_blocks.push((*block).clone());
        }
        Ok(())
      }
    }
  }

  fn load_named(&mut self, name: &str) -> Result<()> {
    // Marking before descending also ends requirement cycles.
    if !self.loaded.insert(name.to_owned()) {
      return Ok(());
    }
    let module = self
      .registry
      .get(name)
      .ok_or_else(|| InjectError::UnknownModule {
        name: name.to_owned(),
      })?;
    debug!(module = name, requires = ?module.requires(), "loading module");

    for required in module.requires() {
      self.load_named(required)?;
    }
    for registration in &module.invoke_queue {
      trace!(module = name, verb = registration.verb, name = %registration.name, "replaying");
      registration.replay(&self.registrar)?;
    }
    for block in &module.config_queue {
      self.injector.invoke_in(Phase::Provider, block, None, None)?;
    }
    self.run_blocks.extend(module.run_blocks.iter().cloned());
    Ok(())
  }
}

impl Injector {
  /// Creates an injector and loads `modules` into it.
  ///
  /// Required modules load before the modules that require them, each at
  /// most once. Run blocks execute after every module has loaded, in the
  /// order they were collected, against the instance phase.
  pub fn new<I, M>(registry: &ModuleRegistry, modules: I) -> Result<Self>
  where
    I: IntoIterator<Item = M>,
    M: Into<ModuleRef>,
  {
    let injector = Injector::empty();
    let run_blocks = {
      let mut loader = ModuleLoader::new(registry, &injector);
      for module in modules {
        loader.load(&module.into())?;
      }
      loader.run_blocks
    };
    debug!(count = run_blocks.len(), "running startup blocks");
    for block in &run_blocks {
      injector.invoke(block, None, None)?;
    }
    Ok(injector)
  }
}
