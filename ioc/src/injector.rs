//! The `Injector`: resolution, invocation and construction.

use crate::annotate::{check_tokens, Annotated, Args, Instance, Locals};
use crate::core::{
  provider_key, CacheState, PathGuard, ProviderEntry, Slot, INJECTOR_TOKEN, PROVIDER_SUFFIX,
  PROVIDE_TOKEN,
};
use crate::error::{InjectError, Result};
use crate::registrar::Registrar;
use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Which cache a token is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
  /// Config blocks and inline modules: providers, constants, `$provide`.
  Provider,
  /// Everything after loading: realized instances, built lazily.
  Instance,
}

pub(crate) struct Inner {
  pub(crate) providers: RefCell<HashMap<String, ProviderEntry>>,
  pub(crate) instances: RefCell<HashMap<String, Slot>>,
  path: RefCell<Vec<String>>,
}

/// A service-resolution container.
///
/// Holds two caches: provider objects keyed `<name>Provider`, and realized
/// instances and constants keyed `<name>`. Every service is constructed
/// lazily, at most once, on first request. Cloning an `Injector` yields
/// another handle to the same caches.
#[derive(Clone)]
pub struct Injector {
  pub(crate) inner: Rc<Inner>,
}

impl Default for Injector {
  fn default() -> Self {
    Self::empty()
  }
}

impl fmt::Debug for Injector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Injector")
      .field("providers", &self.inner.providers.borrow().len())
      .field("instances", &self.inner.instances.borrow().len())
      .finish_non_exhaustive()
  }
}

impl Injector {
  /// Creates an injector with no modules loaded.
  pub fn empty() -> Self {
    Self {
      inner: Rc::new(Inner {
        providers: RefCell::new(HashMap::new()),
        instances: RefCell::new(HashMap::new()),
        path: RefCell::new(Vec::new()),
      }),
    }
  }

  /// The registration surface, also injectable as `$provide`.
  pub fn registrar(&self) -> Registrar {
    Registrar::new(self.clone())
  }

  /// Returns true if `name` is cached or has a provider.
  pub fn has(&self, name: &str) -> bool {
    name == INJECTOR_TOKEN
      || self.inner.instances.borrow().contains_key(name)
      || self.inner.providers.borrow().contains_key(&provider_key(name))
  }

  /// Reports the instance-cache state for `name`.
  pub fn state(&self, name: &str) -> CacheState {
    Slot::state(self.inner.instances.borrow().get(name))
  }

  /// Resolves `name` and downcasts it to `T`.
  pub fn get<T: Any>(&self, name: &str) -> Result<Rc<T>> {
    self
      .get_instance(name)?
      .downcast::<T>()
      .map_err(|_| InjectError::TypeMismatch {
        token: name.to_owned(),
        expected: type_name::<T>(),
      })
  }

  /// Resolves `name` to its realized value, constructing it on first use.
  pub fn get_instance(&self, name: &str) -> Result<Instance> {
    self.resolve(name, Phase::Instance)
  }

  /// Returns the ordered dependency tokens of `f`.
  pub fn annotate(&self, f: &Annotated) -> Result<Vec<String>> {
    f.annotate()
  }

  /// Resolves the dependencies of `f` and calls it.
  ///
  /// Each token is looked up in `locals` first and only then through the
  /// injector. `this` is exposed to the function as [`Args::this`].
  pub fn invoke(
    &self,
    f: &Annotated,
    this: Option<&Instance>,
    locals: Option<&Locals>,
  ) -> Result<Option<Instance>> {
    self.invoke_in(Phase::Instance, f, this, locals)
  }

  /// Runs a constructor and returns what it builds.
  pub fn instantiate(&self, ctor: &Annotated, locals: Option<&Locals>) -> Result<Instance> {
    self.instantiate_in(Phase::Instance, ctor, locals)
  }

  pub(crate) fn instantiate_in(
    &self,
    phase: Phase,
    ctor: &Annotated,
    locals: Option<&Locals>,
  ) -> Result<Instance> {
    self
      .invoke_in(phase, ctor, None, locals)?
      .ok_or_else(|| InjectError::FactoryContract {
        name: ctor.label().unwrap_or("constructor").to_owned(),
      })
  }

  pub(crate) fn invoke_in(
    &self,
    phase: Phase,
    f: &Annotated,
    this: Option<&Instance>,
    locals: Option<&Locals>,
  ) -> Result<Option<Instance>> {
    let tokens = f.annotate()?;
    check_tokens(&tokens)?;
    let mut values = Vec::with_capacity(tokens.len());
    for token in &tokens {
      let value = match locals.and_then(|l| l.get(token)) {
        Some(local) => local.clone(),
        None => self.resolve(token, phase)?,
      };
      values.push(value);
    }
    f.call(&Args::new(&tokens, values, this, self))
  }

  fn resolve(&self, name: &str, phase: Phase) -> Result<Instance> {
    if name == INJECTOR_TOKEN {
      return Ok(Rc::new(self.clone()) as Instance);
    }
    match phase {
      Phase::Provider => self.resolve_provider(name),
      Phase::Instance => self.resolve_instance(name),
    }
  }

  fn resolve_provider(&self, name: &str) -> Result<Instance> {
    if name == PROVIDE_TOKEN {
      return Ok(Rc::new(self.registrar()) as Instance);
    }
    if let Some(entry) = self.inner.providers.borrow().get(name) {
      return Ok(entry.object.clone());
    }
    // Constants live in the instance cache and are visible while configuring.
    if let Some(Slot::Ready(value)) = self.inner.instances.borrow().get(name) {
      return Ok(value.clone());
    }
    Err(InjectError::UnknownProvider {
      token: name.strip_suffix(PROVIDER_SUFFIX).unwrap_or(name).to_owned(),
      path: self.inner.path.borrow().clone(),
    })
  }

  fn resolve_instance(&self, name: &str) -> Result<Instance> {
    let cached = self.inner.instances.borrow().get(name).cloned();
    match cached {
      Some(Slot::Ready(value)) => return Ok(value),
      Some(Slot::InProgress) => {
        let mut path = vec![name.to_owned()];
        path.extend(self.inner.path.borrow().iter().cloned());
        return Err(InjectError::CircularDependency { path });
      }
      None => {}
    }

    let entry = self
      .inner
      .providers
      .borrow()
      .get(&provider_key(name))
      .cloned();
    let Some(entry) = entry else {
      return Err(InjectError::UnknownProvider {
        token: name.to_owned(),
        path: self.inner.path.borrow().clone(),
      });
    };

    let _guard = PathGuard::enter(name, &self.inner.path, &self.inner.instances);
    trace!(service = name, "instantiating");
    let value = self
      .invoke_in(Phase::Instance, &entry.construct, Some(&entry.object), None)?
      .unwrap_or_else(|| Rc::new(()) as Instance);
    self
      .inner
      .instances
      .borrow_mut()
      .insert(name.to_owned(), Slot::Ready(value.clone()));
    Ok(value)
  }
}
