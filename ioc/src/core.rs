//! Core, non-public data structures for the injector.

use crate::annotate::{Annotated, Instance};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// The name no registration verb may use.
pub(crate) const RESERVED_NAME: &str = "hasOwnProperty";
/// Suffix under which provider objects are cached.
pub(crate) const PROVIDER_SUFFIX: &str = "Provider";
/// Resolves to the injector itself in either phase.
pub const INJECTOR_TOKEN: &str = "$injector";
/// Resolves to the [`Registrar`](crate::Registrar) during the provider phase.
pub const PROVIDE_TOKEN: &str = "$provide";
/// Local under which a decorator receives the instance it decorates.
pub const DELEGATE_TOKEN: &str = "$delegate";

pub(crate) fn provider_key(name: &str) -> String {
  format!("{}{}", name, PROVIDER_SUFFIX)
}

/// A token is a plain name when it is non-empty and free of whitespace.
pub(crate) fn is_plain_name(token: &str) -> bool {
  !token.is_empty() && !token.chars().any(|c| c.is_whitespace() || c.is_control())
}

/// A recipe object that knows how to construct exactly one named service.
///
/// Providers are registered before any instance exists. During the
/// configuration phase they are reachable as `<name>Provider`, so their
/// own inherent methods act as configuration hooks. Use interior
/// mutability for anything a config block should be able to change.
pub trait ServiceProvider: 'static {
  /// The construction method. It is invoked with the provider bound as
  /// `this` (see [`Args::this`](crate::Args::this)).
  fn construct(&self) -> Annotated;
}

/// A stored provider: the object config blocks see, and the recipe the
/// instance phase invokes.
#[derive(Clone)]
pub(crate) struct ProviderEntry {
  pub(crate) object: Instance,
  pub(crate) construct: Annotated,
}

impl ProviderEntry {
  pub(crate) fn from_provider<P: ServiceProvider>(provider: Rc<P>) -> Self {
    Self {
      construct: provider.construct(),
      object: provider,
    }
  }

  pub(crate) fn from_recipe(construct: Annotated) -> Self {
    Self {
      object: Rc::new(()),
      construct,
    }
  }
}

/// Observable state of one instance-cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
  /// Nothing cached; the next request constructs.
  Absent,
  /// Construction is running further up the current call stack.
  InProgress,
  /// A realized value is cached.
  Ready,
}

#[derive(Clone)]
pub(crate) enum Slot {
  InProgress,
  Ready(Instance),
}

impl Slot {
  pub(crate) fn state(slot: Option<&Slot>) -> CacheState {
    match slot {
      None => CacheState::Absent,
      Some(Slot::InProgress) => CacheState::InProgress,
      Some(Slot::Ready(_)) => CacheState::Ready,
    }
  }
}

/// An RAII guard around one construction.
///
/// When created it pushes the service name onto the front of the shared
/// resolution path and marks the cache entry in progress. When dropped,
/// including while a failure propagates, it pops the path and clears an
/// entry that never became ready, so a later request can retry.
pub(crate) struct PathGuard<'a> {
  name: String,
  path: &'a RefCell<Vec<String>>,
  instances: &'a RefCell<HashMap<String, Slot>>,
}

impl<'a> PathGuard<'a> {
  pub(crate) fn enter(
    name: &str,
    path: &'a RefCell<Vec<String>>,
    instances: &'a RefCell<HashMap<String, Slot>>,
  ) -> Self {
    path.borrow_mut().insert(0, name.to_owned());
    instances
      .borrow_mut()
      .insert(name.to_owned(), Slot::InProgress);
    Self {
      name: name.to_owned(),
      path,
      instances,
    }
  }
}

impl Drop for PathGuard<'_> {
  fn drop(&mut self) {
    {
      let mut path = self.path.borrow_mut();
      if !path.is_empty() {
        path.remove(0);
      }
    }
    let mut instances = self.instances.borrow_mut();
    if matches!(instances.get(&self.name), Some(Slot::InProgress)) {
      instances.remove(&self.name);
    }
  }
}
