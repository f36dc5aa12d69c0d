//! The registration verbs, injectable as `$provide`.

use crate::annotate::{Annotated, Instance, Locals};
use crate::core::{provider_key, ProviderEntry, ServiceProvider, Slot, DELEGATE_TOKEN, RESERVED_NAME};
use crate::error::{InjectError, Result};
use crate::injector::{Injector, Phase};
use std::any::{type_name, Any};
use std::rc::Rc;
use tracing::debug;

/// Registers construction recipes with an [`Injector`].
///
/// Every verb validates its input immediately and fails before any
/// resolution happens. Registering a name again replaces the previous
/// recipe.
#[derive(Clone, Debug)]
pub struct Registrar {
  injector: Injector,
}

fn check_name(name: &str) -> Result<()> {
  if name == RESERVED_NAME {
    return Err(InjectError::InvalidName {
      name: name.to_owned(),
    });
  }
  Ok(())
}

impl Registrar {
  pub(crate) fn new(injector: Injector) -> Self {
    Self { injector }
  }

  pub fn injector(&self) -> &Injector {
    &self.injector
  }

  /// Stores `value` as a ready instance. It is never constructed or re-invoked.
  pub fn constant<T: Any>(&self, name: &str, value: T) -> Result<()> {
    self.constant_instance(name, Rc::new(value))
  }

  pub fn constant_instance(&self, name: &str, value: Instance) -> Result<()> {
    check_name(name)?;
    debug!(name, "registering constant");
    self
      .injector
      .inner
      .instances
      .borrow_mut()
      .insert(name.to_owned(), Slot::Ready(value));
    Ok(())
  }

  /// Registers a provider object under `<name>Provider`.
  pub fn provider<P: ServiceProvider>(&self, name: &str, provider: Rc<P>) -> Result<()> {
    check_name(name)?;
    self.insert_provider(name, ProviderEntry::from_provider(provider));
    Ok(())
  }

  /// Builds the provider object with `ctor`, resolving its dependencies
  /// against the provider phase, then registers it.
  pub fn provider_type<P: ServiceProvider>(&self, name: &str, ctor: &Annotated) -> Result<()> {
    check_name(name)?;
    let built = self.injector.instantiate_in(Phase::Provider, ctor, None)?;
    let provider = built.downcast::<P>().map_err(|_| InjectError::TypeMismatch {
      token: provider_key(name),
      expected: type_name::<P>(),
    })?;
    self.insert_provider(name, ProviderEntry::from_provider(provider));
    Ok(())
  }

  /// Registers `f` as the construction recipe of `name`. Producing nothing
  /// is a [`InjectError::FactoryContract`] failure.
  pub fn factory(&self, name: &str, f: Annotated) -> Result<()> {
    self.factory_with(name, f, true)
  }

  /// Like [`Registrar::factory`], with the return-value check optional.
  ///
  /// An unchecked factory that produces nothing caches `()`.
  pub fn factory_with(&self, name: &str, f: Annotated, enforce_return: bool) -> Result<()> {
    check_name(name)?;
    let service = name.to_owned();
    let construct = Annotated::erased(&[], move |args| {
      let produced = args.injector().invoke(&f, None, None)?;
      if enforce_return && produced.is_none() {
        return Err(InjectError::FactoryContract {
          name: service.clone(),
        });
      }
      Ok(produced)
    });
    self.insert_provider(name, ProviderEntry::from_recipe(construct));
    Ok(())
  }

  /// Registers a fixed value, shared by every resolution.
  pub fn value<T: Any>(&self, name: &str, value: T) -> Result<()> {
    self.value_instance(name, Rc::new(value))
  }

  pub fn value_instance(&self, name: &str, value: Instance) -> Result<()> {
    self.factory_with(name, Annotated::value(value), false)
  }

  /// Registers a constructor; the service is whatever it builds.
  pub fn service(&self, name: &str, ctor: Annotated) -> Result<()> {
    let ctor = match ctor.label() {
      Some(_) => ctor,
      None => ctor.labelled(name),
    };
    self.factory(
      name,
      Annotated::erased(&[], move |args| {
        args.injector().instantiate(&ctor, None).map(Some)
      }),
    )
  }

  /// Wraps the existing recipe of `name`.
  ///
  /// The original recipe runs first; `decorate` is then invoked with the
  /// result available as the local `$delegate`. If `decorate` produces a
  /// value, it replaces the instance; otherwise the (possibly mutated)
  /// delegate is kept.
  pub fn decorator(&self, name: &str, decorate: Annotated) -> Result<()> {
    check_name(name)?;
    let mut providers = self.injector.inner.providers.borrow_mut();
    let entry = providers
      .get_mut(&provider_key(name))
      .ok_or_else(|| InjectError::UnknownProvider {
        token: name.to_owned(),
        path: Vec::new(),
      })?;
    debug!(name, "decorating provider");
    let original = entry.construct.clone();
    entry.construct = Annotated::erased(&[], move |args| {
      let delegate = args
        .injector()
        .invoke(&original, args.this_instance(), None)?
        .unwrap_or_else(|| Rc::new(()) as Instance);
      let locals = Locals::new().with_instance(DELEGATE_TOKEN, delegate.clone());
      let decorated = args.injector().invoke(&decorate, None, Some(&locals))?;
      Ok(Some(decorated.unwrap_or(delegate)))
    });
    Ok(())
  }

  fn insert_provider(&self, name: &str, entry: ProviderEntry) {
    debug!(name, "registering provider");
    self
      .injector
      .inner
      .providers
      .borrow_mut()
      .insert(provider_key(name), entry);
  }
}
