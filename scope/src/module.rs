//! Exposes the root scope through a `fibre_ioc` module.
//!
//! ```
//! use fibre_ioc::{Injector, ModuleRegistry};
//! use fibre_scope::module::{self, RootScopeProvider};
//! use fibre_scope::Scope;
//!
//! let mut registry = ModuleRegistry::new();
//! module::register(&mut registry);
//! registry
//!   .module("app", &[module::MODULE_NAME])
//!   .configure::<RootScopeProvider, _>(module::ROOT_SCOPE, |p| p.set_digest_ttl(20));
//!
//! let injector = Injector::new(&registry, ["app"]).unwrap();
//! let root = injector.get::<Scope>(module::ROOT_SCOPE).unwrap();
//! assert_eq!(root.digest_ttl(), 20);
//! ```

use crate::builder::ScopeBuilder;
use crate::config::ScopeConfig;
use crate::handler::ExceptionHandler;
use crate::scheduler::Scheduler;
use fibre_ioc::{Annotated, Module, ModuleRegistry, ServiceProvider};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Name of the module [`register`] declares.
pub const MODULE_NAME: &str = "fibre";
/// Service name of the root scope.
pub const ROOT_SCOPE: &str = "$rootScope";

/// Configures and builds the root scope singleton.
///
/// Reachable as `$rootScopeProvider` from config blocks. Settings only
/// take effect if made before `$rootScope` is first resolved.
#[derive(Default)]
pub struct RootScopeProvider {
  config: RefCell<ScopeConfig>,
  scheduler: RefCell<Option<Rc<dyn Scheduler>>>,
  exception_handler: RefCell<Option<Rc<dyn ExceptionHandler>>>,
}

impl fmt::Debug for RootScopeProvider {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RootScopeProvider")
      .field("config", &*self.config.borrow())
      .field("scheduler", &self.scheduler.borrow().is_some())
      .field("exception_handler", &self.exception_handler.borrow().is_some())
      .finish()
  }
}

impl RootScopeProvider {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_config(&self, config: ScopeConfig) {
    *self.config.borrow_mut() = config;
  }

  /// Values below 1 are raised to 1.
  pub fn set_digest_ttl(&self, ttl: usize) {
    self.config.borrow_mut().digest_ttl = ttl.max(1);
  }

  pub fn digest_ttl(&self) -> usize {
    self.config.borrow().digest_ttl
  }

  pub fn set_scheduler(&self, scheduler: Rc<dyn Scheduler>) {
    *self.scheduler.borrow_mut() = Some(scheduler);
  }

  pub fn set_exception_handler(&self, handler: Rc<dyn ExceptionHandler>) {
    *self.exception_handler.borrow_mut() = Some(handler);
  }

  fn builder(&self) -> ScopeBuilder {
    let mut builder = ScopeBuilder::new().config(self.config.borrow().clone());
    if let Some(scheduler) = self.scheduler.borrow().clone() {
      builder = builder.scheduler(scheduler);
    }
    if let Some(handler) = self.exception_handler.borrow().clone() {
      builder = builder.exception_handler(handler);
    }
    builder
  }
}

impl ServiceProvider for RootScopeProvider {
  fn construct(&self) -> Annotated {
    Annotated::new(&[], |args| {
      let provider = args.this::<RootScopeProvider>()?;
      Ok(provider.builder().build())
    })
    .labelled(ROOT_SCOPE)
  }
}

/// Declares the `fibre` module, which provides `$rootScope`.
///
/// Each injector that loads the module gets its own provider and so its own
/// root scope.
pub fn register(registry: &mut ModuleRegistry) -> &mut Module {
  registry.module(MODULE_NAME, &[]).provider_type::<RootScopeProvider>(
    ROOT_SCOPE,
    Annotated::new(&[], |_| Ok(RootScopeProvider::new())),
  )
}
