use crate::config::ScopeConfig;
use crate::handler::{ExceptionHandler, TracingExceptionHandler};
use crate::scheduler::{DeferQueue, Scheduler};
use crate::scope::Scope;
use std::fmt;
use std::rc::Rc;

/// Builds the root [`Scope`] of a new hierarchy.
///
/// Without an explicit scheduler the hierarchy defers onto a private
/// [`DeferQueue`]; pass a scheduler you can drive to run deferred digests.
/// Failures go to a [`TracingExceptionHandler`] unless another handler is set.
#[derive(Default)]
pub struct ScopeBuilder {
  config: ScopeConfig,
  scheduler: Option<Rc<dyn Scheduler>>,
  exception_handler: Option<Rc<dyn ExceptionHandler>>,
}

impl fmt::Debug for ScopeBuilder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ScopeBuilder")
      .field("config", &self.config)
      .finish_non_exhaustive()
  }
}

impl ScopeBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn config(mut self, config: ScopeConfig) -> Self {
    self.config = config;
    self
  }

  /// Sets the digest TTL. Values below 1 are raised to 1.
  pub fn digest_ttl(mut self, ttl: usize) -> Self {
    self.config.digest_ttl = ttl.max(1);
    self
  }

  pub fn scheduler(mut self, scheduler: Rc<dyn Scheduler>) -> Self {
    self.scheduler = Some(scheduler);
    self
  }

  pub fn exception_handler(mut self, handler: Rc<dyn ExceptionHandler>) -> Self {
    self.exception_handler = Some(handler);
    self
  }

  pub fn build(self) -> Scope {
    let scheduler = self
      .scheduler
      .unwrap_or_else(|| Rc::new(DeferQueue::new()) as Rc<dyn Scheduler>);
    let handler = self
      .exception_handler
      .unwrap_or_else(|| Rc::new(TracingExceptionHandler) as Rc<dyn ExceptionHandler>);
    Scope::new_root(self.config.digest_ttl.max(1), scheduler, handler)
  }
}
