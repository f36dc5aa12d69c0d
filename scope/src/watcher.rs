//! Watch expressions and their memoised last values.

use crate::error::TaskResult;
use crate::scope::Scope;
use crate::value::Value;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// A watch expression.
pub type ReadFn = Box<dyn Fn(&Scope) -> Value>;

pub(crate) type ReactFn = Box<dyn FnMut(&Value, &Value, &Scope) -> TaskResult>;

/// Boxes a watch expression, mainly for [`Scope::watch_group`].
pub fn read<F>(f: F) -> ReadFn
where
  F: Fn(&Scope) -> Value + 'static,
{
  Box::new(f)
}

/// How a watcher decides that its value changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Equality {
  /// Containers compare by identity, scalars by value.
  #[default]
  Reference,
  /// Nested contents compare structurally. The memo is a deep copy, so
  /// in-place mutation is detected.
  Deep,
}

impl Equality {
  pub fn equal(self, a: &Value, b: &Value) -> bool {
    match self {
      Equality::Reference => a.same(b),
      Equality::Deep => a.deep_eq(b),
    }
  }
}

pub(crate) enum Check {
  Clean,
  Changed { new: Value, old: Value },
}

pub(crate) struct Watcher {
  read: ReadFn,
  react: RefCell<ReactFn>,
  equality: Equality,
  // `None` until the first evaluation.
  last: RefCell<Option<Value>>,
  active: Cell<bool>,
}

impl Watcher {
  pub(crate) fn new(read: ReadFn, react: ReactFn, equality: Equality) -> Self {
    Self {
      read,
      react: RefCell::new(react),
      equality,
      last: RefCell::new(None),
      active: Cell::new(true),
    }
  }

  pub(crate) fn is_active(&self) -> bool {
    self.active.get()
  }

  pub(crate) fn deactivate(&self) {
    self.active.set(false);
  }

  /// Evaluates the expression and updates the memo if the value changed.
  /// On the first evaluation the old value equals the new one.
  pub(crate) fn check(&self, scope: &Scope) -> Check {
    let new = (self.read)(scope);
    let mut last = self.last.borrow_mut();
    let old = match last.as_ref() {
      Some(previous) if self.equality.equal(&new, previous) => return Check::Clean,
      Some(previous) => previous.clone(),
      None => new.clone(),
    };
    *last = Some(match self.equality {
      Equality::Deep => new.deep_clone(),
      Equality::Reference => new.clone(),
    });
    Check::Changed { new, old }
  }

  pub(crate) fn react(&self, new: &Value, old: &Value, scope: &Scope) -> TaskResult {
    let mut react = self.react.borrow_mut();
    (*react)(new, old, scope)
  }
}

/// Removes a watcher (or a group of them) from its scope.
///
/// Dropping the handle does not deregister anything. Deregistering twice is
/// a no-op.
#[derive(Clone)]
pub struct WatchHandle {
  deregister: Rc<dyn Fn()>,
}

impl fmt::Debug for WatchHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WatchHandle").finish_non_exhaustive()
  }
}

impl WatchHandle {
  pub(crate) fn new<F>(deregister: F) -> Self
  where
    F: Fn() + 'static,
  {
    Self {
      deregister: Rc::new(deregister),
    }
  }

  pub fn deregister(&self) {
    (self.deregister)()
  }
}
