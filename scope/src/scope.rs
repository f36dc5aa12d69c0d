//! Scope handles, the hierarchy and the state it shares.

use crate::error::{Phase, TaskResult};
use crate::handler::{ExceptionHandler, FailureReport, FailureSource};
use crate::scheduler::{Scheduler, TaskId};
use crate::value::Value;
use crate::watcher::{Equality, WatchHandle, Watcher};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

pub(crate) type Task = Box<dyn FnOnce(&Scope) -> TaskResult>;
pub(crate) type Callback = Box<dyn FnOnce() -> TaskResult>;

/// A task bound to the scope it was queued on. Tasks whose scope has been
/// dropped are skipped.
pub(crate) struct QueuedTask {
  scope: Weak<ScopeInner>,
  expr: Task,
}

impl QueuedTask {
  pub(crate) fn new(scope: &Scope, expr: Task) -> Self {
    Self {
      scope: Rc::downgrade(&scope.inner),
      expr,
    }
  }

  /// Runs the task, returning the id of its scope alongside the outcome.
  pub(crate) fn run(self) -> Option<(usize, TaskResult)> {
    let inner = self.scope.upgrade()?;
    let scope = Scope { inner };
    let result = (self.expr)(&scope);
    Some((scope.id(), result))
  }
}

/// State shared by every scope of one hierarchy.
pub(crate) struct RootState {
  pub(crate) ttl: usize,
  pub(crate) scheduler: Rc<dyn Scheduler>,
  handler: Rc<dyn ExceptionHandler>,
  pub(crate) phase: Cell<Option<Phase>>,
  last_dirty: RefCell<Option<Weak<Watcher>>>,
  pub(crate) async_queue: RefCell<VecDeque<QueuedTask>>,
  pub(crate) apply_async_queue: RefCell<VecDeque<QueuedTask>>,
  pub(crate) apply_async_pending: Cell<Option<TaskId>>,
  pub(crate) post_digest_queue: RefCell<VecDeque<Callback>>,
  root: RefCell<Weak<ScopeInner>>,
  next_id: Cell<usize>,
}

impl RootState {
  fn next_id(&self) -> usize {
    let id = self.next_id.get();
    self.next_id.set(id + 1);
    id
  }

  pub(crate) fn mark_dirty(&self, watcher: &Rc<Watcher>) {
    *self.last_dirty.borrow_mut() = Some(Rc::downgrade(watcher));
  }

  pub(crate) fn is_last_dirty(&self, watcher: &Rc<Watcher>) -> bool {
    match self.last_dirty.borrow().as_ref() {
      Some(last) => std::ptr::eq(last.as_ptr(), Rc::as_ptr(watcher)),
      None => false,
    }
  }

  pub(crate) fn clear_last_dirty(&self) {
    *self.last_dirty.borrow_mut() = None;
  }

  pub(crate) fn report(&self, source: FailureSource, scope_id: usize, error: &dyn fmt::Display) {
    self.handler.handle(&FailureReport {
      source,
      scope_id,
      message: error.to_string(),
    });
  }
}

pub(crate) struct ScopeInner {
  id: usize,
  isolate: bool,
  parent: Option<Weak<ScopeInner>>,
  pub(crate) root: Rc<RootState>,
  props: RefCell<HashMap<String, Value>>,
  // Newest first.
  pub(crate) watchers: RefCell<Vec<Rc<Watcher>>>,
  pub(crate) children: RefCell<Vec<Rc<ScopeInner>>>,
  destroy_listeners: RefCell<Vec<Box<dyn FnOnce(&Scope)>>>,
  destroyed: Cell<bool>,
}

impl ScopeInner {
  fn new(id: usize, parent: Option<Weak<ScopeInner>>, isolate: bool, root: Rc<RootState>) -> Self {
    Self {
      id,
      isolate,
      parent,
      root,
      props: RefCell::new(HashMap::new()),
      watchers: RefCell::new(Vec::new()),
      children: RefCell::new(Vec::new()),
      destroy_listeners: RefCell::new(Vec::new()),
      destroyed: Cell::new(false),
    }
  }
}

/// A handle to one scope of a hierarchy.
///
/// Cloning the handle is cheap and refers to the same scope. A parent keeps
/// its children alive until they are destroyed; children only hold a weak
/// reference to their parent.
#[derive(Clone)]
pub struct Scope {
  pub(crate) inner: Rc<ScopeInner>,
}

impl fmt::Debug for Scope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Scope")
      .field("id", &self.inner.id)
      .field("isolate", &self.inner.isolate)
      .field("watchers", &self.inner.watchers.borrow().len())
      .field("children", &self.inner.children.borrow().len())
      .field("phase", &self.inner.root.phase.get())
      .finish()
  }
}

impl Scope {
  pub(crate) fn new_root(
    ttl: usize,
    scheduler: Rc<dyn Scheduler>,
    handler: Rc<dyn ExceptionHandler>,
  ) -> Scope {
    let state = Rc::new(RootState {
      ttl,
      scheduler,
      handler,
      phase: Cell::new(None),
      last_dirty: RefCell::new(None),
      async_queue: RefCell::new(VecDeque::new()),
      apply_async_queue: RefCell::new(VecDeque::new()),
      apply_async_pending: Cell::new(None),
      post_digest_queue: RefCell::new(VecDeque::new()),
      root: RefCell::new(Weak::new()),
      next_id: Cell::new(0),
    });
    let inner = Rc::new(ScopeInner::new(state.next_id(), None, false, state.clone()));
    *state.root.borrow_mut() = Rc::downgrade(&inner);
    debug!(ttl, "created root scope");
    Scope { inner }
  }

  pub(crate) fn from_inner(inner: Rc<ScopeInner>) -> Scope {
    Scope { inner }
  }

  /// A number unique within the hierarchy. The root is `0`.
  pub fn id(&self) -> usize {
    self.inner.id
  }

  pub fn ptr_eq(&self, other: &Scope) -> bool {
    Rc::ptr_eq(&self.inner, &other.inner)
  }

  pub fn is_root(&self) -> bool {
    self.inner.parent.is_none()
  }

  pub fn is_isolate(&self) -> bool {
    self.inner.isolate
  }

  pub fn is_destroyed(&self) -> bool {
    self.inner.destroyed.get()
  }

  pub fn parent(&self) -> Option<Scope> {
    self
      .inner
      .parent
      .as_ref()
      .and_then(Weak::upgrade)
      .map(Scope::from_inner)
  }

  /// The root of the hierarchy, or the highest ancestor still alive if the
  /// root handle has been dropped.
  pub fn root(&self) -> Scope {
    if let Some(root) = self.inner.root.root.borrow().upgrade() {
      return Scope::from_inner(root);
    }
    let mut current = self.clone();
    while let Some(parent) = current.parent() {
      current = parent;
    }
    current
  }

  /// The phase the hierarchy is currently in, if any.
  pub fn phase(&self) -> Option<Phase> {
    self.inner.root.phase.get()
  }

  pub fn digest_ttl(&self) -> usize {
    self.inner.root.ttl
  }

  // --- Hierarchy ---

  /// Creates a child that inherits property lookups from this scope.
  pub fn new_child(&self) -> Scope {
    self.spawn_child(false)
  }

  /// Creates a child that does not inherit properties. It is still digested
  /// with its parent.
  pub fn new_isolate(&self) -> Scope {
    self.spawn_child(true)
  }

  fn spawn_child(&self, isolate: bool) -> Scope {
    let root = self.inner.root.clone();
    let id = root.next_id();
    let child = Rc::new(ScopeInner::new(
      id,
      Some(Rc::downgrade(&self.inner)),
      isolate,
      root,
    ));
    self.inner.children.borrow_mut().push(child.clone());
    trace!(parent = self.inner.id, child = id, isolate, "created child scope");
    Scope::from_inner(child)
  }

  pub fn children(&self) -> Vec<Scope> {
    self
      .inner
      .children
      .borrow()
      .iter()
      .cloned()
      .map(Scope::from_inner)
      .collect()
  }

  /// Registers a callback run once when this scope is destroyed.
  pub fn on_destroy<F>(&self, f: F)
  where
    F: FnOnce(&Scope) + 'static,
  {
    self.inner.destroy_listeners.borrow_mut().push(Box::new(f));
  }

  /// Destroys this scope and its descendants: destroy listeners run, all
  /// watchers are removed and the scope is detached from its parent.
  /// Destroying twice is a no-op.
  pub fn destroy(&self) {
    if self.inner.destroyed.replace(true) {
      return;
    }
    let listeners = std::mem::take(&mut *self.inner.destroy_listeners.borrow_mut());
    for listener in listeners {
      listener(self);
    }
    let children = std::mem::take(&mut *self.inner.children.borrow_mut());
    for child in children {
      Scope::from_inner(child).destroy();
    }
    if let Some(parent) = self.parent() {
      parent
        .inner
        .children
        .borrow_mut()
        .retain(|c| !Rc::ptr_eq(c, &self.inner));
    }
    for watcher in self.inner.watchers.borrow_mut().drain(..) {
      watcher.deactivate();
    }
    self.inner.root.clear_last_dirty();
    debug!(scope = self.inner.id, "destroyed scope");
  }

  // --- Properties ---

  /// Looks `name` up on this scope, then on its ancestors unless this scope
  /// is isolated. Missing names are `Undefined`.
  pub fn get(&self, name: &str) -> Value {
    if let Some(value) = self.inner.props.borrow().get(name) {
      return value.clone();
    }
    if self.inner.isolate {
      return Value::Undefined;
    }
    match self.parent() {
      Some(parent) => parent.get(name),
      None => Value::Undefined,
    }
  }

  /// Sets `name` on this scope, shadowing any inherited value.
  pub fn set(&self, name: &str, value: impl Into<Value>) {
    self
      .inner
      .props
      .borrow_mut()
      .insert(name.to_owned(), value.into());
  }

  pub fn has_own(&self, name: &str) -> bool {
    self.inner.props.borrow().contains_key(name)
  }

  pub fn remove(&self, name: &str) -> Option<Value> {
    self.inner.props.borrow_mut().remove(name)
  }

  // --- Evaluation ---

  /// Runs `expr` against this scope and returns its result.
  pub fn eval<R, F>(&self, expr: F) -> R
  where
    F: FnOnce(&Scope) -> R,
  {
    expr(self)
  }

  /// Like [`Scope::eval`], with extra named values visible to `expr`.
  pub fn eval_with<R, F>(&self, expr: F, locals: &HashMap<String, Value>) -> R
  where
    F: FnOnce(&Scope, &HashMap<String, Value>) -> R,
  {
    expr(self, locals)
  }

  // --- Watching ---

  /// Registers a watcher. `react` runs during a digest whenever `read`
  /// produces a value not equal to the previous one, and once on the first
  /// digest with old and new values identical.
  pub fn watch<R, L>(&self, read: R, react: L, equality: Equality) -> WatchHandle
  where
    R: Fn(&Scope) -> Value + 'static,
    L: FnMut(&Value, &Value, &Scope) -> TaskResult + 'static,
  {
    let watcher = Rc::new(Watcher::new(Box::new(read), Box::new(react), equality));
    self.inner.watchers.borrow_mut().insert(0, watcher.clone());
    self.inner.root.clear_last_dirty();
    trace!(scope = self.inner.id, ?equality, "registered watcher");

    let scope = Rc::downgrade(&self.inner);
    let target = Rc::downgrade(&watcher);
    WatchHandle::new(move || {
      let Some(watcher) = target.upgrade() else {
        return;
      };
      watcher.deactivate();
      if let Some(inner) = scope.upgrade() {
        inner
          .watchers
          .borrow_mut()
          .retain(|w| !Rc::ptr_eq(w, &watcher));
        inner.root.clear_last_dirty();
      }
    })
  }

  /// Number of watchers registered directly on this scope.
  pub fn watcher_count(&self) -> usize {
    self.inner.watchers.borrow().len()
  }
}
