use crate::error::TaskResult;
use crate::scope::Scope;
use crate::value::Value;
use crate::watcher::{Equality, ReadFn, WatchHandle};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

type GroupListener = Rc<RefCell<dyn FnMut(&[Value], &[Value], &Scope) -> TaskResult>>;

struct GroupState {
  new_values: RefCell<Vec<Value>>,
  old_values: RefCell<Vec<Value>>,
  first_run: Cell<bool>,
  scheduled: Cell<bool>,
}

impl Scope {
  /// Watches several expressions with one listener.
  ///
  /// However many expressions change in a pass, the listener runs once, from
  /// the async queue, with the latest values of every expression. On its
  /// first run the old values are the new values. An empty group calls the
  /// listener once with empty slices unless deregistered first.
  pub fn watch_group<L>(&self, reads: Vec<ReadFn>, listener: L) -> WatchHandle
  where
    L: FnMut(&[Value], &[Value], &Scope) -> TaskResult + 'static,
  {
    let listener: GroupListener = Rc::new(RefCell::new(listener));

    if reads.is_empty() {
      let should_call = Rc::new(Cell::new(true));
      let gate = should_call.clone();
      self.eval_async(move |scope| {
        if !gate.get() {
          return Ok(());
        }
        let mut listener = listener.borrow_mut();
        (*listener)(&[], &[], scope)
      });
      return WatchHandle::new(move || should_call.set(false));
    }

    let state = Rc::new(GroupState {
      new_values: RefCell::new(vec![Value::Undefined; reads.len()]),
      old_values: RefCell::new(vec![Value::Undefined; reads.len()]),
      first_run: Cell::new(true),
      scheduled: Cell::new(false),
    });

    let handles: Vec<WatchHandle> = reads
      .into_iter()
      .enumerate()
      .map(|(index, read)| {
        let state = state.clone();
        let listener = listener.clone();
        self.watch(
          read,
          move |new, old, scope| {
            state.new_values.borrow_mut()[index] = new.clone();
            state.old_values.borrow_mut()[index] = old.clone();
            if !state.scheduled.replace(true) {
              let state = state.clone();
              let listener = listener.clone();
              scope.eval_async(move |scope| run_listener(&state, &listener, scope));
            }
            Ok(())
          },
          Equality::Reference,
        )
      })
      .collect();

    WatchHandle::new(move || {
      for handle in &handles {
        handle.deregister();
      }
    })
  }
}

fn run_listener(state: &GroupState, listener: &GroupListener, scope: &Scope) -> TaskResult {
  state.scheduled.set(false);
  let new_values = state.new_values.borrow().clone();
  let old_values = if state.first_run.replace(false) {
    new_values.clone()
  } else {
    state.old_values.borrow().clone()
  };
  let mut listener = listener.borrow_mut();
  (*listener)(&new_values, &old_values, scope)
}
