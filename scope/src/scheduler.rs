use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;

/// Identifies a deferred task so it can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

pub type DeferredTask = Box<dyn FnOnce()>;

/// Runs tasks on a later turn of the host event loop.
///
/// `defer` must never run the task before returning.
pub trait Scheduler {
  fn defer(&self, task: DeferredTask) -> TaskId;

  /// Returns `true` if the task was still pending and will not run.
  fn cancel(&self, id: TaskId) -> bool;
}

/// A manually driven FIFO scheduler.
///
/// Each call to [`DeferQueue::run_pending`] is one "turn": it runs the tasks
/// that were pending when the turn started. Tasks deferred during a turn
/// wait for the next one.
#[derive(Default)]
pub struct DeferQueue {
  next_id: Cell<u64>,
  tasks: RefCell<VecDeque<(TaskId, DeferredTask)>>,
}

impl fmt::Debug for DeferQueue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DeferQueue")
      .field("pending", &self.len())
      .finish()
  }
}

impl DeferQueue {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.tasks.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.tasks.borrow().is_empty()
  }

  /// Runs one turn. Returns how many tasks ran.
  pub fn run_pending(&self) -> usize {
    let boundary = TaskId(self.next_id.get());
    let mut ran = 0;
    loop {
      let next = {
        let mut tasks = self.tasks.borrow_mut();
        match tasks.front() {
          Some((id, _)) if *id < boundary => tasks.pop_front(),
          _ => None,
        }
      };
      let Some((_, task)) = next else { break };
      task();
      ran += 1;
    }
    ran
  }

  /// Runs turns until no task is pending. Returns how many tasks ran.
  pub fn run_until_idle(&self) -> usize {
    let mut total = 0;
    loop {
      let ran = self.run_pending();
      if ran == 0 {
        return total;
      }
      total += ran;
    }
  }
}

impl Scheduler for DeferQueue {
  fn defer(&self, task: DeferredTask) -> TaskId {
    let id = TaskId(self.next_id.get());
    self.next_id.set(id.0 + 1);
    self.tasks.borrow_mut().push_back((id, task));
    id
  }

  fn cancel(&self, id: TaskId) -> bool {
    let mut tasks = self.tasks.borrow_mut();
    match tasks.iter().position(|(queued, _)| *queued == id) {
      Some(index) => {
        tasks.remove(index);
        true
      }
      None => false,
    }
  }
}

/// Defers tasks onto the current Tokio `LocalSet` with `spawn_local`.
#[cfg(feature = "tokio")]
#[derive(Default)]
pub struct TokioLocalScheduler {
  next_id: Cell<u64>,
  handles: std::rc::Rc<RefCell<std::collections::HashMap<TaskId, tokio::task::JoinHandle<()>>>>,
}

#[cfg(feature = "tokio")]
impl TokioLocalScheduler {
  pub fn new() -> Self {
    Self::default()
  }
}

#[cfg(feature = "tokio")]
impl Scheduler for TokioLocalScheduler {
  /// # Panics
  ///
  /// Panics if called outside of a `tokio::task::LocalSet`.
  fn defer(&self, task: DeferredTask) -> TaskId {
    let id = TaskId(self.next_id.get());
    self.next_id.set(id.0 + 1);
    let handles = self.handles.clone();
    let handle = tokio::task::spawn_local(async move {
      handles.borrow_mut().remove(&id);
      task();
    });
    self.handles.borrow_mut().insert(id, handle);
    id
  }

  fn cancel(&self, id: TaskId) -> bool {
    match self.handles.borrow_mut().remove(&id) {
      Some(handle) => {
        handle.abort();
        true
      }
      None => false,
    }
  }
}
