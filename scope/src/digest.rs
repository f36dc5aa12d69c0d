//! The digest loop and the queues it drains.

use crate::error::{DigestError, Phase, Result, TaskResult};
use crate::handler::FailureSource;
use crate::scope::{QueuedTask, RootState, Scope};
use crate::watcher::Check;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Holds the hierarchy's phase for as long as it lives.
struct PhaseGuard<'a> {
  root: &'a RootState,
}

impl<'a> PhaseGuard<'a> {
  fn begin(root: &'a RootState, phase: Phase) -> Result<Self> {
    if let Some(active) = root.phase.get() {
      return Err(DigestError::Reentrancy { phase: active });
    }
    root.phase.set(Some(phase));
    Ok(Self { root })
  }
}

impl Drop for PhaseGuard<'_> {
  fn drop(&mut self) {
    self.root.phase.set(None);
  }
}

impl Scope {
  /// Runs watchers on this scope and its descendants until nothing changes.
  ///
  /// Before the first pass, a pending `apply_async` flush is cancelled and
  /// run inline. Each pass first drains the `eval_async` queue. The loop
  /// fails with [`DigestError::Runaway`] once more than `digest_ttl` extra
  /// passes would be needed. Post-digest callbacks run only after the loop
  /// converges, outside of the digest phase.
  pub fn digest(&self) -> Result<()> {
    let root = self.inner.root.clone();
    {
      let _phase = PhaseGuard::begin(&root, Phase::Digest)?;
      root.clear_last_dirty();

      // The marker stays set until the flush clears it.
      if let Some(pending) = root.apply_async_pending.get() {
        root.scheduler.cancel(pending);
        self.flush_apply_async();
      }

      let mut ttl = root.ttl;
      let mut passes = 0_usize;
      loop {
        self.drain_async_queue();
        let dirty = self.digest_once();
        passes += 1;
        let pending = !root.async_queue.borrow().is_empty();
        if !dirty && !pending {
          break;
        }
        if ttl == 0 {
          warn!(scope = self.id(), ttl = root.ttl, "digest did not converge");
          return Err(DigestError::Runaway { ttl: root.ttl });
        }
        ttl -= 1;
      }
      trace!(scope = self.id(), passes, "digest converged");
    }
    self.drain_post_digest();
    Ok(())
  }

  /// One pass over every watcher of this scope and its descendants, parents
  /// before children. Returns whether any reaction ran.
  fn digest_once(&self) -> bool {
    let root = &self.inner.root;
    let mut dirty = false;
    let mut stack = vec![self.inner.clone()];
    'scopes: while let Some(inner) = stack.pop() {
      let scope = Scope::from_inner(inner);
      let watchers = scope.inner.watchers.borrow().clone();
      for watcher in watchers {
        if !watcher.is_active() {
          continue;
        }
        match watcher.check(&scope) {
          Check::Changed { new, old } => {
            root.mark_dirty(&watcher);
            dirty = true;
            if let Err(e) = watcher.react(&new, &old, &scope) {
              root.report(FailureSource::Reaction, scope.id(), &e);
            }
          }
          // Everything after the last changed watcher was clean last pass.
          Check::Clean if root.is_last_dirty(&watcher) => break 'scopes,
          Check::Clean => {}
        }
      }
      let children = scope.inner.children.borrow().clone();
      stack.extend(children.into_iter().rev());
    }
    dirty
  }

  /// Runs `expr` in the apply phase, then digests from the root. The digest
  /// runs whatever `expr` returned.
  pub fn apply<R, F>(&self, expr: F) -> Result<R>
  where
    F: FnOnce(&Scope) -> R,
  {
    let value = {
      let _phase = PhaseGuard::begin(&self.inner.root, Phase::Apply)?;
      self.eval(expr)
    };
    self.root().digest()?;
    Ok(value)
  }

  /// Queues `expr` to run at the start of the next digest pass.
  ///
  /// If no phase is active and the queue was empty, a digest is deferred
  /// through the scheduler. It only runs if the queue is still non-empty.
  pub fn eval_async<F>(&self, expr: F)
  where
    F: FnOnce(&Scope) -> TaskResult + 'static,
  {
    let root = &self.inner.root;
    if root.phase.get().is_none() && root.async_queue.borrow().is_empty() {
      let scope = Rc::downgrade(&self.inner);
      root.scheduler.defer(Box::new(move || {
        let Some(inner) = scope.upgrade() else {
          return;
        };
        let scope = Scope::from_inner(inner);
        if scope.inner.root.async_queue.borrow().is_empty() {
          return;
        }
        if let Err(e) = scope.root().digest() {
          scope
            .inner
            .root
            .report(FailureSource::ScheduledDigest, scope.id(), &e);
        }
      }));
    }
    root
      .async_queue
      .borrow_mut()
      .push_back(QueuedTask::new(self, Box::new(expr)));
  }

  /// Queues `expr` for a coalesced apply on a later turn.
  ///
  /// All tasks queued before that turn run inside one apply. A digest that
  /// starts first cancels the deferred apply and runs the queue itself.
  pub fn apply_async<F>(&self, expr: F)
  where
    F: FnOnce(&Scope) -> TaskResult + 'static,
  {
    let root = &self.inner.root;
    root
      .apply_async_queue
      .borrow_mut()
      .push_back(QueuedTask::new(self, Box::new(expr)));
    if root.apply_async_pending.get().is_some() {
      return;
    }
    let scope = Rc::downgrade(&self.inner);
    let id = root.scheduler.defer(Box::new(move || {
      let Some(inner) = scope.upgrade() else {
        return;
      };
      let scope = Scope::from_inner(inner);
      if let Err(e) = scope.apply(|s| s.flush_apply_async()) {
        scope
          .inner
          .root
          .report(FailureSource::ScheduledDigest, scope.id(), &e);
      }
    }));
    root.apply_async_pending.set(Some(id));
  }

  /// Queues `f` to run once, after the next digest converges.
  pub fn post_digest<F>(&self, f: F)
  where
    F: FnOnce() -> TaskResult + 'static,
  {
    self
      .inner
      .root
      .post_digest_queue
      .borrow_mut()
      .push_back(Box::new(f));
  }

  /// Whether an `apply_async` flush is currently deferred.
  pub fn has_pending_apply_async(&self) -> bool {
    self.inner.root.apply_async_pending.get().is_some()
  }

  fn flush_apply_async(&self) {
    let root = &self.inner.root;
    let mut ran = 0_usize;
    loop {
      let task = root.apply_async_queue.borrow_mut().pop_front();
      let Some(task) = task else { break };
      ran += 1;
      if let Some((scope_id, Err(e))) = task.run() {
        root.report(FailureSource::ApplyAsyncTask, scope_id, &e);
      }
    }
    root.apply_async_pending.set(None);
    if ran > 0 {
      debug!(tasks = ran, "flushed apply_async queue");
    }
  }

  fn drain_async_queue(&self) {
    let root = &self.inner.root;
    loop {
      let task = root.async_queue.borrow_mut().pop_front();
      let Some(task) = task else { break };
      if let Some((scope_id, Err(e))) = task.run() {
        root.report(FailureSource::AsyncTask, scope_id, &e);
      }
    }
  }

  fn drain_post_digest(&self) {
    let root = &self.inner.root;
    loop {
      let callback = root.post_digest_queue.borrow_mut().pop_front();
      let Some(callback) = callback else { break };
      if let Err(e) = callback() {
        root.report(FailureSource::PostDigest, self.id(), &e);
      }
    }
  }
}
