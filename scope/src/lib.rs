//! # Fibre Scope
//!
//! Dirty-checking reactive scopes. A scope holds a bag of dynamic
//! [`Value`]s and a list of watchers; a digest re-evaluates every watcher
//! until none of them reports a change.
//!
//! ## Core Concepts
//!
//! - **Watchers** pair a read expression with a reaction. The reaction runs
//!   whenever the expression's value changes, under [`Equality::Reference`]
//!   or [`Equality::Deep`].
//! - **Digest** loops over the scope and its descendants until clean, or
//!   fails with [`DigestError::Runaway`] after the configured TTL.
//! - **Apply** runs code in the apply phase and then digests from the root.
//! - **Queues**: `eval_async` tasks run at the start of the next digest
//!   pass, `apply_async` tasks coalesce into one deferred apply, and
//!   `post_digest` callbacks run once a digest converges.
//! - **Schedulers** decide when deferred work runs. [`DeferQueue`] is a
//!   manually driven queue, useful in tests and custom event loops.
//!
//! Failures inside callbacks never abort a digest. They are handed to an
//! [`ExceptionHandler`], by default [`TracingExceptionHandler`].
//!
//! ## Quick Start
//!
//! ```
//! use fibre_scope::{DeferQueue, Equality, ScopeBuilder, Value};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let queue = Rc::new(DeferQueue::new());
//! let root = ScopeBuilder::new().scheduler(queue.clone()).build();
//! root.set("name", "fibre");
//!
//! let changes = Rc::new(Cell::new(0));
//! let counter = changes.clone();
//! root.watch(
//!   |scope| scope.get("name"),
//!   move |_new: &Value, _old: &Value, _scope| {
//!     counter.set(counter.get() + 1);
//!     Ok(())
//!   },
//!   Equality::Reference,
//! );
//!
//! root.digest().unwrap();
//! root.apply(|scope| scope.set("name", "scope")).unwrap();
//! assert_eq!(changes.get(), 2);
//! ```

mod builder;
mod config;
mod digest;
mod error;
mod group;
mod handler;
pub mod module;
mod scheduler;
mod scope;
mod value;
mod watcher;

pub use builder::ScopeBuilder;
pub use config::{ScopeConfig, DEFAULT_DIGEST_TTL};
pub use error::{BoxError, ConfigError, DigestError, Phase, Result, TaskResult};
pub use handler::{
  CollectingExceptionHandler, ExceptionHandler, FailureReport, FailureSource,
  TracingExceptionHandler,
};
#[cfg(feature = "tokio")]
pub use scheduler::TokioLocalScheduler;
pub use scheduler::{DeferQueue, DeferredTask, Scheduler, TaskId};
pub use scope::Scope;
pub use value::Value;
pub use watcher::{read, Equality, ReadFn, WatchHandle};
