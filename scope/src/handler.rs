//! Reporting of callback failures that must not abort a digest.

use std::cell::RefCell;
use std::fmt;
use tracing::error;

/// Where a reported failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureSource {
  /// A watcher's reaction.
  Reaction,
  /// A task queued with `eval_async`.
  AsyncTask,
  /// A task queued with `apply_async`.
  ApplyAsyncTask,
  /// A callback queued with `post_digest`.
  PostDigest,
  /// A digest started by the scheduler itself failed.
  ScheduledDigest,
}

impl fmt::Display for FailureSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      FailureSource::Reaction => "reaction",
      FailureSource::AsyncTask => "async_task",
      FailureSource::ApplyAsyncTask => "apply_async_task",
      FailureSource::PostDigest => "post_digest",
      FailureSource::ScheduledDigest => "scheduled_digest",
    };
    write!(f, "{}", name)
  }
}

/// One failure handed to an [`ExceptionHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
  pub source: FailureSource,
  /// Id of the scope the failing callback ran against.
  pub scope_id: usize,
  pub message: String,
}

impl fmt::Display for FailureReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[{} on scope {}] {}", self.source, self.scope_id, self.message)
  }
}

/// Receives failures from callbacks. The digest continues after every
/// report.
pub trait ExceptionHandler {
  fn handle(&self, report: &FailureReport);
}

/// The default handler: logs every report at `error` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingExceptionHandler;

impl ExceptionHandler for TracingExceptionHandler {
  fn handle(&self, report: &FailureReport) {
    error!(
      source = %report.source,
      scope = report.scope_id,
      "{}",
      report.message
    );
  }
}

/// Keeps reports in memory for later inspection.
#[derive(Debug, Default)]
pub struct CollectingExceptionHandler {
  reports: RefCell<Vec<FailureReport>>,
}

impl CollectingExceptionHandler {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn reports(&self) -> Vec<FailureReport> {
    self.reports.borrow().clone()
  }

  pub fn len(&self) -> usize {
    self.reports.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.reports.borrow().is_empty()
  }

  pub fn take(&self) -> Vec<FailureReport> {
    std::mem::take(&mut *self.reports.borrow_mut())
  }
}

impl ExceptionHandler for CollectingExceptionHandler {
  fn handle(&self, report: &FailureReport) {
    self.reports.borrow_mut().push(report.clone());
  }
}
