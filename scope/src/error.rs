use std::fmt;
use thiserror::Error;

/// Errors returned by user callbacks. They are reported, never propagated.
pub type BoxError = Box<dyn std::error::Error>;

/// The result type of reactions, queued tasks and post-digest callbacks.
pub type TaskResult = std::result::Result<(), BoxError>;

/// The exclusive phase a scope hierarchy can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Digest,
  Apply,
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Phase::Digest => write!(f, "$digest"),
      Phase::Apply => write!(f, "$apply"),
    }
  }
}

/// Fatal digest and apply failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DigestError {
  /// A digest or apply was started while `phase` was already running.
  #[error("{phase} already in progress")]
  Reentrancy { phase: Phase },

  /// Watchers kept changing after `ttl` extra passes.
  #[error("{ttl} digest iterations reached")]
  Runaway { ttl: usize },
}

/// Errors raised while loading a [`ScopeConfig`](crate::ScopeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("Failed to parse configuration: {0}")]
  Parse(#[from] serde_yaml::Error),

  #[error("Invalid configuration value for '{field}': {message}")]
  InvalidValue { field: String, message: String },
}

/// A specialized `Result` type for digest operations.
pub type Result<T, E = DigestError> = std::result::Result<T, E>;
