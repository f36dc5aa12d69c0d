use thiserror::Error;

/// Errors raised while registering, resolving or invoking services.
#[derive(Debug, Error)]
pub enum InjectError {
  /// The name collides with a reserved identifier.
  #[error("{name} is not a valid service name")]
  InvalidName { name: String },

  /// No provider or instance is registered under `token`.
  #[error("Unknown provider: {token}Provider{}", render_tail(.path))]
  UnknownProvider { token: String, path: Vec<String> },

  /// A service was requested while it was still being constructed.
  ///
  /// `path` lists the most recent request first and ends with the
  /// service that closed the loop.
  #[error("Circular dependency found: {}", .path.join(" <- "))]
  CircularDependency { path: Vec<String> },

  /// An annotation token is not a plain name.
  #[error("Incorrect injection token! Expected a plain name, got '{token}'")]
  InvalidToken { token: String },

  /// A function declares parameters but carries no explicit token list.
  #[error("function is not using explicit annotation and cannot be invoked")]
  ImplicitAnnotation,

  /// An enforced factory produced no value.
  #[error("factory '{name}' must return a value")]
  FactoryContract { name: String },

  /// The module loader was asked for a module that was never declared.
  #[error("Module '{name}' is not available")]
  UnknownModule { name: String },

  /// A resolved value did not have the requested type.
  #[error("'{token}' does not hold a value of type {expected}")]
  TypeMismatch { token: String, expected: &'static str },

  /// An argument accessor looked past the annotated token list.
  #[error("argument index {index} is out of range for {len} injected values")]
  ArgumentOutOfRange { index: usize, len: usize },

  /// An argument accessor asked for a token the function does not list.
  #[error("'{token}' is not among the injected tokens")]
  ArgumentNotInjected { token: String },

  /// Raised by user construction code.
  #[error(transparent)]
  Custom(Box<dyn std::error::Error>),
}

impl InjectError {
  /// Wraps an arbitrary error raised inside a factory, service or block.
  pub fn custom<E: Into<Box<dyn std::error::Error>>>(error: E) -> Self {
    InjectError::Custom(error.into())
  }
}

fn render_tail(path: &[String]) -> String {
  path.iter().map(|p| format!(" <- {}", p)).collect()
}

/// A specialized `Result` type for injector operations.
pub type Result<T, E = InjectError> = std::result::Result<T, E>;
