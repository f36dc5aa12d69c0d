//! # Fibre IoC
//!
//! A name-keyed dependency injector with lazy singletons, cycle detection
//! and module loading.
//!
//! ## Core Concepts
//!
//! - **Providers**: recipes registered under a name before any instance
//!   exists. The [`Registrar`] offers six verbs: `constant`, `value`,
//!   `factory`, `service`, `provider` and `decorator`.
//! - **Injector**: resolves a name to its value, constructing it on first
//!   use and returning the same instance afterwards. A request for a
//!   service that is still being built fails with
//!   [`InjectError::CircularDependency`], naming the whole path.
//! - **Annotations**: every injectable function carries the ordered
//!   names of its dependencies (see [`Annotated`] and [`injectable!`]).
//! - **Modules**: declared in an explicit [`ModuleRegistry`] and loaded
//!   once each, requirements first, by [`Injector::new`].
//!
//! ## Quick Start
//!
//! ```
//! use fibre_ioc::{injectable, Injector, ModuleRegistry};
//!
//! struct Greeter {
//!   message: String,
//! }
//!
//! let mut registry = ModuleRegistry::new();
//! registry
//!   .module("app", &["config"])
//!   .factory(
//!     "greeter",
//!     injectable!(["greeting" => greeting: String] {
//!       Greeter { message: format!("{}, World!", greeting) }
//!     }),
//!   );
//! registry
//!   .module("config", &[])
//!   .constant("greeting", String::from("Hello"));
//!
//! let injector = Injector::new(&registry, ["app"]).unwrap();
//! let greeter = injector.get::<Greeter>("greeter").unwrap();
//! assert_eq!(greeter.message, "Hello, World!");
//! ```

mod annotate;
mod core;
mod error;
mod injector;
mod loader;
mod macros;
mod module;
mod registrar;

pub use annotate::{Annotated, Args, Instance, Locals};
pub use crate::core::{CacheState, ServiceProvider, DELEGATE_TOKEN, INJECTOR_TOKEN, PROVIDE_TOKEN};
pub use error::{InjectError, Result};
pub use injector::Injector;
pub use module::{Module, ModuleRef, ModuleRegistry};
pub use registrar::Registrar;
