//! Dependency-annotated functions and the arguments they receive.

use crate::core::is_plain_name;
use crate::error::{InjectError, Result};
use crate::injector::Injector;
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A type-erased value held by the injector.
pub type Instance = Rc<dyn Any>;

type Body = dyn Fn(&Args<'_>) -> Result<Option<Instance>>;

/// A function together with the ordered names of the services it needs.
///
/// Token lists are taken, in priority order, from the list the function
/// was built with ([`Annotated::new`] and friends) and then from a list
/// recorded afterwards with [`Annotated::with_inject`]. A function built
/// with [`Annotated::unannotated`] and a non-zero arity has neither and
/// cannot be invoked: there is no parameter-name inference.
#[derive(Clone)]
pub struct Annotated {
  array: Option<Rc<[String]>>,
  inject: Option<Rc<[String]>>,
  arity: usize,
  label: Option<Rc<str>>,
  body: Rc<Body>,
}

fn to_tokens(tokens: &[&str]) -> Rc<[String]> {
  tokens.iter().map(|t| (*t).to_owned()).collect()
}

impl Annotated {
  fn from_body(tokens: Option<Rc<[String]>>, arity: usize, body: Rc<Body>) -> Self {
    Self {
      array: tokens,
      inject: None,
      arity,
      label: None,
      body,
    }
  }

  /// A function that always produces a value.
  pub fn new<T, F>(tokens: &[&str], f: F) -> Self
  where
    T: Any,
    F: Fn(&Args<'_>) -> Result<T> + 'static,
  {
    Self::from_body(
      Some(to_tokens(tokens)),
      tokens.len(),
      Rc::new(move |args| f(args).map(|v| Some(Rc::new(v) as Instance))),
    )
  }

  /// A function that may produce nothing.
  pub fn optional<T, F>(tokens: &[&str], f: F) -> Self
  where
    T: Any,
    F: Fn(&Args<'_>) -> Result<Option<T>> + 'static,
  {
    Self::from_body(
      Some(to_tokens(tokens)),
      tokens.len(),
      Rc::new(move |args| f(args).map(|v| v.map(|v| Rc::new(v) as Instance))),
    )
  }

  /// A function run only for its side effects, such as a config or run block.
  pub fn action<F>(tokens: &[&str], f: F) -> Self
  where
    F: Fn(&Args<'_>) -> Result<()> + 'static,
  {
    Self::from_body(
      Some(to_tokens(tokens)),
      tokens.len(),
      Rc::new(move |args| f(args).map(|_| None)),
    )
  }

  /// A function that hands back an already type-erased value, possibly nothing.
  pub fn erased<F>(tokens: &[&str], f: F) -> Self
  where
    F: Fn(&Args<'_>) -> Result<Option<Instance>> + 'static,
  {
    Self::from_body(Some(to_tokens(tokens)), tokens.len(), Rc::new(f))
  }

  /// A zero-argument function returning the same shared value on every call.
  pub fn value(value: Instance) -> Self {
    Self::from_body(None, 0, Rc::new(move |_| Ok(Some(value.clone()))))
  }

  /// A function that declares `arity` parameters without naming them.
  ///
  /// Unless `arity` is zero, it must receive names through
  /// [`Annotated::with_inject`] before it can be invoked.
  pub fn unannotated<T, F>(arity: usize, f: F) -> Self
  where
    T: Any,
    F: Fn(&Args<'_>) -> Result<T> + 'static,
  {
    Self::from_body(
      None,
      arity,
      Rc::new(move |args| f(args).map(|v| Some(Rc::new(v) as Instance))),
    )
  }

  /// Records a token list on the function itself.
  pub fn with_inject(mut self, tokens: &[&str]) -> Self {
    self.inject = Some(to_tokens(tokens));
    self
  }

  /// Attaches a human-readable label used in diagnostics.
  pub fn labelled(mut self, label: &str) -> Self {
    self.label = Some(Rc::from(label));
    self
  }

  pub fn label(&self) -> Option<&str> {
    self.label.as_deref()
  }

  /// Returns the ordered token names this function depends on.
  pub fn annotate(&self) -> Result<Vec<String>> {
    if let Some(tokens) = self.array.as_ref().or(self.inject.as_ref()) {
      return Ok(tokens.to_vec());
    }
    if self.arity == 0 {
      return Ok(Vec::new());
    }
    Err(InjectError::ImplicitAnnotation)
  }

  pub(crate) fn call(&self, args: &Args<'_>) -> Result<Option<Instance>> {
    (self.body)(args)
  }
}

impl fmt::Debug for Annotated {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Annotated")
      .field("label", &self.label)
      .field("array", &self.array)
      .field("inject", &self.inject)
      .field("arity", &self.arity)
      .finish_non_exhaustive()
  }
}

/// Values injected by name, consulted before the injector itself.
#[derive(Default, Clone)]
pub struct Locals {
  values: HashMap<String, Instance>,
}

impl Locals {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with<T: Any>(mut self, name: &str, value: T) -> Self {
    self.insert(name, value);
    self
  }

  pub fn with_instance(mut self, name: &str, value: Instance) -> Self {
    self.insert_instance(name, value);
    self
  }

  pub fn insert<T: Any>(&mut self, name: &str, value: T) {
    self.insert_instance(name, Rc::new(value));
  }

  pub fn insert_instance(&mut self, name: &str, value: Instance) {
    self.values.insert(name.to_owned(), value);
  }

  pub fn get(&self, name: &str) -> Option<&Instance> {
    self.values.get(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.values.contains_key(name)
  }
}

/// The resolved arguments of one invocation, in declared order.
pub struct Args<'a> {
  tokens: &'a [String],
  values: Vec<Instance>,
  this: Option<&'a Instance>,
  injector: &'a Injector,
}

fn downcast<T: Any>(token: &str, value: &Instance) -> Result<Rc<T>> {
  Rc::clone(value)
    .downcast::<T>()
    .map_err(|_| InjectError::TypeMismatch {
      token: token.to_owned(),
      expected: type_name::<T>(),
    })
}

impl<'a> Args<'a> {
  pub(crate) fn new(
    tokens: &'a [String],
    values: Vec<Instance>,
    this: Option<&'a Instance>,
    injector: &'a Injector,
  ) -> Self {
    debug_assert_eq!(tokens.len(), values.len());
    Self {
      tokens,
      values,
      this,
      injector,
    }
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn tokens(&self) -> &[String] {
    self.tokens
  }

  /// The untyped value at `index`.
  pub fn instance(&self, index: usize) -> Result<&Instance> {
    self
      .values
      .get(index)
      .ok_or(InjectError::ArgumentOutOfRange {
        index,
        len: self.values.len(),
      })
  }

  /// The value at `index`, downcast to `T`.
  pub fn get<T: Any>(&self, index: usize) -> Result<Rc<T>> {
    let value = self.instance(index)?;
    downcast(&self.tokens[index], value)
  }

  /// The value injected for `token`, downcast to `T`.
  pub fn named<T: Any>(&self, token: &str) -> Result<Rc<T>> {
    let index = self
      .tokens
      .iter()
      .position(|t| t == token)
      .ok_or_else(|| InjectError::ArgumentNotInjected {
        token: token.to_owned(),
      })?;
    self.get(index)
  }

  /// The value this invocation is bound to, downcast to `T`.
  pub fn this<T: Any>(&self) -> Result<Rc<T>> {
    match self.this {
      Some(value) => downcast("this", value),
      None => Err(InjectError::TypeMismatch {
        token: "this".to_owned(),
        expected: type_name::<T>(),
      }),
    }
  }

  pub fn this_instance(&self) -> Option<&Instance> {
    self.this
  }

  /// The injector performing this invocation.
  pub fn injector(&self) -> &Injector {
    self.injector
  }
}

/// Checks every token of an annotation before anything is resolved.
pub(crate) fn check_tokens(tokens: &[String]) -> Result<()> {
  match tokens.iter().find(|t| !is_plain_name(t)) {
    Some(bad) => Err(InjectError::InvalidToken { token: bad.clone() }),
    None => Ok(()),
  }
}
