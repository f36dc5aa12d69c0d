//! The dynamic values watchers observe.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

/// A dynamically typed value held in scope properties and produced by
/// watch expressions.
///
/// Lists and maps are shared, mutable containers: cloning a `Value` clones
/// the handle, not the contents. Use [`Value::deep_clone`] for an
/// independent copy.
#[derive(Clone, Default)]
pub enum Value {
  #[default]
  Undefined,
  Null,
  Bool(bool),
  Number(f64),
  String(Rc<str>),
  List(Rc<RefCell<Vec<Value>>>),
  Map(Rc<RefCell<BTreeMap<String, Value>>>),
}

impl Value {
  pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Self {
    Value::List(Rc::new(RefCell::new(items.into_iter().collect())))
  }

  pub fn map<K, I>(entries: I) -> Self
  where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
  {
    Value::Map(Rc::new(RefCell::new(
      entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
    )))
  }

  pub fn is_undefined(&self) -> bool {
    matches!(self, Value::Undefined)
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Value::Bool(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_number(&self) -> Option<f64> {
    match self {
      Value::Number(n) => Some(*n),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(&**s),
      _ => None,
    }
  }

  /// Number of elements in a list or entries in a map.
  pub fn len(&self) -> Option<usize> {
    match self {
      Value::List(items) => Some(items.borrow().len()),
      Value::Map(entries) => Some(entries.borrow().len()),
      _ => None,
    }
  }

  /// Element `index` of a list, `Undefined` otherwise.
  pub fn at(&self, index: usize) -> Value {
    match self {
      Value::List(items) => items.borrow().get(index).cloned().unwrap_or_default(),
      _ => Value::Undefined,
    }
  }

  /// Entry `key` of a map, `Undefined` otherwise.
  pub fn key(&self, key: &str) -> Value {
    match self {
      Value::Map(entries) => entries.borrow().get(key).cloned().unwrap_or_default(),
      _ => Value::Undefined,
    }
  }

  /// Appends to a list in place. Returns `false` if this is not a list.
  pub fn push(&self, item: impl Into<Value>) -> bool {
    match self {
      Value::List(items) => {
        items.borrow_mut().push(item.into());
        true
      }
      _ => false,
    }
  }

  /// Sets a map entry in place. Returns `false` if this is not a map.
  pub fn insert(&self, key: impl Into<String>, item: impl Into<Value>) -> bool {
    match self {
      Value::Map(entries) => {
        entries.borrow_mut().insert(key.into(), item.into());
        true
      }
      _ => false,
    }
  }

  /// Reference equality: scalars compare by value, containers by identity.
  /// `NaN` equals `NaN`.
  pub fn same(&self, other: &Value) -> bool {
    match (self, other) {
      (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
      (Value::Bool(a), Value::Bool(b)) => a == b,
      (Value::Number(a), Value::Number(b)) => numbers_equal(*a, *b),
      (Value::String(a), Value::String(b)) => a == b,
      (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
      (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
      _ => false,
    }
  }

  /// Structural equality over nested contents. `NaN` equals `NaN`.
  ///
  /// Containers that hold themselves compare equal when their structure
  /// matches; a pair already under comparison is assumed equal.
  pub fn deep_eq(&self, other: &Value) -> bool {
    self.deep_eq_seen(other, &mut HashSet::new())
  }

  fn deep_eq_seen(&self, other: &Value, seen: &mut HashSet<(usize, usize)>) -> bool {
    match (self, other) {
      (Value::List(a), Value::List(b)) => {
        if Rc::ptr_eq(a, b) || !seen.insert((addr(a), addr(b))) {
          return true;
        }
        let (a, b) = (a.borrow(), b.borrow());
        a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.deep_eq_seen(y, seen))
      }
      (Value::Map(a), Value::Map(b)) => {
        if Rc::ptr_eq(a, b) || !seen.insert((addr(a), addr(b))) {
          return true;
        }
        let (a, b) = (a.borrow(), b.borrow());
        a.len() == b.len()
          && a
            .iter()
            .zip(b.iter())
            .all(|((ka, va), (kb, vb))| ka == kb && va.deep_eq_seen(vb, seen))
      }
      _ => self.same(other),
    }
  }

  /// Copies nested containers so later mutation of the original is not
  /// visible in the copy. Shared and cyclic containers stay shared and
  /// cyclic within the copy.
  pub fn deep_clone(&self) -> Value {
    self.deep_clone_seen(&mut HashMap::new())
  }

  fn deep_clone_seen(&self, copies: &mut HashMap<usize, Value>) -> Value {
    match self {
      Value::List(items) => {
        if let Some(copy) = copies.get(&addr(items)) {
          return copy.clone();
        }
        let target = Rc::new(RefCell::new(Vec::new()));
        copies.insert(addr(items), Value::List(target.clone()));
        let cloned: Vec<Value> = items
          .borrow()
          .iter()
          .map(|v| v.deep_clone_seen(copies))
          .collect();
        *target.borrow_mut() = cloned;
        Value::List(target)
      }
      Value::Map(entries) => {
        if let Some(copy) = copies.get(&addr(entries)) {
          return copy.clone();
        }
        let target = Rc::new(RefCell::new(BTreeMap::new()));
        copies.insert(addr(entries), Value::Map(target.clone()));
        let cloned: BTreeMap<String, Value> = entries
          .borrow()
          .iter()
          .map(|(k, v)| (k.clone(), v.deep_clone_seen(copies)))
          .collect();
        *target.borrow_mut() = cloned;
        Value::Map(target)
      }
      other => other.clone(),
    }
  }

  /// JSON rendering. A container reached again through itself renders as
  /// `null`.
  pub fn to_json(&self) -> serde_json::Value {
    self.to_json_path(&mut Vec::new())
  }

  fn to_json_path(&self, path: &mut Vec<usize>) -> serde_json::Value {
    match self {
      Value::Undefined | Value::Null => serde_json::Value::Null,
      Value::Bool(b) => serde_json::Value::Bool(*b),
      Value::Number(n) => serde_json::Number::from_f64(*n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null),
      Value::String(s) => serde_json::Value::String(s.to_string()),
      Value::List(items) => {
        if path.contains(&addr(items)) {
          return serde_json::Value::Null;
        }
        path.push(addr(items));
        let json = items.borrow().iter().map(|v| v.to_json_path(path)).collect();
        path.pop();
        serde_json::Value::Array(json)
      }
      Value::Map(entries) => {
        if path.contains(&addr(entries)) {
          return serde_json::Value::Null;
        }
        path.push(addr(entries));
        let json = entries
          .borrow()
          .iter()
          .map(|(k, v)| (k.clone(), v.to_json_path(path)))
          .collect();
        path.pop();
        serde_json::Value::Object(json)
      }
    }
  }
}

fn addr<T>(container: &Rc<T>) -> usize {
  Rc::as_ptr(container) as *const () as usize
}

fn numbers_equal(a: f64, b: f64) -> bool {
  a == b || (a.is_nan() && b.is_nan())
}

/// Deep equality, matching [`Value::deep_eq`].
impl PartialEq for Value {
  fn eq(&self, other: &Self) -> bool {
    self.deep_eq(other)
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Undefined => write!(f, "undefined"),
      Value::String(s) => write!(f, "{}", s),
      other => write!(f, "{}", other.to_json()),
    }
  }
}

/// Nested containers print once per path; a container reached again
/// through itself prints as `[Circular]`.
impl fmt::Debug for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let path = RefCell::new(Vec::new());
    Tracked { value: self, path: &path }.fmt(f)
  }
}

struct Tracked<'a> {
  value: &'a Value,
  path: &'a RefCell<Vec<usize>>,
}

struct TrackedItems<'a> {
  items: &'a [Value],
  path: &'a RefCell<Vec<usize>>,
}

struct TrackedEntries<'a> {
  entries: &'a BTreeMap<String, Value>,
  path: &'a RefCell<Vec<usize>>,
}

impl fmt::Debug for Tracked<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let path = self.path;
    let id = match self.value {
      Value::Undefined => return f.write_str("Undefined"),
      Value::Null => return f.write_str("Null"),
      Value::Bool(b) => return f.debug_tuple("Bool").field(b).finish(),
      Value::Number(n) => return f.debug_tuple("Number").field(n).finish(),
      Value::String(s) => return f.debug_tuple("String").field(s).finish(),
      Value::List(items) => addr(items),
      Value::Map(entries) => addr(entries),
    };
    if path.borrow().contains(&id) {
      return f.write_str("[Circular]");
    }
    path.borrow_mut().push(id);
    let result = match self.value {
      Value::List(items) => {
        let items = items.borrow();
        f.debug_tuple("List")
          .field(&TrackedItems { items: &items, path })
          .finish()
      }
      Value::Map(entries) => {
        let entries = entries.borrow();
        f.debug_tuple("Map")
          .field(&TrackedEntries { entries: &entries, path })
          .finish()
      }
      _ => Ok(()),
    };
    path.borrow_mut().pop();
    result
  }
}

impl fmt::Debug for TrackedItems<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list()
      .entries(self.items.iter().map(|value| Tracked { value, path: self.path }))
      .finish()
  }
}

impl fmt::Debug for TrackedEntries<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_map()
      .entries(
        self
          .entries
          .iter()
          .map(|(k, value)| (k, Tracked { value, path: self.path })),
      )
      .finish()
  }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self {
    Value::Bool(b)
  }
}

impl From<f64> for Value {
  fn from(n: f64) -> Self {
    Value::Number(n)
  }
}

impl From<i32> for Value {
  fn from(n: i32) -> Self {
    Value::Number(f64::from(n))
  }
}

impl From<u32> for Value {
  fn from(n: u32) -> Self {
    Value::Number(f64::from(n))
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Value::String(Rc::from(s))
  }
}

impl From<String> for Value {
  fn from(s: String) -> Self {
    Value::String(Rc::from(s))
  }
}

impl From<Vec<Value>> for Value {
  fn from(items: Vec<Value>) -> Self {
    Value::list(items)
  }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(value: Option<T>) -> Self {
    value.map(Into::into).unwrap_or(Value::Null)
  }
}

impl From<serde_json::Value> for Value {
  fn from(json: serde_json::Value) -> Self {
    match json {
      serde_json::Value::Null => Value::Null,
      serde_json::Value::Bool(b) => Value::Bool(b),
      serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
      serde_json::Value::String(s) => Value::from(s),
      serde_json::Value::Array(items) => Value::list(items.into_iter().map(Value::from)),
      serde_json::Value::Object(entries) => {
        Value::map(entries.into_iter().map(|(k, v)| (k, Value::from(v))))
      }
    }
  }
}
