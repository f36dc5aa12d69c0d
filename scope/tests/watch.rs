use fibre_scope::{
  CollectingExceptionHandler, DeferQueue, Equality, FailureSource, Scope, ScopeBuilder, Value,
  WatchHandle,
};
use pretty_assertions::assert_eq;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// --- Test Fixtures ---

fn setup() -> (Scope, Rc<DeferQueue>, Rc<CollectingExceptionHandler>) {
  let queue = Rc::new(DeferQueue::new());
  let handler = Rc::new(CollectingExceptionHandler::new());
  let root = ScopeBuilder::new()
    .scheduler(queue.clone())
    .exception_handler(handler.clone())
    .build();
  (root, queue, handler)
}

fn counting_watch(scope: &Scope, name: &'static str, equality: Equality) -> Rc<Cell<u32>> {
  let count = Rc::new(Cell::new(0));
  let counter = count.clone();
  scope.watch(
    move |s| s.get(name),
    move |_, _, _| {
      counter.set(counter.get() + 1);
      Ok(())
    },
    equality,
  );
  count
}

// --- Watch Tests ---

#[test]
fn test_reaction_sees_new_value_after_digest() {
  // Arrange
  let (root, _queue, _handler) = setup();
  root.watch(
    |s| s.get("value"),
    |new, _, s| {
      s.set("last", new.clone());
      Ok(())
    },
    Equality::Reference,
  );
  root.set("value", 5);

  // Act
  root.digest().unwrap();

  // Assert
  assert_eq!(root.get("last"), Value::from(5));
}

#[test]
fn test_first_evaluation_reports_new_value_as_old() {
  let (root, _queue, _handler) = setup();
  root.set("value", "initial");
  let seen: Rc<RefCell<Vec<(Value, Value)>>> = Rc::default();
  let sink = seen.clone();
  root.watch(
    |s| s.get("value"),
    move |new, old, _| {
      sink.borrow_mut().push((new.clone(), old.clone()));
      Ok(())
    },
    Equality::Reference,
  );

  root.digest().unwrap();
  root.set("value", "next");
  root.digest().unwrap();

  assert_eq!(
    *seen.borrow(),
    vec![
      (Value::from("initial"), Value::from("initial")),
      (Value::from("next"), Value::from("initial")),
    ]
  );
}

#[test]
fn test_reaction_fires_only_on_change() {
  // Arrange
  let (root, _queue, _handler) = setup();
  root.set("value", 1);
  let count = counting_watch(&root, "value", Equality::Reference);

  // Act
  root.digest().unwrap();
  root.digest().unwrap();
  root.set("value", 2);
  root.digest().unwrap();

  // Assert
  assert_eq!(count.get(), 2);
}

#[test]
fn test_undefined_is_observed_on_first_digest() {
  let (root, _queue, _handler) = setup();
  let count = counting_watch(&root, "missing", Equality::Reference);

  root.digest().unwrap();
  root.digest().unwrap();

  assert_eq!(count.get(), 1);
}

#[test]
fn test_nan_is_stable_under_reference_equality() {
  let (root, _queue, _handler) = setup();
  root.set("value", f64::NAN);
  let count = counting_watch(&root, "value", Equality::Reference);

  root.digest().unwrap();
  root.digest().unwrap();

  assert_eq!(count.get(), 1);
}

#[test]
fn test_in_place_mutation_needs_deep_equality() {
  // Arrange: the same list is watched under both disciplines.
  let (root, _queue, _handler) = setup();
  let list = Value::list([Value::from(1), Value::from(2)]);
  root.set("items", list.clone());
  let by_reference = counting_watch(&root, "items", Equality::Reference);
  let by_value = counting_watch(&root, "items", Equality::Deep);
  root.digest().unwrap();

  // Act
  list.push(3);
  root.digest().unwrap();

  // Assert
  assert_eq!(by_reference.get(), 1);
  assert_eq!(by_value.get(), 2);
}

#[test]
fn test_deep_equality_ignores_equal_replacement() {
  // Arrange
  let (root, _queue, _handler) = setup();
  root.set("items", Value::list([Value::from("a")]));
  let by_reference = counting_watch(&root, "items", Equality::Reference);
  let by_value = counting_watch(&root, "items", Equality::Deep);
  root.digest().unwrap();

  // Act: a new container with the same contents.
  root.set("items", Value::list([Value::from("a")]));
  root.digest().unwrap();

  // Assert
  assert_eq!(by_reference.get(), 2);
  assert_eq!(by_value.get(), 1);
}

#[test]
fn test_deep_watch_on_self_containing_list_converges() {
  // Arrange
  let (root, _queue, _handler) = setup();
  let list = Value::list([]);
  list.push(list.clone());
  root.set("cyclic", list.clone());
  let count = counting_watch(&root, "cyclic", Equality::Deep);

  // Act
  root.digest().unwrap();
  root.digest().unwrap();
  list.push(1);
  root.digest().unwrap();

  // Assert
  assert_eq!(count.get(), 2);
}

#[test]
fn test_deregistered_watcher_stops_firing() {
  let (root, _queue, _handler) = setup();
  let count = Rc::new(Cell::new(0));
  let counter = count.clone();
  let handle = root.watch(
    |s| s.get("value"),
    move |_, _, _| {
      counter.set(counter.get() + 1);
      Ok(())
    },
    Equality::Reference,
  );
  root.digest().unwrap();

  handle.deregister();
  handle.deregister();
  root.set("value", 1);
  root.digest().unwrap();

  assert_eq!(count.get(), 1);
  assert_eq!(root.watcher_count(), 0);
}

#[test]
fn test_watcher_can_deregister_itself_during_digest() {
  // Arrange
  let (root, _queue, _handler) = setup();
  let count = Rc::new(Cell::new(0));
  let slot: Rc<RefCell<Option<WatchHandle>>> = Rc::default();
  let counter = count.clone();
  let own_handle = slot.clone();
  let handle = root.watch(
    |s| s.get("value"),
    move |_, _, _| {
      counter.set(counter.get() + 1);
      if let Some(handle) = own_handle.borrow().as_ref() {
        handle.deregister();
      }
      Ok(())
    },
    Equality::Reference,
  );
  *slot.borrow_mut() = Some(handle);
  let other = counting_watch(&root, "value", Equality::Reference);

  // Act
  root.digest().unwrap();
  root.set("value", "changed");
  root.digest().unwrap();

  // Assert
  assert_eq!(count.get(), 1);
  assert_eq!(other.get(), 2);
  assert_eq!(root.watcher_count(), 1);
}

#[test]
fn test_newest_watcher_runs_first() {
  // Arrange
  let (root, _queue, _handler) = setup();
  let log: Rc<RefCell<Vec<&'static str>>> = Rc::default();
  for name in ["first", "second", "third"] {
    let log = log.clone();
    root.watch(
      |_| Value::Null,
      move |_, _, _| {
        log.borrow_mut().push(name);
        Ok(())
      },
      Equality::Reference,
    );
  }

  // Act
  root.digest().unwrap();

  // Assert
  assert_eq!(*log.borrow(), vec!["third", "second", "first"]);
}

#[test]
fn test_watcher_added_by_reaction_runs_in_same_digest() {
  // Arrange
  let (root, _queue, _handler) = setup();
  let inner_runs = Rc::new(Cell::new(0));
  let registered = Rc::new(Cell::new(false));
  let runs = inner_runs.clone();
  root.watch(
    |s| s.get("value"),
    move |_, _, scope| {
      if !registered.replace(true) {
        let runs = runs.clone();
        scope.watch(
          |s| s.get("value"),
          move |_, _, _| {
            runs.set(runs.get() + 1);
            Ok(())
          },
          Equality::Reference,
        );
      }
      Ok(())
    },
    Equality::Reference,
  );

  // Act
  root.digest().unwrap();

  // Assert
  assert_eq!(inner_runs.get(), 1);
  assert_eq!(root.watcher_count(), 2);
}

#[test]
fn test_chained_watchers_converge_in_one_digest() {
  // Arrange: `double` follows `value`, `seen` follows `double`.
  let (root, _queue, _handler) = setup();
  root.set("value", 2);
  root.watch(
    |s| s.get("value"),
    |new, _, s| {
      let doubled = new.as_number().unwrap_or_default() * 2.0;
      s.set("double", doubled);
      Ok(())
    },
    Equality::Reference,
  );
  root.watch(
    |s| s.get("double"),
    |new, _, s| {
      s.set("seen", new.clone());
      Ok(())
    },
    Equality::Reference,
  );

  // Act
  root.digest().unwrap();

  // Assert
  assert_eq!(root.get("seen"), Value::from(4));
}

#[test]
fn test_clean_tail_is_skipped_after_last_dirty_watcher() {
  // Arrange: three watchers; only the newest one will change.
  let (root, _queue, _handler) = setup();
  let reads = Rc::new(Cell::new(0));
  for name in ["x", "y", "z"] {
    let reads = reads.clone();
    root.watch(
      move |s| {
        reads.set(reads.get() + 1);
        s.get(name)
      },
      |_, _, _| Ok(()),
      Equality::Reference,
    );
  }
  root.digest().unwrap();
  reads.set(0);

  // Act
  root.set("z", 1);
  root.digest().unwrap();

  // Assert: one full pass, then only the dirty watcher again.
  assert_eq!(reads.get(), 4);
}

#[test]
fn test_reaction_error_is_reported_and_digest_continues() {
  // Arrange
  let (root, _queue, handler) = setup();
  let count = counting_watch(&root, "value", Equality::Reference);
  root.watch(
    |s| s.get("value"),
    |_, _, _| Err("reaction failed".into()),
    Equality::Reference,
  );

  // Act
  let result = root.digest();

  // Assert
  assert!(result.is_ok());
  assert_eq!(count.get(), 1);
  let reports = handler.reports();
  assert_eq!(reports.len(), 1);
  assert_eq!(reports[0].source, FailureSource::Reaction);
  assert_eq!(reports[0].scope_id, root.id());
  assert_eq!(reports[0].message, "reaction failed");
}
