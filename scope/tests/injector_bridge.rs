use fibre_ioc::{injectable, Annotated, Injector, ModuleRegistry};
use fibre_scope::module::{self, RootScopeProvider, ROOT_SCOPE};
use fibre_scope::{CollectingExceptionHandler, DeferQueue, Equality, FailureSource, Scope, Value};
use pretty_assertions::assert_eq;
use std::rc::Rc;

#[test]
fn test_root_scope_is_a_singleton() {
  // Arrange
  let mut registry = ModuleRegistry::new();
  module::register(&mut registry);

  // Act
  let injector = Injector::new(&registry, [module::MODULE_NAME]).unwrap();
  let first = injector.get::<Scope>(ROOT_SCOPE).unwrap();
  let second = injector.get::<Scope>(ROOT_SCOPE).unwrap();

  // Assert
  assert!(first.ptr_eq(&second));
  assert!(first.is_root());
  assert_eq!(first.digest_ttl(), 10);
}

#[test]
fn test_each_injector_gets_its_own_root() {
  let mut registry = ModuleRegistry::new();
  module::register(&mut registry);
  registry
    .module("tuned", &[module::MODULE_NAME])
    .configure::<RootScopeProvider, _>(ROOT_SCOPE, |p| p.set_digest_ttl(4));

  let plain = Injector::new(&registry, [module::MODULE_NAME]).unwrap();
  let tuned = Injector::new(&registry, ["tuned"]).unwrap();

  let plain_root = plain.get::<Scope>(ROOT_SCOPE).unwrap();
  let tuned_root = tuned.get::<Scope>(ROOT_SCOPE).unwrap();
  assert!(!plain_root.ptr_eq(&tuned_root));
  assert_eq!(plain_root.digest_ttl(), 10);
  assert_eq!(tuned_root.digest_ttl(), 4);
}

#[test]
fn test_config_block_installs_scheduler_and_handler() {
  // Arrange
  let queue = Rc::new(DeferQueue::new());
  let handler = Rc::new(CollectingExceptionHandler::new());
  let (scheduler, sink) = (queue.clone(), handler.clone());
  let mut registry = ModuleRegistry::new();
  module::register(&mut registry);
  registry
    .module("app", &[module::MODULE_NAME])
    .configure::<RootScopeProvider, _>(ROOT_SCOPE, move |p| {
      p.set_scheduler(scheduler.clone());
      p.set_exception_handler(sink.clone());
    });
  let injector = Injector::new(&registry, ["app"]).unwrap();
  let root = injector.get::<Scope>(ROOT_SCOPE).unwrap();

  // Act
  root.apply_async(|_| Err("boom".into()));
  queue.run_until_idle();

  // Assert
  let reports = handler.reports();
  assert_eq!(reports.len(), 1);
  assert_eq!(reports[0].source, FailureSource::ApplyAsyncTask);
}

#[test]
fn test_services_can_depend_on_root_scope() {
  // Arrange: a service that watches the root scope on construction.
  struct Tracker {
    scope: Rc<Scope>,
  }
  let mut registry = ModuleRegistry::new();
  module::register(&mut registry);
  registry.module("app", &[module::MODULE_NAME]).factory(
    "tracker",
    injectable!(["$rootScope" => scope: Scope] {
      scope.watch(
        |s| s.get("status"),
        |new, _, s| {
          s.set("seen", new.clone());
          Ok(())
        },
        Equality::Reference,
      );
      Tracker { scope }
    }),
  );
  let injector = Injector::new(&registry, ["app"]).unwrap();

  // Act
  let tracker = injector.get::<Tracker>("tracker").unwrap();
  tracker.scope.apply(|s| s.set("status", "ready")).unwrap();

  // Assert
  let root = injector.get::<Scope>(ROOT_SCOPE).unwrap();
  assert_eq!(root.get("seen"), Value::from("ready"));
}

#[test]
fn test_run_block_can_seed_root_scope() {
  let mut registry = ModuleRegistry::new();
  module::register(&mut registry);
  registry
    .module("app", &[module::MODULE_NAME])
    .run(Annotated::action(&[ROOT_SCOPE], |args| {
      args.get::<Scope>(0)?.set("booted", true);
      Ok(())
    }));

  let injector = Injector::new(&registry, ["app"]).unwrap();

  let root = injector.get::<Scope>(ROOT_SCOPE).unwrap();
  assert_eq!(root.get("booted"), Value::from(true));
}
