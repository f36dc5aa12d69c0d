use fibre_ioc::{
  injectable, Annotated, InjectError, Injector, ModuleRegistry, Registrar, ServiceProvider,
};
use pretty_assertions::assert_eq;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// --- Test Fixtures ---

type Log = Rc<RefCell<Vec<String>>>;

fn recorder(log: &Log, entry: &str) -> Annotated {
  let log = log.clone();
  let entry = entry.to_owned();
  Annotated::new(&[], move |_| {
    log.borrow_mut().push(entry.clone());
    Ok(entry.clone())
  })
}

struct TtlProvider {
  ttl: Cell<u32>,
}

impl TtlProvider {
  fn set_ttl(&self, ttl: u32) {
    self.ttl.set(ttl);
  }
}

impl ServiceProvider for TtlProvider {
  fn construct(&self) -> Annotated {
    Annotated::new(&[], |args| Ok(args.this::<TtlProvider>()?.ttl.get()))
  }
}

// --- Module Tests ---

#[test]
fn test_required_modules_load_first_and_once() {
  // Arrange: M1 requires M2 twice over (directly and through M3).
  let log: Log = Rc::default();
  let mut registry = ModuleRegistry::new();
  registry
    .module("M1", &["M2", "M3"])
    .value("m1", 1_u32)
    .run(recorder(&log, "run M1"));
  registry
    .module("M2", &[])
    .value("m2", 2_u32)
    .run(recorder(&log, "run M2"));
  registry
    .module("M3", &["M2"])
    .run(recorder(&log, "run M3"));

  // Act
  let injector = Injector::new(&registry, ["M1"]).unwrap();

  // Assert
  assert_eq!(
    *log.borrow(),
    vec!["run M2".to_string(), "run M3".to_string(), "run M1".to_string()]
  );
  assert!(injector.has("m1"));
  assert!(injector.has("m2"));
}

#[test]
fn test_registrations_apply_in_dependency_order() {
  // M1 overrides a value first registered by M2, which it requires.
  let mut registry = ModuleRegistry::new();
  registry.module("M1", &["M2"]).value("flavor", "m1");
  registry.module("M2", &[]).value("flavor", "m2");

  let injector = Injector::new(&registry, ["M1", "M2"]).unwrap();

  assert_eq!(*injector.get::<&str>("flavor").unwrap(), "m1");
}

#[test]
fn test_cyclic_module_requirements_terminate() {
  let mut registry = ModuleRegistry::new();
  registry.module("a", &["b"]).value("a", 1_u32);
  registry.module("b", &["a"]).value("b", 2_u32);

  let injector = Injector::new(&registry, ["a"]).unwrap();

  assert!(injector.has("a"));
  assert!(injector.has("b"));
}

#[test]
fn test_unknown_module_fails() {
  let registry = ModuleRegistry::new();

  let result = Injector::new(&registry, ["nowhere"]);

  assert!(matches!(result, Err(InjectError::UnknownModule { name }) if name == "nowhere"));
}

#[test]
fn test_registration_errors_surface_at_load() {
  let mut registry = ModuleRegistry::new();
  registry.module("bad", &[]).constant("hasOwnProperty", 1_u32);

  let result = Injector::new(&registry, ["bad"]);

  assert!(matches!(result, Err(InjectError::InvalidName { .. })));
}

#[test]
fn test_config_blocks_reach_providers() {
  // Arrange
  let mut registry = ModuleRegistry::new();
  registry
    .module("app", &["cache"])
    .configure::<TtlProvider, _>("ttl", |p| p.set_ttl(30));
  registry.module("cache", &[]).provider(
    "ttl",
    Rc::new(TtlProvider {
      ttl: Cell::new(10),
    }),
  );

  // Act
  let injector = Injector::new(&registry, ["app"]).unwrap();

  // Assert
  assert_eq!(*injector.get::<u32>("ttl").unwrap(), 30);
}

#[test]
fn test_config_blocks_cannot_see_instances() {
  let mut registry = ModuleRegistry::new();
  registry
    .module("app", &[])
    .factory("service", Annotated::new(&[], |_| Ok(1_u32)))
    .config(Annotated::action(&["service"], |_| Ok(())));

  let result = Injector::new(&registry, ["app"]);

  assert!(matches!(result, Err(InjectError::UnknownProvider { token, .. }) if token == "service"));
}

#[test]
fn test_config_blocks_see_constants_and_provide() {
  // Arrange
  let mut registry = ModuleRegistry::new();
  registry
    .module("app", &[])
    .constant("limit", 3_u32)
    .config(Annotated::action(&["$provide", "limit"], |args| {
      let provide = args.get::<Registrar>(0)?;
      let limit = args.get::<u32>(1)?;
      provide.value("doubled", *limit * 2)
    }));

  // Act
  let injector = Injector::new(&registry, ["app"]).unwrap();

  // Assert
  assert_eq!(*injector.get::<u32>("doubled").unwrap(), 6);
}

#[test]
fn test_run_blocks_resolve_services() {
  // Arrange
  let seen = Rc::new(Cell::new(0_u32));
  let sink = seen.clone();
  let mut registry = ModuleRegistry::new();
  registry
    .module("app", &[])
    .factory("answer", Annotated::new(&[], |_| Ok(42_u32)))
    .run(Annotated::action(&["answer"], move |args| {
      sink.set(*args.get::<u32>(0)?);
      Ok(())
    }));

  // Act
  Injector::new(&registry, ["app"]).unwrap();

  // Assert
  assert_eq!(seen.get(), 42);
}

#[test]
fn test_inline_module_runs_immediately_and_queues_its_result() {
  // Arrange
  let log: Log = Rc::default();
  let registered = log.clone();
  let mut registry = ModuleRegistry::new();
  registry.module("app", &[]).value("ready", true);

  let inline_log = log.clone();
  let inline = Annotated::new(&["$provide"], move |args| {
    inline_log.borrow_mut().push("inline".to_string());
    args.get::<Registrar>(0)?.constant("fromInline", 5_u32)?;
    let run_log = registered.clone();
    Ok(Annotated::action(&["fromInline", "ready"], move |args| {
      run_log
        .borrow_mut()
        .push(format!("run {}", args.get::<u32>(0)?));
      Ok(())
    }))
  });

  // Act
  let injector = Injector::new(
    &registry,
    vec![fibre_ioc::ModuleRef::from("app"), inline.into()],
  )
  .unwrap();

  // Assert
  assert_eq!(*log.borrow(), vec!["inline".to_string(), "run 5".to_string()]);
  assert_eq!(*injector.get::<u32>("fromInline").unwrap(), 5);
}

#[test]
fn test_decorator_in_module_wraps_earlier_factory() {
  let mut registry = ModuleRegistry::new();
  registry
    .module("base", &[])
    .factory("name", Annotated::new(&[], |_| Ok("fibre".to_string())));
  registry.module("app", &["base"]).decorator(
    "name",
    injectable!(["$delegate" => name: String] { format!("{}-ioc", name) }),
  );

  let injector = Injector::new(&registry, ["app"]).unwrap();

  assert_eq!(*injector.get::<String>("name").unwrap(), "fibre-ioc");
}

#[test]
fn test_reopened_module_keeps_earlier_declarations() {
  let mut registry = ModuleRegistry::new();
  registry.module("app", &[]).value("first", 1_u32);
  registry
    .get_mut("app")
    .unwrap()
    .value("second", 2_u32);

  let injector = Injector::new(&registry, ["app"]).unwrap();

  assert!(injector.has("first"));
  assert!(injector.has("second"));
  assert_eq!(registry.get("app").unwrap().requires().len(), 0);
}
