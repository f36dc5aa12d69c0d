use fibre_ioc::{injectable, Annotated, Injector, ModuleRegistry, ServiceProvider};
use std::cell::RefCell;
use std::rc::Rc;

// A provider that can be configured before the service it builds exists.
struct MailerProvider {
  sender: RefCell<String>,
}

impl MailerProvider {
  fn use_sender(&self, sender: &str) {
    *self.sender.borrow_mut() = sender.to_owned();
  }
}

struct Mailer {
  sender: String,
  transport: Rc<String>,
}

impl ServiceProvider for MailerProvider {
  fn construct(&self) -> Annotated {
    Annotated::new(&["transport"], |args| {
      let provider = args.this::<MailerProvider>()?;
      let sender = provider.sender.borrow().clone();
      Ok(Mailer {
        sender,
        transport: args.get::<String>(0)?,
      })
    })
  }
}

fn main() {
  let mut registry = ModuleRegistry::new();

  registry
    .module("transport", &[])
    .value("transport", String::from("smtp://localhost:25"));

  registry
    .module("mail", &["transport"])
    .provider(
      "mailer",
      Rc::new(MailerProvider {
        sender: RefCell::new(String::from("noreply@example.com")),
      }),
    );

  registry
    .module("app", &["mail"])
    .configure::<MailerProvider, _>("mailer", |p| p.use_sender("team@example.com"))
    .run(injectable!(["mailer" => mailer: Mailer] {
      println!("Mailer ready: {} via {}", mailer.sender, mailer.transport);
    }));

  let injector = Injector::new(&registry, ["app"]).expect("modules load");

  let mailer = injector.get::<Mailer>("mailer").expect("mailer resolves");
  assert_eq!(mailer.sender, "team@example.com");
  assert!(Rc::ptr_eq(
    &mailer,
    &injector.get::<Mailer>("mailer").expect("mailer resolves")
  ));
  println!("The same mailer instance is returned on every request.");
}
