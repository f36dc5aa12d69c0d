//! Drives a small scope hierarchy with a manual scheduler. Callback
//! failures are collected and printed at the end.

use fibre_scope::{
  read, CollectingExceptionHandler, DeferQueue, Equality, ScopeBuilder, Value,
};
use std::rc::Rc;

fn main() {
  let queue = Rc::new(DeferQueue::new());
  let handler = Rc::new(CollectingExceptionHandler::new());
  let root = ScopeBuilder::new()
    .scheduler(queue.clone())
    .exception_handler(handler.clone())
    .build();

  root.set("count", 0);
  root.watch(
    |s| s.get("count"),
    |new, old, s| {
      println!("count: {} -> {}", old, new);
      let doubled = new.as_number().unwrap_or_default() * 2.0;
      s.set("doubled", doubled);
      Ok(())
    },
    Equality::Reference,
  );

  let panel = root.new_child();
  panel.watch_group(
    vec![read(|s| s.get("count")), read(|s| s.get("doubled"))],
    |values, _, _| {
      println!("panel sees {:?}", values.iter().map(Value::to_string).collect::<Vec<_>>());
      Ok(())
    },
  );

  for step in 1..=3 {
    root.apply_async(move |s| {
      s.set("count", step);
      Ok(())
    });
  }
  println!("deferred tasks waiting: {}", queue.len());
  queue.run_until_idle();

  root.post_digest(|| {
    println!("settled");
    Ok(())
  });
  if let Err(e) = root.apply(|s| s.set("count", 10)) {
    println!("apply failed: {}", e);
  }

  root.apply_async(|_| Err("simulated failure".into()));
  queue.run_until_idle();
  for report in handler.take() {
    println!("reported: {}", report);
  }
}
