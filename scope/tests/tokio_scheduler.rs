use fibre_scope::{Equality, ScopeBuilder, TokioLocalScheduler, Value};
use pretty_assertions::assert_eq;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;

#[tokio::test]
async fn test_apply_async_coalesces_on_local_set() {
  let local = LocalSet::new();
  local
    .run_until(async {
      // Arrange
      let root = ScopeBuilder::new()
        .scheduler(Rc::new(TokioLocalScheduler::new()))
        .build();
      let count = Rc::new(Cell::new(0));
      let counter = count.clone();
      root.watch(
        |s| s.get("value"),
        move |_, _, _| {
          counter.set(counter.get() + 1);
          Ok(())
        },
        Equality::Reference,
      );

      // Act
      root.apply_async(|s| {
        s.set("value", 1);
        Ok(())
      });
      root.apply_async(|s| {
        s.set("value", 2);
        Ok(())
      });
      assert!(root.get("value").is_undefined());
      tokio::time::sleep(Duration::from_millis(10)).await;

      // Assert
      assert_eq!(root.get("value"), Value::from(2));
      assert_eq!(count.get(), 1);
      assert!(!root.has_pending_apply_async());
    })
    .await;
}

#[tokio::test]
async fn test_digest_cancels_spawned_apply_async() {
  let local = LocalSet::new();
  local
    .run_until(async {
      let root = ScopeBuilder::new()
        .scheduler(Rc::new(TokioLocalScheduler::new()))
        .build();
      let count = Rc::new(Cell::new(0));
      let counter = count.clone();
      root.watch(
        |s| s.get("value"),
        move |_, _, _| {
          counter.set(counter.get() + 1);
          Ok(())
        },
        Equality::Reference,
      );

      root.apply_async(|s| {
        s.set("value", "early");
        Ok(())
      });
      root.digest().unwrap();
      tokio::time::sleep(Duration::from_millis(10)).await;

      assert_eq!(root.get("value"), Value::from("early"));
      assert_eq!(count.get(), 1);
    })
    .await;
}

#[tokio::test]
async fn test_eval_async_digests_on_a_later_turn() {
  let local = LocalSet::new();
  local
    .run_until(async {
      let root = ScopeBuilder::new()
        .scheduler(Rc::new(TokioLocalScheduler::new()))
        .build();

      root.eval_async(|s| {
        s.set("ran", true);
        Ok(())
      });
      assert!(root.get("ran").is_undefined());
      tokio::task::yield_now().await;
      tokio::time::sleep(Duration::from_millis(10)).await;

      assert_eq!(root.get("ran"), Value::from(true));
    })
    .await;
}
