// marketplace/tests/status_tests.rs
mod common;

use common::*;
use marketplace::models::OrderStatus;
use marketplace::store::StoreOp;
use marketplace::MarketError;
use uuid::Uuid;

async fn placed_order(fx: &Fixture) -> Uuid {
  fx.add_to_cart(fx.user_id, fx.product_a, 1).await;
  fx.place(fx.user_id).await.unwrap().order.id
}

#[tokio::test]
async fn order_walks_the_happy_path() {
  let fx = fixture();
  let order_id = placed_order(&fx).await;

  for (requested, expected) in [
    ("PROCESSING", OrderStatus::Processing),
    ("shipped", OrderStatus::Shipped),
    (" Delivered ", OrderStatus::Delivered),
  ] {
    let record = fx.workflows.update_status(order_id, requested).await.unwrap();
    assert_eq!(record.order.status, expected);
    assert_eq!(record.order.id, order_id);
    assert_eq!(record.items.len(), 1);
  }

  let view = fx.queries.by_id(order_id).await.unwrap();
  assert_eq!(view.status, OrderStatus::Delivered);
}

#[tokio::test]
async fn processing_can_skip_straight_to_delivered() {
  let fx = fixture();
  let order_id = placed_order(&fx).await;
  fx.workflows.update_status(order_id, "PROCESSING").await.unwrap();
  let record = fx.workflows.update_status(order_id, "DELIVERED").await.unwrap();
  assert_eq!(record.order.status, OrderStatus::Delivered);
}

#[tokio::test]
async fn pending_order_can_be_cancelled() {
  let fx = fixture();
  let order_id = placed_order(&fx).await;
  let record = fx.workflows.update_status(order_id, "CANCELLED").await.unwrap();
  assert_eq!(record.order.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn terminal_orders_do_not_move() {
  let fx = fixture();
  let order_id = placed_order(&fx).await;
  fx.workflows.update_status(order_id, "CANCELLED").await.unwrap();

  for next in ["PENDING", "PROCESSING", "SHIPPED", "DELIVERED", "CANCELLED"] {
    let err = fx.workflows.update_status(order_id, next).await.unwrap_err();
    assert!(
      matches!(err, MarketError::InvalidStatusTransition { ref from, .. } if from == "CANCELLED"),
      "{next}: {err:?}"
    );
  }
  assert_eq!(fx.queries.by_id(order_id).await.unwrap().status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn skipping_ahead_is_rejected() {
  let fx = fixture();
  let order_id = placed_order(&fx).await;

  let err = fx.workflows.update_status(order_id, "SHIPPED").await.unwrap_err();
  assert!(matches!(
    err,
    MarketError::InvalidStatusTransition { ref from, ref to } if from == "PENDING" && to == "SHIPPED"
  ));
  assert_eq!(fx.queries.by_id(order_id).await.unwrap().status, OrderStatus::Pending);
}

#[tokio::test]
async fn shipped_order_cannot_be_cancelled() {
  let fx = fixture();
  let order_id = placed_order(&fx).await;
  fx.workflows.update_status(order_id, "PROCESSING").await.unwrap();
  fx.workflows.update_status(order_id, "SHIPPED").await.unwrap();

  let err = fx.workflows.update_status(order_id, "CANCELLED").await.unwrap_err();
  assert!(matches!(err, MarketError::InvalidStatusTransition { .. }));
}

#[tokio::test]
async fn unknown_status_name_is_an_invalid_transition() {
  let fx = fixture();
  let order_id = placed_order(&fx).await;
  let err = fx.workflows.update_status(order_id, "TELEPORTED").await.unwrap_err();
  assert!(matches!(err, MarketError::InvalidStatusTransition { ref to, .. } if to == "TELEPORTED"));
}

#[tokio::test]
async fn missing_order_is_not_found() {
  let fx = fixture();
  let err = fx.workflows.update_status(Uuid::new_v4(), "PROCESSING").await.unwrap_err();
  assert!(matches!(err, MarketError::NotFound(_)));
}

#[tokio::test]
async fn store_failure_leaves_status_unchanged() {
  let fx = fixture();
  let order_id = placed_order(&fx).await;

  fx.store.fail_next(StoreOp::UpdateStatus);
  let err = fx.workflows.update_status(order_id, "PROCESSING").await.unwrap_err();
  assert!(matches!(err, MarketError::PersistenceFailure(_)));
  assert_eq!(fx.queries.by_id(order_id).await.unwrap().status, OrderStatus::Pending);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_identical_transitions_have_one_winner() {
  let fx = fixture();
  let order_id = placed_order(&fx).await;

  let first = {
    let workflows = fx.workflows.clone();
    tokio::spawn(async move { workflows.update_status(order_id, "PROCESSING").await })
  };
  let second = {
    let workflows = fx.workflows.clone();
    tokio::spawn(async move { workflows.update_status(order_id, "PROCESSING").await })
  };
  let results = [first.await.unwrap(), second.await.unwrap()];

  let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
  assert_eq!(winners.len(), 1, "{results:?}");
  assert!(results
    .iter()
    .any(|r| matches!(r, Err(MarketError::InvalidStatusTransition { .. }))));
  assert_eq!(fx.queries.by_id(order_id).await.unwrap().status, OrderStatus::Processing);
}
