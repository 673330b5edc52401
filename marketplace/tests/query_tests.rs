// marketplace/tests/query_tests.rs
mod common;

use common::*;
use marketplace::models::OrderStatus;
use rust_decimal_macros::dec;
use uuid::Uuid;

#[tokio::test]
async fn orders_by_user_are_newest_first() {
  let fx = fixture();
  fx.add_to_cart(fx.user_id, fx.product_a, 1).await;
  let first = fx.place(fx.user_id).await.unwrap().order.id;
  tokio::time::sleep(std::time::Duration::from_millis(5)).await;
  fx.add_to_cart(fx.user_id, fx.product_b, 1).await;
  let second = fx.place(fx.user_id).await.unwrap().order.id;

  let ids: Vec<Uuid> = fx.queries.by_user(fx.user_id).await.unwrap().iter().map(|v| v.id).collect();
  assert_eq!(ids, vec![second, first]);

  let stranger = fx.add_user("stranger");
  assert!(fx.queries.by_user(stranger).await.unwrap().is_empty());
  assert!(matches!(
    fx.queries.by_user(Uuid::new_v4()).await,
    Err(marketplace::MarketError::NotFound(_))
  ));
}

#[tokio::test]
async fn status_filter_is_case_insensitive_and_tolerates_unknown_names() {
  let fx = fixture();
  fx.add_to_cart(fx.user_id, fx.product_a, 1).await;
  let pending = fx.place(fx.user_id).await.unwrap().order.id;
  fx.add_to_cart(fx.user_id, fx.product_b, 1).await;
  let processing = fx.place(fx.user_id).await.unwrap().order.id;
  fx.workflows.update_status(processing, "PROCESSING").await.unwrap();

  let ids = |views: Vec<marketplace::projections::OrderView>| views.into_iter().map(|v| v.id).collect::<Vec<_>>();
  assert_eq!(ids(fx.queries.by_status("pending").await.unwrap()), vec![pending]);
  assert_eq!(ids(fx.queries.by_status("PROCESSING").await.unwrap()), vec![processing]);
  assert!(fx.queries.by_status("SHIPPED").await.unwrap().is_empty());
  assert!(fx.queries.by_status("lost-in-transit").await.unwrap().is_empty());
}

#[tokio::test]
async fn seller_sees_each_order_once() {
  let fx = fixture();
  let other_seller = fx.add_seller("second_seller");
  let foreign = fx.add_product(other_seller, "Foreign", dec!(7.00), 5);

  // Two lines from the same seller still yield one order.
  fx.add_to_cart(fx.user_id, fx.product_a, 1).await;
  fx.add_to_cart(fx.user_id, fx.product_b, 1).await;
  let mine = fx.place(fx.user_id).await.unwrap().order.id;

  fx.add_to_cart(fx.user_id, foreign, 1).await;
  let theirs = fx.place(fx.user_id).await.unwrap().order.id;

  let for_me: Vec<Uuid> = fx.queries.by_seller(fx.seller_id).await.unwrap().iter().map(|v| v.id).collect();
  assert_eq!(for_me, vec![mine]);
  let for_them: Vec<Uuid> = fx.queries.by_seller(other_seller).await.unwrap().iter().map(|v| v.id).collect();
  assert_eq!(for_them, vec![theirs]);
  assert!(fx.queries.by_seller(Uuid::new_v4()).await.unwrap().is_empty());
}

#[tokio::test]
async fn order_view_joins_user_product_and_seller() {
  let fx = fixture();
  fx.add_to_cart(fx.user_id, fx.product_a, 2).await;
  fx.add_to_cart(fx.user_id, fx.product_b, 1).await;
  let order_id = fx.place(fx.user_id).await.unwrap().order.id;

  let view = fx.queries.by_id(order_id).await.unwrap();
  assert_eq!(view.status, OrderStatus::Pending);
  assert_eq!(view.total_amount, dec!(25.50));
  assert_eq!(view.user_first_name.as_deref(), Some("Sam"));
  assert_eq!(view.user_email.as_deref(), Some("shopper@example.com"));
  assert_eq!(view.items.len(), 2);
  let line_a = view.items.iter().find(|i| i.product_id == fx.product_a).unwrap();
  assert_eq!(line_a.product_name.as_deref(), Some("Product A"));
  assert_eq!(line_a.line_total, dec!(20.00));
  assert_eq!(line_a.seller_id, Some(fx.seller_id));
  assert_eq!(line_a.seller_business_name.as_deref(), Some("First Goods"));

  assert_eq!(fx.queries.all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_removes_the_order_and_is_idempotent() {
  let fx = fixture();
  fx.add_to_cart(fx.user_id, fx.product_a, 1).await;
  let order_id = fx.place(fx.user_id).await.unwrap().order.id;

  assert!(fx.queries.delete(order_id).await.unwrap());
  assert!(!fx.queries.delete(order_id).await.unwrap());
  assert!(matches!(
    fx.queries.by_id(order_id).await,
    Err(marketplace::MarketError::NotFound(_))
  ));
  // Deleting an order does not give stock back.
  assert_eq!(fx.stock(fx.product_a), 9);
}
