// marketplace/tests/common/mod.rs
#![allow(dead_code)]

use marketplace::config::AppConfig;
use marketplace::models::{CartItem, Product, Seller, User};
use marketplace::services::{CartService, OrderQueries};
use marketplace::store::{CartStore, MemoryStore, Stores};
use marketplace::workflows::OrderWorkflows;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use uuid::Uuid;

/// A memory-backed marketplace with one shopper, one seller and two products:
/// A at 10.00 with 10 in stock, B at 5.50 with 3 in stock.
pub struct Fixture {
  pub store: Arc<MemoryStore>,
  pub stores: Stores,
  pub config: AppConfig,
  pub workflows: OrderWorkflows,
  pub carts: CartService,
  pub queries: OrderQueries,
  pub user_id: Uuid,
  pub seller_id: Uuid,
  pub product_a: Uuid,
  pub product_b: Uuid,
}

pub fn fixture() -> Fixture {
  fixture_with_timeout(Duration::from_secs(5))
}

pub fn fixture_with_timeout(step_timeout: Duration) -> Fixture {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let stores = Stores::shared(store.clone());
  let config = AppConfig {
    placement_step_timeout: step_timeout,
    ..AppConfig::default()
  };

  let mut shopper = User::new("shopper", "shopper@example.com");
  shopper.first_name = Some("Sam".to_string());
  let user_id = store.insert_user(shopper);
  let seller_id = store.insert_seller(Seller::new("seller_one", "First Goods"));
  let product_a = store.insert_product(Product::new(seller_id, "Product A", dec!(10.00), 10));
  let product_b = store.insert_product(Product::new(seller_id, "Product B", dec!(5.50), 3));

  Fixture {
    workflows: OrderWorkflows::build(stores.clone(), &config).unwrap(),
    carts: CartService::new(stores.clone()),
    queries: OrderQueries::new(stores.clone()),
    store,
    stores,
    config,
    user_id,
    seller_id,
    product_a,
    product_b,
  }
}

impl Fixture {
  pub fn add_user(&self, username: &str) -> Uuid {
    self
      .store
      .insert_user(User::new(username, format!("{}@example.com", username)))
  }

  pub fn add_seller(&self, username: &str) -> Uuid {
    self.store.insert_seller(Seller::new(username, format!("{} Ltd", username)))
  }

  pub fn add_product(&self, seller_id: Uuid, name: &str, price: Decimal, stock: i32) -> Uuid {
    self.store.insert_product(Product::new(seller_id, name, price, stock))
  }

  /// Puts `quantity` of `product_id` into `user_id`'s cart.
  pub async fn add_to_cart(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> CartItem {
    self.carts.add_item(user_id, product_id, quantity).await.unwrap()
  }

  pub fn stock(&self, product_id: Uuid) -> i32 {
    self.store.stock_of(product_id).unwrap()
  }

  pub async fn cart_of(&self, user_id: Uuid) -> Vec<(Uuid, i32)> {
    self
      .stores
      .carts
      .list_items(user_id)
      .await
      .unwrap()
      .into_iter()
      .map(|item| (item.product_id, item.quantity))
      .collect()
  }

  pub async fn place(&self, user_id: Uuid) -> marketplace::Result<marketplace::models::OrderRecord> {
    self
      .workflows
      .place_order(user_id, "1 Market Street".to_string(), "CARD".to_string())
      .await
  }
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
