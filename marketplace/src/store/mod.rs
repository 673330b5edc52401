// marketplace/src/store/mod.rs

//! Persistence seams.
//!
//! Each concern gets its own object-safe async trait so workflows and services can
//! hold them as `Arc<dyn ...>` and stay unaware of the backend. Two adapters exist:
//! [`MemoryStore`] (single process, also used by the test suite) and [`PgStore`].

pub mod memory;
pub mod postgres;

pub use memory::{DemoSeed, MemoryStore, StoreOp};
pub use postgres::PgStore;

use crate::config::{AppConfig, StoreBackend};
use crate::errors::{MarketError, Result};
use crate::models::{CartItem, Order, OrderItem, OrderRecord, OrderStatus, Product, Seller, User};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Read access to the registered parties. Registration itself lives elsewhere.
#[async_trait]
pub trait Directory: Send + Sync {
  async fn user_exists(&self, user_id: Uuid) -> Result<bool>;
  async fn find_user(&self, user_id: Uuid) -> Result<Option<User>>;
  async fn find_seller(&self, seller_id: Uuid) -> Result<Option<Seller>>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
  async fn find_product(&self, product_id: Uuid) -> Result<Option<Product>>;

  /// Products among `product_ids` that exist, in no particular order.
  async fn find_products(&self, product_ids: &[Uuid]) -> Result<Vec<Product>>;

  /// Subtracts `quantity` from the product's stock if at least that much is left and
  /// returns the remaining stock. Otherwise fails with `InsufficientStock` and writes
  /// nothing. Linearizable per product.
  async fn decrement_stock(&self, product_id: Uuid, quantity: i32) -> Result<i32>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
  /// The user's cart in the order items were first added.
  async fn list_items(&self, user_id: Uuid) -> Result<Vec<CartItem>>;

  /// Adds `quantity` to the user's line for `product_id`, creating it if absent. A merge
  /// that would overflow the line fails with `InvalidQuantity` and changes nothing.
  async fn upsert_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartItem>;

  /// Replaces the quantity. `None` when the item does not exist.
  async fn set_quantity(&self, item_id: Uuid, quantity: i32) -> Result<Option<CartItem>>;

  /// Idempotent.
  async fn remove_item(&self, item_id: Uuid) -> Result<()>;

  /// Removes every line of the user's cart and returns how many there were. Idempotent.
  async fn clear(&self, user_id: Uuid) -> Result<u64>;
}

#[async_trait]
pub trait OrderLedger: Send + Sync {
  async fn find_by_id(&self, order_id: Uuid) -> Result<Option<OrderRecord>>;
  async fn list_all(&self) -> Result<Vec<OrderRecord>>;
  /// Newest first by order date.
  async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<OrderRecord>>;
  async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<OrderRecord>>;
  /// Orders with at least one item sold by `seller_id`, each once, newest first.
  async fn list_by_seller(&self, seller_id: Uuid) -> Result<Vec<OrderRecord>>;

  /// Moves the order from `expected` to `next`. `None` if the order does not exist or
  /// is no longer in `expected`.
  async fn update_status(&self, order_id: Uuid, expected: OrderStatus, next: OrderStatus) -> Result<Option<Order>>;

  /// Removes the order and its items. Returns whether anything was removed.
  async fn delete(&self, order_id: Uuid) -> Result<bool>;
}

/// The writes of an order placement, applied as one unit.
#[async_trait]
pub trait PlacementStore: Send + Sync {
  /// In one atomic write: removes exactly the `consumed` cart lines, takes each item's
  /// quantity from its product's stock and stores the order with its items.
  ///
  /// Fails with `CartChanged` when any consumed line is gone or holds another quantity,
  /// with `InsufficientStock` when a product cannot cover its item, and writes nothing
  /// in either case.
  async fn commit_placement(&self, order: &Order, items: &[OrderItem], consumed: &[CartItem]) -> Result<()>;

  /// Undoes a committed placement in one atomic write: deletes the order, gives its
  /// items' quantities back to stock and puts the `consumed` lines back in the cart.
  /// Returns `false`, having written nothing, when the order is not in the ledger.
  async fn revert_placement(&self, order_id: Uuid, consumed: &[CartItem]) -> Result<bool>;
}

/// The store handles the rest of the application works with.
#[derive(Clone)]
pub struct Stores {
  pub directory: Arc<dyn Directory>,
  pub catalog: Arc<dyn CatalogStore>,
  pub carts: Arc<dyn CartStore>,
  pub orders: Arc<dyn OrderLedger>,
  pub placements: Arc<dyn PlacementStore>,
}

impl Stores {
  /// Every handle backed by one adapter.
  pub fn shared<S>(store: Arc<S>) -> Self
  where
    S: Directory + CatalogStore + CartStore + OrderLedger + PlacementStore + 'static,
  {
    Self {
      directory: store.clone(),
      catalog: store.clone(),
      carts: store.clone(),
      orders: store.clone(),
      placements: store,
    }
  }
}

/// Opens the backend selected by `config`.
///
/// The postgres backend is migrated before use. Demo data is only seeded into the
/// memory backend.
pub async fn connect_stores(config: &AppConfig) -> Result<Stores> {
  match config.store_backend {
    StoreBackend::Memory => {
      let store = Arc::new(MemoryStore::new());
      if config.seed_demo_data {
        store.seed_demo();
      }
      info!("Using in-memory store.");
      Ok(Stores::shared(store))
    }
    StoreBackend::Postgres => {
      let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| MarketError::Config("DATABASE_URL is required for the postgres backend".to_string()))?;
      let store = PgStore::connect(url).await?;
      store.migrate().await?;
      if config.seed_demo_data {
        warn!("SEED_DEMO_DATA only applies to the memory backend; ignoring.");
      }
      Ok(Stores::shared(Arc::new(store)))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn memory_backend_opens_without_a_database() {
    let config = AppConfig {
      seed_demo_data: true,
      ..AppConfig::default()
    };
    assert!(connect_stores(&config).await.is_ok());
  }

  #[tokio::test]
  async fn postgres_backend_requires_a_url() {
    let config = AppConfig {
      store_backend: StoreBackend::Postgres,
      database_url: None,
      ..AppConfig::default()
    };
    let err = connect_stores(&config).await.err();
    assert!(matches!(err, Some(MarketError::Config(_))));
  }
}
