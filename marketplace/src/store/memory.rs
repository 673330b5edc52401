// marketplace/src/store/memory.rs

//! In-process adapter for every store trait.
//!
//! Every collection sits behind its own `parking_lot::Mutex` and no lock is held across
//! an `.await`. Placement commits and reverts take several locks, always in the order
//! cart lines, products, orders; every other method holds one lock at a time. Stock
//! check-and-decrement runs entirely under the catalog lock, which makes it
//! linearizable per product.
//!
//! Tests can force failures or delays on any operation through [`MemoryStore::fail_next`],
//! [`MemoryStore::fail_after`], [`MemoryStore::stall_next`] and [`MemoryStore::delay_reply`].

use super::{CartStore, CatalogStore, Directory, OrderLedger, PlacementStore};
use crate::errors::{MarketError, Result};
use crate::models::{CartItem, Order, OrderItem, OrderRecord, OrderStatus, Product, Seller, User};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{event, Level};
use uuid::Uuid;

/// Store operations that can have faults injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
  UserExists,
  FindUser,
  FindSeller,
  FindProduct,
  FindProducts,
  DecrementStock,
  ListCart,
  UpsertCartItem,
  SetCartQuantity,
  RemoveCartItem,
  ClearCart,
  SaveOrder,
  FindOrder,
  ListOrders,
  UpdateStatus,
  DeleteOrder,
  RevertPlacement,
}

#[derive(Default)]
struct Faults {
  /// op -> number of calls still allowed through before one fails.
  failures: HashMap<StoreOp, u32>,
  stalls: HashMap<StoreOp, Duration>,
  /// Delays applied after the write has landed.
  replies: HashMap<StoreOp, Duration>,
}

#[derive(Default)]
pub struct MemoryStore {
  users: Mutex<HashMap<Uuid, User>>,
  sellers: Mutex<HashMap<Uuid, Seller>>,
  products: Mutex<HashMap<Uuid, Product>>,
  cart_items: Mutex<Vec<CartItem>>,
  orders: Mutex<Vec<OrderRecord>>,
  faults: Mutex<Faults>,
}

/// Ids of the records created by [`MemoryStore::seed_demo`].
#[derive(Debug, Clone)]
pub struct DemoSeed {
  pub user_id: Uuid,
  pub seller_id: Uuid,
  pub product_ids: Vec<Uuid>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert_user(&self, user: User) -> Uuid {
    let id = user.id;
    self.users.lock().insert(id, user);
    id
  }

  pub fn insert_seller(&self, seller: Seller) -> Uuid {
    let id = seller.id;
    self.sellers.lock().insert(id, seller);
    id
  }

  pub fn insert_product(&self, product: Product) -> Uuid {
    let id = product.id;
    self.products.lock().insert(id, product);
    id
  }

  /// Current stock of a product, bypassing fault injection.
  pub fn stock_of(&self, product_id: Uuid) -> Option<i32> {
    self.products.lock().get(&product_id).map(|p| p.stock_quantity)
  }

  pub fn order_count(&self) -> usize {
    self.orders.lock().len()
  }

  /// One shopper, one seller and a handful of products.
  pub fn seed_demo(&self) -> DemoSeed {
    let mut shopper = User::new("demo_shopper", "shopper@demo.example");
    shopper.first_name = Some("Demo".to_string());
    shopper.last_name = Some("Shopper".to_string());
    let user_id = self.insert_user(shopper);
    let seller_id = self.insert_seller(Seller::new("demo_seller", "Demo Goods"));

    let catalog = [
      ("Trail Backpack", Decimal::new(5999, 2), 25, "Outdoor"),
      ("Steel Water Bottle", Decimal::new(1850, 2), 100, "Outdoor"),
      ("Wool Socks", Decimal::new(1000, 2), 60, "Apparel"),
    ];
    let product_ids = catalog
      .into_iter()
      .map(|(name, price, stock, category)| {
        let mut product = Product::new(seller_id, name, price, stock);
        product.category = Some(category.to_string());
        product.brand = Some("Demo Goods".to_string());
        self.insert_product(product)
      })
      .collect();

    event!(Level::INFO, %user_id, %seller_id, "Seeded demo data into memory store.");
    DemoSeed {
      user_id,
      seller_id,
      product_ids,
    }
  }

  /// Makes the next call of `op` fail with `PersistenceFailure`.
  pub fn fail_next(&self, op: StoreOp) {
    self.fail_after(op, 0);
  }

  /// Lets `successes` calls of `op` through, then fails the one after.
  pub fn fail_after(&self, op: StoreOp, successes: u32) {
    self.faults.lock().failures.insert(op, successes);
  }

  /// Delays the next call of `op` by `delay` before it does anything.
  pub fn stall_next(&self, op: StoreOp, delay: Duration) {
    self.faults.lock().stalls.insert(op, delay);
  }

  /// Lets the next call of `op` do its work, then holds the answer back for `delay`.
  pub fn delay_reply(&self, op: StoreOp, delay: Duration) {
    self.faults.lock().replies.insert(op, delay);
  }

  async fn enter(&self, op: StoreOp) -> Result<()> {
    let stall = self.faults.lock().stalls.remove(&op);
    if let Some(delay) = stall {
      event!(Level::DEBUG, ?op, ?delay, "Stalling store operation.");
      tokio::time::sleep(delay).await;
    }
    let should_fail = {
      let mut faults = self.faults.lock();
      match faults.failures.get(&op).copied() {
        Some(0) => {
          faults.failures.remove(&op);
          true
        }
        Some(remaining) => {
          faults.failures.insert(op, remaining - 1);
          false
        }
        None => false,
      }
    };
    if should_fail {
      event!(Level::WARN, ?op, "Injected store failure.");
      return Err(MarketError::PersistenceFailure(format!("injected failure in {:?}", op)));
    }
    Ok(())
  }

  async fn reply(&self, ops: &[StoreOp]) {
    let delay: Duration = {
      let mut faults = self.faults.lock();
      ops.iter().filter_map(|op| faults.replies.remove(op)).sum()
    };
    if !delay.is_zero() {
      event!(Level::DEBUG, ?ops, ?delay, "Delaying store reply.");
      tokio::time::sleep(delay).await;
    }
  }

  fn collect_orders(&self, mut keep: impl FnMut(&OrderRecord) -> bool) -> Vec<OrderRecord> {
    self.orders.lock().iter().filter(|record| keep(record)).cloned().collect()
  }
}

/// Newest first; among equal dates the later insert wins.
fn newest_first(mut records: Vec<OrderRecord>) -> Vec<OrderRecord> {
  records.reverse();
  records.sort_by(|a, b| b.order.order_date.cmp(&a.order.order_date));
  records
}

#[async_trait]
impl Directory for MemoryStore {
  async fn user_exists(&self, user_id: Uuid) -> Result<bool> {
    self.enter(StoreOp::UserExists).await?;
    Ok(self.users.lock().contains_key(&user_id))
  }

  async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
    self.enter(StoreOp::FindUser).await?;
    Ok(self.users.lock().get(&user_id).cloned())
  }

  async fn find_seller(&self, seller_id: Uuid) -> Result<Option<Seller>> {
    self.enter(StoreOp::FindSeller).await?;
    Ok(self.sellers.lock().get(&seller_id).cloned())
  }
}

#[async_trait]
impl CatalogStore for MemoryStore {
  async fn find_product(&self, product_id: Uuid) -> Result<Option<Product>> {
    self.enter(StoreOp::FindProduct).await?;
    Ok(self.products.lock().get(&product_id).cloned())
  }

  async fn find_products(&self, product_ids: &[Uuid]) -> Result<Vec<Product>> {
    self.enter(StoreOp::FindProducts).await?;
    let wanted: HashSet<&Uuid> = product_ids.iter().collect();
    let products = self.products.lock();
    Ok(wanted.into_iter().filter_map(|id| products.get(id).cloned()).collect())
  }

  async fn decrement_stock(&self, product_id: Uuid, quantity: i32) -> Result<i32> {
    self.enter(StoreOp::DecrementStock).await?;
    let mut products = self.products.lock();
    let product = products
      .get_mut(&product_id)
      .ok_or_else(|| MarketError::not_found("Product", product_id))?;
    if product.stock_quantity < quantity {
      return Err(MarketError::InsufficientStock {
        product_id,
        requested: quantity,
      });
    }
    product.stock_quantity -= quantity;
    product.updated_at = Utc::now();
    Ok(product.stock_quantity)
  }
}

#[async_trait]
impl CartStore for MemoryStore {
  async fn list_items(&self, user_id: Uuid) -> Result<Vec<CartItem>> {
    self.enter(StoreOp::ListCart).await?;
    Ok(
      self
        .cart_items
        .lock()
        .iter()
        .filter(|item| item.user_id == user_id)
        .cloned()
        .collect(),
    )
  }

  async fn upsert_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartItem> {
    self.enter(StoreOp::UpsertCartItem).await?;
    let mut items = self.cart_items.lock();
    if let Some(existing) = items
      .iter_mut()
      .find(|item| item.user_id == user_id && item.product_id == product_id)
    {
      existing.quantity = existing
        .quantity
        .checked_add(quantity)
        .ok_or(MarketError::InvalidQuantity { quantity })?;
      return Ok(existing.clone());
    }
    let item = CartItem {
      id: Uuid::new_v4(),
      user_id,
      product_id,
      quantity,
      added_at: Utc::now(),
    };
    items.push(item.clone());
    Ok(item)
  }

  async fn set_quantity(&self, item_id: Uuid, quantity: i32) -> Result<Option<CartItem>> {
    self.enter(StoreOp::SetCartQuantity).await?;
    let mut items = self.cart_items.lock();
    Ok(items.iter_mut().find(|item| item.id == item_id).map(|item| {
      item.quantity = quantity;
      item.clone()
    }))
  }

  async fn remove_item(&self, item_id: Uuid) -> Result<()> {
    self.enter(StoreOp::RemoveCartItem).await?;
    self.cart_items.lock().retain(|item| item.id != item_id);
    Ok(())
  }

  async fn clear(&self, user_id: Uuid) -> Result<u64> {
    self.enter(StoreOp::ClearCart).await?;
    let mut items = self.cart_items.lock();
    let before = items.len();
    items.retain(|item| item.user_id != user_id);
    Ok((before - items.len()) as u64)
  }
}

#[async_trait]
impl OrderLedger for MemoryStore {
  async fn find_by_id(&self, order_id: Uuid) -> Result<Option<OrderRecord>> {
    self.enter(StoreOp::FindOrder).await?;
    Ok(self.orders.lock().iter().find(|record| record.order.id == order_id).cloned())
  }

  async fn list_all(&self) -> Result<Vec<OrderRecord>> {
    self.enter(StoreOp::ListOrders).await?;
    Ok(self.orders.lock().clone())
  }

  async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<OrderRecord>> {
    self.enter(StoreOp::ListOrders).await?;
    Ok(newest_first(self.collect_orders(|record| record.order.user_id == user_id)))
  }

  async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<OrderRecord>> {
    self.enter(StoreOp::ListOrders).await?;
    Ok(self.collect_orders(|record| record.order.status == status))
  }

  async fn list_by_seller(&self, seller_id: Uuid) -> Result<Vec<OrderRecord>> {
    self.enter(StoreOp::ListOrders).await?;
    let sellers_products: HashSet<Uuid> = self
      .products
      .lock()
      .values()
      .filter(|product| product.seller_id == seller_id)
      .map(|product| product.id)
      .collect();
    let matching = self.collect_orders(|record| {
      record
        .items
        .iter()
        .any(|item| sellers_products.contains(&item.product_id))
    });
    Ok(newest_first(matching))
  }

  async fn update_status(&self, order_id: Uuid, expected: OrderStatus, next: OrderStatus) -> Result<Option<Order>> {
    self.enter(StoreOp::UpdateStatus).await?;
    let mut orders = self.orders.lock();
    Ok(
      orders
        .iter_mut()
        .find(|record| record.order.id == order_id && record.order.status == expected)
        .map(|record| {
          record.order.status = next;
          record.order.clone()
        }),
    )
  }

  async fn delete(&self, order_id: Uuid) -> Result<bool> {
    self.enter(StoreOp::DeleteOrder).await?;
    let mut orders = self.orders.lock();
    let before = orders.len();
    orders.retain(|record| record.order.id != order_id);
    Ok(orders.len() != before)
  }
}

#[async_trait]
impl PlacementStore for MemoryStore {
  async fn commit_placement(&self, order: &Order, items: &[OrderItem], consumed: &[CartItem]) -> Result<()> {
    for _ in items {
      self.enter(StoreOp::DecrementStock).await?;
    }
    self.enter(StoreOp::SaveOrder).await?;
    self.enter(StoreOp::ClearCart).await?;
    {
      let mut cart_items = self.cart_items.lock();
      let mut products = self.products.lock();
      let mut orders = self.orders.lock();

      for line in consumed {
        let unchanged = cart_items
          .iter()
          .any(|item| item.id == line.id && item.user_id == order.user_id && item.quantity == line.quantity);
        if !unchanged {
          return Err(MarketError::CartChanged { user_id: order.user_id });
        }
      }
      // Per-product totals, in line order so the first short line is the one reported.
      let mut wanted: Vec<(Uuid, i32)> = Vec::new();
      for item in items {
        match wanted.iter_mut().find(|(product_id, _)| *product_id == item.product_id) {
          Some((_, total)) => {
            *total = total
              .checked_add(item.quantity)
              .ok_or(MarketError::InvalidQuantity { quantity: item.quantity })?;
          }
          None => wanted.push((item.product_id, item.quantity)),
        }
      }
      for (product_id, quantity) in &wanted {
        let product = products
          .get(product_id)
          .ok_or_else(|| MarketError::not_found("Product", *product_id))?;
        if product.stock_quantity < *quantity {
          return Err(MarketError::InsufficientStock {
            product_id: *product_id,
            requested: *quantity,
          });
        }
      }
      if orders.iter().any(|record| record.order.id == order.id) {
        return Err(MarketError::PersistenceFailure(format!("order {} already exists", order.id)));
      }

      let now = Utc::now();
      for (product_id, quantity) in wanted {
        if let Some(product) = products.get_mut(&product_id) {
          product.stock_quantity -= quantity;
          product.updated_at = now;
        }
      }
      cart_items.retain(|item| !consumed.iter().any(|line| line.id == item.id));
      orders.push(OrderRecord {
        order: order.clone(),
        items: items.to_vec(),
      });
    }
    self
      .reply(&[StoreOp::DecrementStock, StoreOp::SaveOrder, StoreOp::ClearCart])
      .await;
    Ok(())
  }

  async fn revert_placement(&self, order_id: Uuid, consumed: &[CartItem]) -> Result<bool> {
    self.enter(StoreOp::RevertPlacement).await?;
    let mut cart_items = self.cart_items.lock();
    let mut products = self.products.lock();
    let mut orders = self.orders.lock();

    let Some(position) = orders.iter().position(|record| record.order.id == order_id) else {
      return Ok(false);
    };

    // Work out every new value first so an overflow leaves all three collections alone.
    let mut restocked: HashMap<Uuid, i32> = HashMap::new();
    for item in &orders[position].items {
      let current = match restocked.get(&item.product_id) {
        Some(stock) => *stock,
        None => products
          .get(&item.product_id)
          .map(|p| p.stock_quantity)
          .ok_or_else(|| MarketError::not_found("Product", item.product_id))?,
      };
      let stock = current
        .checked_add(item.quantity)
        .ok_or(MarketError::InvalidQuantity { quantity: item.quantity })?;
      restocked.insert(item.product_id, stock);
    }
    let mut merged: HashMap<Uuid, i32> = HashMap::new();
    for line in consumed {
      if let Some(existing) = cart_items
        .iter()
        .find(|item| item.user_id == line.user_id && item.product_id == line.product_id)
      {
        let base = merged.get(&existing.id).copied().unwrap_or(existing.quantity);
        let quantity = base
          .checked_add(line.quantity)
          .ok_or(MarketError::InvalidQuantity { quantity: line.quantity })?;
        merged.insert(existing.id, quantity);
      }
    }

    let now = Utc::now();
    for (product_id, stock) in restocked {
      if let Some(product) = products.get_mut(&product_id) {
        product.stock_quantity = stock;
        product.updated_at = now;
      }
    }
    for line in consumed {
      let present = cart_items
        .iter()
        .any(|item| item.user_id == line.user_id && item.product_id == line.product_id);
      if !present {
        cart_items.push(line.clone());
      }
    }
    for item in cart_items.iter_mut() {
      if let Some(quantity) = merged.get(&item.id) {
        item.quantity = *quantity;
      }
    }
    orders.remove(position);
    Ok(true)
  }
}
