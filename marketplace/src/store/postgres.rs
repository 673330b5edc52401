// marketplace/src/store/postgres.rs

//! PostgreSQL adapter.
//!
//! Stock decrements are a single guarded `UPDATE`, so concurrent placements can
//! never drive a counter negative. A placement (cart lines consumed, stock taken,
//! order and items written) is one transaction, and so is its revert.

use super::{CartStore, CatalogStore, Directory, OrderLedger, PlacementStore};
use crate::errors::{MarketError, Result};
use crate::models::{CartItem, Order, OrderItem, OrderRecord, OrderStatus, Product, Seller, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::{BTreeMap, HashMap};
use tracing::{event, instrument, Level};
use uuid::Uuid;

const PRODUCT_COLUMNS: &str = "id, seller_id, name, description, brand, category, image_url, price, stock_quantity, \
                               created_at, updated_at";
const CART_COLUMNS: &str = "id, user_id, product_id, quantity, added_at";
const ORDER_COLUMNS: &str = "id, user_id, shipping_address, payment_method, status, total_amount, order_date";

/// SQLSTATE `numeric_value_out_of_range`, raised when an `INTEGER` sum overflows.
const OUT_OF_RANGE: &str = "22003";

/// Maps an integer overflow in the database to `InvalidQuantity { quantity }`.
fn overflow_as_invalid(quantity: i32) -> impl FnOnce(sqlx::Error) -> MarketError {
  move |err| {
    let overflowed =
      matches!(&err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(OUT_OF_RANGE));
    if overflowed {
      MarketError::InvalidQuantity { quantity }
    } else {
      MarketError::from(err)
    }
  }
}

/// Guarded decrement on `conn`. Returns the remaining stock.
async fn take_stock(conn: &mut PgConnection, product_id: Uuid, quantity: i32) -> Result<i32> {
  let remaining = sqlx::query_scalar::<_, i32>(
    "UPDATE products SET stock_quantity = stock_quantity - $1, updated_at = NOW() \
     WHERE id = $2 AND stock_quantity >= $1 RETURNING stock_quantity",
  )
  .bind(quantity)
  .bind(product_id)
  .fetch_optional(&mut *conn)
  .await?;

  match remaining {
    Some(left) => Ok(left),
    None => {
      // Nothing updated: either the product is gone or the guard refused.
      let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
        .bind(product_id)
        .fetch_one(&mut *conn)
        .await?;
      if exists {
        Err(MarketError::InsufficientStock {
          product_id,
          requested: quantity,
        })
      } else {
        Err(MarketError::not_found("Product", product_id))
      }
    }
  }
}

/// Per-product totals, sorted by id so concurrent transactions lock rows in one order.
fn per_product(lines: impl IntoIterator<Item = (Uuid, i32)>) -> Result<BTreeMap<Uuid, i32>> {
  let mut totals = BTreeMap::new();
  for (product_id, quantity) in lines {
    let total: &mut i32 = totals.entry(product_id).or_insert(0);
    *total = total
      .checked_add(quantity)
      .ok_or(MarketError::InvalidQuantity { quantity })?;
  }
  Ok(totals)
}

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

/// `orders` row; `status` is stored as text.
#[derive(FromRow)]
struct OrderRow {
  id: Uuid,
  user_id: Uuid,
  shipping_address: String,
  payment_method: String,
  status: String,
  total_amount: Decimal,
  order_date: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
  type Error = MarketError;

  fn try_from(row: OrderRow) -> Result<Self> {
    let status = row
      .status
      .parse::<OrderStatus>()
      .map_err(|e| MarketError::PersistenceFailure(format!("order {} has corrupt status: {}", row.id, e)))?;
    Ok(Order {
      id: row.id,
      user_id: row.user_id,
      shipping_address: row.shipping_address,
      payment_method: row.payment_method,
      status,
      total_amount: row.total_amount,
      order_date: row.order_date,
    })
  }
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn connect(database_url: &str) -> Result<Self> {
    let pool = PgPoolOptions::new().max_connections(16).connect(database_url).await?;
    event!(Level::INFO, "Connected to PostgreSQL.");
    Ok(Self::new(pool))
  }

  pub async fn migrate(&self) -> Result<()> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    event!(Level::INFO, "Database migrations applied.");
    Ok(())
  }

  /// Loads the items of `rows` and pairs them up, keeping the order of `rows`.
  async fn with_items(&self, rows: Vec<OrderRow>) -> Result<Vec<OrderRecord>> {
    if rows.is_empty() {
      return Ok(Vec::new());
    }
    let order_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let items = sqlx::query_as::<_, OrderItem>(
      "SELECT id, order_id, product_id, quantity, price FROM order_items WHERE order_id = ANY($1) \
       ORDER BY order_id, line_no",
    )
    .bind(&order_ids)
    .fetch_all(&self.pool)
    .await?;

    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in items {
      by_order.entry(item.order_id).or_default().push(item);
    }
    rows
      .into_iter()
      .map(|row| {
        let items = by_order.remove(&row.id).unwrap_or_default();
        Ok(OrderRecord {
          order: Order::try_from(row)?,
          items,
        })
      })
      .collect()
  }

  async fn fetch_orders(&self, sql: &str, arg: Option<Uuid>) -> Result<Vec<OrderRecord>> {
    let query = sqlx::query_as::<_, OrderRow>(sql);
    let query = match arg {
      Some(id) => query.bind(id),
      None => query,
    };
    let rows = query.fetch_all(&self.pool).await?;
    self.with_items(rows).await
  }
}

#[async_trait]
impl Directory for PgStore {
  async fn user_exists(&self, user_id: Uuid) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
      .bind(user_id)
      .fetch_one(&self.pool)
      .await?;
    Ok(exists)
  }

  async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
      "SELECT id, username, email, first_name, last_name, created_at FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(user)
  }

  async fn find_seller(&self, seller_id: Uuid) -> Result<Option<Seller>> {
    let seller = sqlx::query_as::<_, Seller>(
      "SELECT id, username, email, first_name, last_name, business_name, created_at FROM sellers WHERE id = $1",
    )
    .bind(seller_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(seller)
  }
}

#[async_trait]
impl CatalogStore for PgStore {
  async fn find_product(&self, product_id: Uuid) -> Result<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
    let product = sqlx::query_as::<_, Product>(&sql)
      .bind(product_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(product)
  }

  async fn find_products(&self, product_ids: &[Uuid]) -> Result<Vec<Product>> {
    if product_ids.is_empty() {
      return Ok(Vec::new());
    }
    let sql = format!("SELECT {} FROM products WHERE id = ANY($1)", PRODUCT_COLUMNS);
    let products = sqlx::query_as::<_, Product>(&sql)
      .bind(product_ids)
      .fetch_all(&self.pool)
      .await?;
    Ok(products)
  }

  #[instrument(name = "PgStore::decrement_stock", skip(self), err(Display))]
  async fn decrement_stock(&self, product_id: Uuid, quantity: i32) -> Result<i32> {
    let mut conn = self.pool.acquire().await?;
    take_stock(&mut conn, product_id, quantity).await
  }
}

#[async_trait]
impl CartStore for PgStore {
  async fn list_items(&self, user_id: Uuid) -> Result<Vec<CartItem>> {
    let sql = format!(
      "SELECT {} FROM cart_items WHERE user_id = $1 ORDER BY added_at, id",
      CART_COLUMNS
    );
    let items = sqlx::query_as::<_, CartItem>(&sql)
      .bind(user_id)
      .fetch_all(&self.pool)
      .await?;
    Ok(items)
  }

  async fn upsert_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartItem> {
    let sql = format!(
      "INSERT INTO cart_items (id, user_id, product_id, quantity, added_at) VALUES ($1, $2, $3, $4, NOW()) \
       ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity \
       RETURNING {}",
      CART_COLUMNS
    );
    let item = sqlx::query_as::<_, CartItem>(&sql)
      .bind(Uuid::new_v4())
      .bind(user_id)
      .bind(product_id)
      .bind(quantity)
      .fetch_one(&self.pool)
      .await
      .map_err(overflow_as_invalid(quantity))?;
    Ok(item)
  }

  async fn set_quantity(&self, item_id: Uuid, quantity: i32) -> Result<Option<CartItem>> {
    let sql = format!(
      "UPDATE cart_items SET quantity = $1 WHERE id = $2 RETURNING {}",
      CART_COLUMNS
    );
    let item = sqlx::query_as::<_, CartItem>(&sql)
      .bind(quantity)
      .bind(item_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(item)
  }

  async fn remove_item(&self, item_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM cart_items WHERE id = $1")
      .bind(item_id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn clear(&self, user_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
      .bind(user_id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected())
  }
}

#[async_trait]
impl OrderLedger for PgStore {
  async fn find_by_id(&self, order_id: Uuid) -> Result<Option<OrderRecord>> {
    let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
    let mut records = self.fetch_orders(&sql, Some(order_id)).await?;
    Ok(records.pop())
  }

  async fn list_all(&self) -> Result<Vec<OrderRecord>> {
    let sql = format!("SELECT {} FROM orders ORDER BY order_date, id", ORDER_COLUMNS);
    self.fetch_orders(&sql, None).await
  }

  async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<OrderRecord>> {
    let sql = format!(
      "SELECT {} FROM orders WHERE user_id = $1 ORDER BY order_date DESC",
      ORDER_COLUMNS
    );
    self.fetch_orders(&sql, Some(user_id)).await
  }

  async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<OrderRecord>> {
    let sql = format!(
      "SELECT {} FROM orders WHERE status = $1 ORDER BY order_date, id",
      ORDER_COLUMNS
    );
    let rows = sqlx::query_as::<_, OrderRow>(&sql)
      .bind(status.as_str())
      .fetch_all(&self.pool)
      .await?;
    self.with_items(rows).await
  }

  async fn list_by_seller(&self, seller_id: Uuid) -> Result<Vec<OrderRecord>> {
    let sql = format!(
      "SELECT {} FROM orders o WHERE EXISTS ( \
         SELECT 1 FROM order_items oi JOIN products p ON p.id = oi.product_id \
         WHERE oi.order_id = o.id AND p.seller_id = $1 \
       ) ORDER BY o.order_date DESC",
      ORDER_COLUMNS
    );
    self.fetch_orders(&sql, Some(seller_id)).await
  }

  async fn update_status(&self, order_id: Uuid, expected: OrderStatus, next: OrderStatus) -> Result<Option<Order>> {
    let sql = format!(
      "UPDATE orders SET status = $1 WHERE id = $2 AND status = $3 RETURNING {}",
      ORDER_COLUMNS
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql)
      .bind(next.as_str())
      .bind(order_id)
      .bind(expected.as_str())
      .fetch_optional(&self.pool)
      .await?;
    row.map(Order::try_from).transpose()
  }

  async fn delete(&self, order_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1")
      .bind(order_id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }
}

#[async_trait]
impl PlacementStore for PgStore {
  #[instrument(name = "PgStore::commit_placement", skip_all, fields(order_id = %order.id, items = items.len()), err(Display))]
  async fn commit_placement(&self, order: &Order, items: &[OrderItem], consumed: &[CartItem]) -> Result<()> {
    // Every early return drops `tx`, which rolls it back.
    let mut tx = self.pool.begin().await?;

    for line in consumed {
      let removed = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2 AND quantity = $3")
        .bind(line.id)
        .bind(order.user_id)
        .bind(line.quantity)
        .execute(&mut *tx)
        .await?;
      if removed.rows_affected() != 1 {
        return Err(MarketError::CartChanged { user_id: order.user_id });
      }
    }

    for (product_id, quantity) in per_product(items.iter().map(|item| (item.product_id, item.quantity)))? {
      take_stock(&mut tx, product_id, quantity).await?;
    }

    sqlx::query(
      "INSERT INTO orders (id, user_id, shipping_address, payment_method, status, total_amount, order_date) \
       VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(&order.shipping_address)
    .bind(&order.payment_method)
    .bind(order.status.as_str())
    .bind(order.total_amount)
    .bind(order.order_date)
    .execute(&mut *tx)
    .await?;

    for (line_no, item) in items.iter().enumerate() {
      sqlx::query(
        "INSERT INTO order_items (id, order_id, line_no, product_id, quantity, price) VALUES ($1, $2, $3, $4, $5, $6)",
      )
      .bind(item.id)
      .bind(item.order_id)
      .bind(line_no as i32)
      .bind(item.product_id)
      .bind(item.quantity)
      .bind(item.price)
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;
    Ok(())
  }

  #[instrument(name = "PgStore::revert_placement", skip(self, consumed), err(Display))]
  async fn revert_placement(&self, order_id: Uuid, consumed: &[CartItem]) -> Result<bool> {
    let mut tx = self.pool.begin().await?;

    let taken = sqlx::query_as::<_, (Uuid, i32)>(
      "DELETE FROM order_items WHERE order_id = $1 RETURNING product_id, quantity",
    )
    .bind(order_id)
    .fetch_all(&mut *tx)
    .await?;
    let removed = sqlx::query("DELETE FROM orders WHERE id = $1")
      .bind(order_id)
      .execute(&mut *tx)
      .await?;
    if removed.rows_affected() == 0 {
      return Ok(false);
    }

    for (product_id, quantity) in per_product(taken)? {
      sqlx::query("UPDATE products SET stock_quantity = stock_quantity + $1, updated_at = NOW() WHERE id = $2")
        .bind(quantity)
        .bind(product_id)
        .execute(&mut *tx)
        .await
        .map_err(overflow_as_invalid(quantity))?;
    }

    for line in consumed {
      sqlx::query(
        "INSERT INTO cart_items (id, user_id, product_id, quantity, added_at) VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity",
      )
      .bind(line.id)
      .bind(line.user_id)
      .bind(line.product_id)
      .bind(line.quantity)
      .bind(line.added_at)
      .execute(&mut *tx)
      .await
      .map_err(overflow_as_invalid(line.quantity))?;
    }

    tx.commit().await?;
    Ok(true)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_range_errors_become_invalid_quantity() {
    let err = overflow_as_invalid(3)(sqlx::Error::RowNotFound);
    assert!(matches!(err, MarketError::PersistenceFailure(_)));
  }

  #[test]
  fn per_product_sums_and_sorts() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let totals = per_product(vec![(b, 2), (a, 1), (b, 3)]).unwrap();
    assert_eq!(totals.get(&b), Some(&5));
    assert_eq!(totals.get(&a), Some(&1));
    let keys: Vec<Uuid> = totals.keys().copied().collect();
    assert!(keys.windows(2).all(|w| w[0] < w[1]));

    let err = per_product(vec![(a, i32::MAX), (a, 1)]).unwrap_err();
    assert!(matches!(err, MarketError::InvalidQuantity { quantity: 1 }));
  }
}
