// marketplace/src/models/order_item.rs

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Immutable line of an order. `price` is the product price captured at placement.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub price: Decimal,
}

impl OrderItem {
  pub fn line_total(&self) -> Decimal {
    self.price * Decimal::from(self.quantity)
  }
}
