// marketplace/src/models/order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use super::order_item::OrderItem;

/// Lifecycle of an order.
///
/// ```text
/// PENDING -> PROCESSING -> SHIPPED -> DELIVERED
///               \_______________________^
/// PENDING | PROCESSING -> CANCELLED
/// ```
///
/// `DELIVERED` and `CANCELLED` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
  Pending,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown order status '{0}'")]
pub struct UnknownStatus(pub String);

impl OrderStatus {
  pub const ALL: [OrderStatus; 5] = [
    OrderStatus::Pending,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "PENDING",
      OrderStatus::Processing => "PROCESSING",
      OrderStatus::Shipped => "SHIPPED",
      OrderStatus::Delivered => "DELIVERED",
      OrderStatus::Cancelled => "CANCELLED",
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
  }

  /// Whether `self -> next` is an edge of the lifecycle. Staying in place is not.
  pub fn can_transition_to(&self, next: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
      (self, next),
      (Pending, Processing)
        | (Pending, Cancelled)
        | (Processing, Shipped)
        | (Processing, Delivered)
        | (Processing, Cancelled)
        | (Shipped, Delivered)
    )
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = UnknownStatus;

  /// Case-insensitive; surrounding whitespace is ignored.
  fn from_str(raw: &str) -> Result<Self, Self::Err> {
    let wanted = raw.trim();
    OrderStatus::ALL
      .into_iter()
      .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
      .ok_or_else(|| UnknownStatus(raw.to_string()))
  }
}

/// Order header. `status` is the only field that changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub shipping_address: String,
  pub payment_method: String,
  pub status: OrderStatus,
  pub total_amount: Decimal,
  pub order_date: DateTime<Utc>,
}

/// An order header together with its line items, in line order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRecord {
  pub order: Order,
  pub items: Vec<OrderItem>,
}

impl OrderRecord {
  /// Sum of `price * quantity` over the lines.
  pub fn items_total(&self) -> Decimal {
    self.items.iter().map(OrderItem::line_total).sum()
  }
}
