// marketplace/src/workflows/contexts.rs

//! Data the workflow pipelines run over. Handlers receive these wrapped in
//! `market_flow::ContextData`.

use crate::models::{CartItem, Order, OrderItem, OrderRecord, OrderStatus};
use crate::store::Stores;
use rust_decimal::Decimal;
use uuid::Uuid;

/// One cart line with the product price captured when the placement read it.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
  pub product_id: Uuid,
  pub quantity: i32,
  pub unit_price: Decimal,
}

impl PricedLine {
  pub fn line_total(&self) -> Decimal {
    self.unit_price * Decimal::from(self.quantity)
  }
}

#[derive(Clone)]
pub struct PlaceOrderCtxData {
  pub stores: Stores,
  pub user_id: Uuid,
  pub shipping_address: String,
  pub payment_method: String,

  /// Cart lines as loaded. The commit consumes exactly these.
  pub cart: Vec<CartItem>,
  pub lines: Vec<PricedLine>,
  pub order: Option<Order>,
  pub items: Vec<OrderItem>,
}

impl PlaceOrderCtxData {
  pub fn new(stores: Stores, user_id: Uuid, shipping_address: String, payment_method: String) -> Self {
    Self {
      stores,
      user_id,
      shipping_address,
      payment_method,
      cart: Vec::new(),
      lines: Vec::new(),
      order: None,
      items: Vec::new(),
    }
  }
}

#[derive(Clone)]
pub struct UpdateStatusCtxData {
  pub stores: Stores,
  pub order_id: Uuid,
  pub requested_status: String,

  pub current: Option<OrderRecord>,
  pub next_status: Option<OrderStatus>,
  pub updated: Option<OrderRecord>,
}

impl UpdateStatusCtxData {
  pub fn new(stores: Stores, order_id: Uuid, requested_status: String) -> Self {
    Self {
      stores,
      order_id,
      requested_status,
      current: None,
      next_status: None,
      updated: None,
    }
  }
}
