// marketplace/src/projections.rs

//! Response shapes, built from store records plus a pre-fetched [`Lookup`].
//!
//! Everything here is pure. When the lookup lacks a product, seller or user the
//! corresponding fields come out as `None` instead of failing the whole response.

use crate::models::{CartItem, OrderItem, OrderRecord, OrderStatus, Product, Seller, User};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Related records keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Lookup {
  pub products: HashMap<Uuid, Product>,
  pub sellers: HashMap<Uuid, Seller>,
  pub users: HashMap<Uuid, User>,
}

impl Lookup {
  pub fn new(
    products: impl IntoIterator<Item = Product>,
    sellers: impl IntoIterator<Item = Seller>,
    users: impl IntoIterator<Item = User>,
  ) -> Self {
    Self {
      products: products.into_iter().map(|p| (p.id, p)).collect(),
      sellers: sellers.into_iter().map(|s| (s.id, s)).collect(),
      users: users.into_iter().map(|u| (u.id, u)).collect(),
    }
  }

  fn seller_of(&self, product: Option<&Product>) -> Option<&Seller> {
    product.and_then(|p| self.sellers.get(&p.seller_id))
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
  pub id: Uuid,
  pub user_id: Uuid,
  pub user_first_name: Option<String>,
  pub user_last_name: Option<String>,
  pub user_email: Option<String>,
  pub shipping_address: String,
  pub payment_method: String,
  pub status: OrderStatus,
  pub total_amount: Decimal,
  pub order_date: DateTime<Utc>,
  pub items: Vec<OrderItemView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
  pub id: Uuid,
  pub product_id: Uuid,
  pub product_name: Option<String>,
  pub product_brand: Option<String>,
  pub product_category: Option<String>,
  pub product_image_url: Option<String>,
  /// What the product costs now.
  pub product_price: Option<Decimal>,
  /// What it cost when the order was placed.
  pub price: Decimal,
  pub quantity: i32,
  pub line_total: Decimal,
  pub seller_id: Option<Uuid>,
  pub seller_business_name: Option<String>,
  pub seller_first_name: Option<String>,
  pub seller_last_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
  pub id: Uuid,
  pub product_id: Uuid,
  pub product_name: Option<String>,
  pub product_description: Option<String>,
  pub product_price: Option<Decimal>,
  pub product_image_url: Option<String>,
  pub product_category: Option<String>,
  pub product_brand: Option<String>,
  pub stock_quantity: Option<i32>,
  pub quantity: i32,
  pub line_total: Option<Decimal>,
  pub seller_id: Option<Uuid>,
  pub seller_name: Option<String>,
  pub seller_business_name: Option<String>,
}

pub fn order_view(record: &OrderRecord, lookup: &Lookup) -> OrderView {
  let order = &record.order;
  let user = lookup.users.get(&order.user_id);
  OrderView {
    id: order.id,
    user_id: order.user_id,
    user_first_name: user.and_then(|u| u.first_name.clone()),
    user_last_name: user.and_then(|u| u.last_name.clone()),
    user_email: user.map(|u| u.email.clone()),
    shipping_address: order.shipping_address.clone(),
    payment_method: order.payment_method.clone(),
    status: order.status,
    total_amount: order.total_amount,
    order_date: order.order_date,
    items: record.items.iter().map(|item| order_item_view(item, lookup)).collect(),
  }
}

pub fn order_item_view(item: &OrderItem, lookup: &Lookup) -> OrderItemView {
  let product = lookup.products.get(&item.product_id);
  let seller = lookup.seller_of(product);
  OrderItemView {
    id: item.id,
    product_id: item.product_id,
    product_name: product.map(|p| p.name.clone()),
    product_brand: product.and_then(|p| p.brand.clone()),
    product_category: product.and_then(|p| p.category.clone()),
    product_image_url: product.and_then(|p| p.image_url.clone()),
    product_price: product.map(|p| p.price),
    price: item.price,
    quantity: item.quantity,
    line_total: item.line_total(),
    seller_id: product.map(|p| p.seller_id),
    seller_business_name: seller.and_then(|s| s.business_name.clone()),
    seller_first_name: seller.and_then(|s| s.first_name.clone()),
    seller_last_name: seller.and_then(|s| s.last_name.clone()),
  }
}

pub fn cart_item_view(item: &CartItem, lookup: &Lookup) -> CartItemView {
  let product = lookup.products.get(&item.product_id);
  let seller = lookup.seller_of(product);
  CartItemView {
    id: item.id,
    product_id: item.product_id,
    product_name: product.map(|p| p.name.clone()),
    product_description: product.and_then(|p| p.description.clone()),
    product_price: product.map(|p| p.price),
    product_image_url: product.and_then(|p| p.image_url.clone()),
    product_category: product.and_then(|p| p.category.clone()),
    product_brand: product.and_then(|p| p.brand.clone()),
    stock_quantity: product.map(|p| p.stock_quantity),
    quantity: item.quantity,
    line_total: product.map(|p| p.price * Decimal::from(item.quantity)),
    seller_id: product.map(|p| p.seller_id),
    seller_name: seller.and_then(display_name),
    seller_business_name: seller.and_then(|s| s.business_name.clone()),
  }
}

fn display_name(seller: &Seller) -> Option<String> {
  match (&seller.first_name, &seller.last_name) {
    (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
    (Some(only), None) | (None, Some(only)) => Some(only.clone()),
    (None, None) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::Order;

  fn sample() -> (Lookup, OrderRecord) {
    let mut seller = Seller::new("acme", "Acme Corp");
    seller.first_name = Some("Ada".to_string());
    seller.last_name = Some("Lovelace".to_string());
    let mut product = Product::new(seller.id, "Widget", Decimal::new(1200, 2), 4);
    product.brand = Some("Acme".to_string());
    let user = User::new("buyer", "buyer@example.com");

    let order_id = Uuid::new_v4();
    let record = OrderRecord {
      order: Order {
        id: order_id,
        user_id: user.id,
        shipping_address: "1 Main St".to_string(),
        payment_method: "CARD".to_string(),
        status: OrderStatus::Pending,
        total_amount: Decimal::new(2000, 2),
        order_date: Utc::now(),
      },
      items: vec![OrderItem {
        id: Uuid::new_v4(),
        order_id,
        product_id: product.id,
        quantity: 2,
        price: Decimal::new(1000, 2),
      }],
    };
    (Lookup::new([product], [seller], [user]), record)
  }

  #[test]
  fn order_item_keeps_snapshot_and_live_price_apart() {
    let (lookup, record) = sample();
    let view = order_item_view(&record.items[0], &lookup);
    assert_eq!(view.price, Decimal::new(1000, 2));
    assert_eq!(view.product_price, Some(Decimal::new(1200, 2)));
    assert_eq!(view.line_total, Decimal::new(2000, 2));
    assert_eq!(view.seller_business_name.as_deref(), Some("Acme Corp"));
    assert_eq!(view.product_brand.as_deref(), Some("Acme"));
  }

  #[test]
  fn order_view_carries_user_and_items() {
    let (lookup, record) = sample();
    let view = order_view(&record, &lookup);
    assert_eq!(view.id, record.order.id);
    assert_eq!(view.user_email.as_deref(), Some("buyer@example.com"));
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.total_amount, record.items_total());
  }

  #[test]
  fn missing_related_records_degrade_to_none() {
    let (_, record) = sample();
    let view = order_view(&record, &Lookup::default());
    assert_eq!(view.user_email, None);
    let item = &view.items[0];
    assert_eq!(item.product_name, None);
    assert_eq!(item.seller_id, None);
    assert_eq!(item.price, Decimal::new(1000, 2));
  }

  #[test]
  fn cart_item_view_uses_live_price() {
    let (lookup, _) = sample();
    let product = lookup.products.values().next().cloned().unwrap();
    let item = CartItem {
      id: Uuid::new_v4(),
      user_id: Uuid::new_v4(),
      product_id: product.id,
      quantity: 3,
      added_at: Utc::now(),
    };
    let view = cart_item_view(&item, &lookup);
    assert_eq!(view.line_total, Some(Decimal::new(3600, 2)));
    assert_eq!(view.stock_quantity, Some(4));
    assert_eq!(view.seller_name.as_deref(), Some("Ada Lovelace"));
  }

  #[test]
  fn order_view_serializes_camel_case() {
    let (lookup, record) = sample();
    let json = serde_json::to_value(order_view(&record, &lookup)).unwrap();
    assert_eq!(json["status"], "PENDING");
    assert!(json.get("shippingAddress").is_some());
    assert!(json["items"][0].get("lineTotal").is_some());
  }
}
