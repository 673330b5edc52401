// marketplace/src/models/product.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub seller_id: Uuid,
  pub name: String,
  pub description: Option<String>,
  pub brand: Option<String>,
  pub category: Option<String>,
  pub image_url: Option<String>,
  pub price: Decimal,
  /// Never negative. Placements take from it under a `stock >= quantity` guard.
  pub stock_quantity: i32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Product {
  pub fn new(seller_id: Uuid, name: impl Into<String>, price: Decimal, stock_quantity: i32) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      seller_id,
      name: name.into(),
      description: None,
      brand: None,
      category: None,
      image_url: None,
      price,
      stock_quantity,
      created_at: now,
      updated_at: now,
    }
  }
}
