// marketplace/src/models/seller.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Seller {
  pub id: Uuid,
  pub username: String,
  pub email: String,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub business_name: Option<String>,
  pub created_at: DateTime<Utc>,
}

impl Seller {
  pub fn new(username: impl Into<String>, business_name: impl Into<String>) -> Self {
    let username = username.into();
    Self {
      id: Uuid::new_v4(),
      email: format!("{}@sellers.example", username),
      username,
      first_name: None,
      last_name: None,
      business_name: Some(business_name.into()),
      created_at: Utc::now(),
    }
  }
}
