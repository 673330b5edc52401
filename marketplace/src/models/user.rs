// marketplace/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A buyer. Registration and credentials live elsewhere; orders and carts only
/// need the id, the rest is carried for display.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
  pub id: Uuid,
  pub username: String,
  pub email: String,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub created_at: DateTime<Utc>,
}

impl User {
  pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
    Self {
      id: Uuid::new_v4(),
      username: username.into(),
      email: email.into(),
      first_name: None,
      last_name: None,
      created_at: Utc::now(),
    }
  }
}
