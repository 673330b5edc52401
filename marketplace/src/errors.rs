// marketplace/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use market_flow::FlowError;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MarketError {
  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Invalid quantity {quantity}: must be positive and keep the cart line within range")]
  InvalidQuantity { quantity: i32 },

  #[error("Cart of user {user_id} is empty")]
  EmptyCart { user_id: Uuid },

  #[error("Cart of user {user_id} changed while the order was being placed")]
  CartChanged { user_id: Uuid },

  #[error("Insufficient stock for product {product_id}: requested {requested}")]
  InsufficientStock { product_id: Uuid, requested: i32 },

  #[error("Invalid status transition from {from} to '{to}'")]
  InvalidStatusTransition { from: String, to: String },

  #[error("Persistence failure: {0}")]
  PersistenceFailure(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Workflow Error: {0}")]
  Workflow(FlowError),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl MarketError {
  /// Stable machine-readable name of the error kind, used as the `error` field of
  /// HTTP error bodies.
  pub fn kind(&self) -> &'static str {
    match self {
      MarketError::NotFound(_) => "NotFound",
      MarketError::InvalidQuantity { .. } => "InvalidQuantity",
      MarketError::EmptyCart { .. } => "EmptyCart",
      MarketError::CartChanged { .. } => "CartChanged",
      MarketError::InsufficientStock { .. } => "InsufficientStock",
      MarketError::InvalidStatusTransition { .. } => "InvalidStatusTransition",
      MarketError::PersistenceFailure(_) => "PersistenceFailure",
      MarketError::Config(_) => "Config",
      MarketError::Workflow(_) => "Workflow",
      MarketError::Internal(_) => "Internal",
    }
  }

  pub fn not_found(what: &str, id: Uuid) -> Self {
    MarketError::NotFound(format!("{} with ID {} not found", what, id))
  }
}

impl From<FlowError> for MarketError {
  fn from(err: FlowError) -> Self {
    match err {
      // An overrun step is treated like a failed write: it was rolled back.
      FlowError::StepTimedOut { step_name, timeout } => {
        MarketError::PersistenceFailure(format!("step '{}' did not finish within {:?}", step_name, timeout))
      }
      FlowError::HandlerError { source } => match source.downcast::<MarketError>() {
        Ok(market_err) => market_err,
        Err(source) => MarketError::Workflow(FlowError::HandlerError { source }),
      },
      other => MarketError::Workflow(other),
    }
  }
}

/// Lets `anyhow::Result` code use `?` inside functions returning [`Result`].
impl From<anyhow::Error> for MarketError {
  fn from(err: anyhow::Error) -> Self {
    let err = match err.downcast::<MarketError>() {
      Ok(market_err) => return market_err,
      Err(err) => err,
    };
    match err.downcast::<FlowError>() {
      Ok(flow_err) => MarketError::from(flow_err),
      Err(err) => MarketError::Internal(format!("{:#}", err)),
    }
  }
}

impl From<sqlx::Error> for MarketError {
  fn from(err: sqlx::Error) -> Self {
    MarketError::PersistenceFailure(err.to_string())
  }
}

impl From<sqlx::migrate::MigrateError> for MarketError {
  fn from(err: sqlx::migrate::MigrateError) -> Self {
    MarketError::PersistenceFailure(format!("migration failed: {}", err))
  }
}

impl ResponseError for MarketError {
  fn status_code(&self) -> StatusCode {
    match self {
      MarketError::NotFound(_) => StatusCode::NOT_FOUND,
      MarketError::InvalidQuantity { .. } => StatusCode::BAD_REQUEST,
      MarketError::EmptyCart { .. } => StatusCode::UNPROCESSABLE_ENTITY,
      MarketError::CartChanged { .. }
      | MarketError::InsufficientStock { .. }
      | MarketError::InvalidStatusTransition { .. } => StatusCode::CONFLICT,
      MarketError::PersistenceFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
      MarketError::Config(_) | MarketError::Workflow(_) | MarketError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::info!(application_error = %self, "Rejecting request");
    }
    let mut body = json!({"error": self.kind(), "detail": self.to_string()});
    if let MarketError::InsufficientStock { product_id, .. } = self {
      body["productId"] = json!(product_id);
    }
    HttpResponse::build(status).json(body)
  }
}

pub type Result<T, E = MarketError> = std::result::Result<T, E>;
