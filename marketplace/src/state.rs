// marketplace/src/state.rs
use crate::config::AppConfig;
use crate::errors::Result;
use crate::services::{CartService, OrderQueries};
use crate::store::Stores;
use crate::workflows::OrderWorkflows;

/// Shared with every HTTP handler.
#[derive(Clone)]
pub struct AppState {
  pub workflows: OrderWorkflows,
  pub carts: CartService,
  pub orders: OrderQueries,
}

impl AppState {
  /// Wires services and registers the workflow pipelines.
  pub fn build(stores: Stores, config: &AppConfig) -> Result<Self> {
    Ok(Self {
      workflows: OrderWorkflows::build(stores.clone(), config)?,
      carts: CartService::new(stores.clone()),
      orders: OrderQueries::new(stores),
    })
  }
}
