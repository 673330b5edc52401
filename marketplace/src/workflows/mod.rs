// marketplace/src/workflows/mod.rs

//! Multi-step business operations, run as `market_flow` pipelines.

pub mod contexts;
pub mod place_order;
pub mod update_status;

use crate::config::AppConfig;
use crate::errors::{MarketError, Result};
use crate::models::OrderRecord;
use crate::store::Stores;
use contexts::{PlaceOrderCtxData, UpdateStatusCtxData};
use market_flow::{ContextData, FlowRegistry, PipelineResult};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Registers every workflow pipeline with `registry`.
///
/// Called once at startup.
pub fn register_all_pipelines(registry: &FlowRegistry<MarketError>, config: &AppConfig) -> Result<()> {
  let step_timeout = config.placement_step_timeout;
  registry.register_pipeline(place_order::build_place_order_pipeline(step_timeout)?);
  registry.register_pipeline(update_status::build_update_status_pipeline(step_timeout)?);
  info!("All workflow pipelines registered.");
  Ok(())
}

/// Entry points for the order workflows.
#[derive(Clone)]
pub struct OrderWorkflows {
  registry: Arc<FlowRegistry<MarketError>>,
  stores: Stores,
}

impl OrderWorkflows {
  pub fn new(registry: Arc<FlowRegistry<MarketError>>, stores: Stores) -> Self {
    Self { registry, stores }
  }

  /// A fresh registry with every pipeline registered.
  pub fn build(stores: Stores, config: &AppConfig) -> Result<Self> {
    let registry = FlowRegistry::<MarketError>::new();
    register_all_pipelines(&registry, config)?;
    Ok(Self::new(Arc::new(registry), stores))
  }

  /// Places an order from the user's cart.
  ///
  /// On success the order and its items are persisted, stock is decremented and the
  /// placed cart lines are gone. On failure nothing has changed.
  #[instrument(name = "OrderWorkflows::place_order", skip(self, shipping_address, payment_method), err(Display))]
  pub async fn place_order(&self, user_id: Uuid, shipping_address: String, payment_method: String) -> Result<OrderRecord> {
    let ctx_data = ContextData::new(PlaceOrderCtxData::new(
      self.stores.clone(),
      user_id,
      shipping_address,
      payment_method,
    ));

    match self.registry.run(ctx_data.clone()).await? {
      PipelineResult::Completed => {
        let mut guard = ctx_data.write();
        let order = guard
          .order
          .take()
          .ok_or_else(|| MarketError::Internal("placement completed without an order".to_string()))?;
        let items = std::mem::take(&mut guard.items);
        info!("Order {} placed for user {}.", order.id, user_id);
        Ok(OrderRecord { order, items })
      }
      PipelineResult::Stopped => {
        warn!("Placement for user {} was halted before completion.", user_id);
        Err(MarketError::Internal("order placement was halted".to_string()))
      }
    }
  }

  /// Moves an order along its lifecycle. `status` is matched case-insensitively.
  /// Returns the updated order with its items.
  #[instrument(name = "OrderWorkflows::update_status", skip(self), err(Display))]
  pub async fn update_status(&self, order_id: Uuid, status: &str) -> Result<OrderRecord> {
    let ctx_data = ContextData::new(UpdateStatusCtxData::new(self.stores.clone(), order_id, status.to_string()));

    match self.registry.run(ctx_data.clone()).await? {
      PipelineResult::Completed => ctx_data
        .write()
        .updated
        .take()
        .ok_or_else(|| MarketError::Internal("status update completed without a result".to_string())),
      PipelineResult::Stopped => Err(MarketError::Internal("status update was halted".to_string())),
    }
  }
}
