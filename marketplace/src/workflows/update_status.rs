// marketplace/src/workflows/update_status.rs

use super::contexts::UpdateStatusCtxData;
use crate::errors::{MarketError, Result};
use crate::models::{OrderRecord, OrderStatus};
use market_flow::{ContextData, FlowResult, Pipeline, PipelineControl};
use std::time::Duration;
use tracing::{info, warn};

pub fn build_update_status_pipeline(step_timeout: Duration) -> FlowResult<Pipeline<UpdateStatusCtxData, MarketError>> {
  let mut p = Pipeline::<UpdateStatusCtxData, MarketError>::new(&[
    ("load_order", false),
    ("check_transition", false),
    ("persist_status", false),
  ])
  .with_default_step_timeout(step_timeout);

  p.on("load_order", load_order)?;
  p.on("check_transition", check_transition)?;
  p.on("persist_status", persist_status)?;
  Ok(p)
}

async fn load_order(ctx_data: ContextData<UpdateStatusCtxData>) -> Result<PipelineControl> {
  let (stores, order_id) = {
    let guard = ctx_data.read();
    (guard.stores.clone(), guard.order_id)
  };
  let record = stores
    .orders
    .find_by_id(order_id)
    .await?
    .ok_or_else(|| MarketError::not_found("Order", order_id))?;
  ctx_data.write().current = Some(record);
  Ok(PipelineControl::Continue)
}

async fn check_transition(ctx_data: ContextData<UpdateStatusCtxData>) -> Result<PipelineControl> {
  let mut guard = ctx_data.write();
  let current = guard
    .current
    .as_ref()
    .map(|record| record.order.status)
    .ok_or_else(|| MarketError::Internal("transition checked before the order was loaded".to_string()))?;

  let rejected = || MarketError::InvalidStatusTransition {
    from: current.to_string(),
    to: guard.requested_status.clone(),
  };
  let next = guard.requested_status.parse::<OrderStatus>().map_err(|_| rejected())?;
  if !current.can_transition_to(next) {
    warn!("Update Status (Order {}): {} -> {} is not allowed.", guard.order_id, current, next);
    return Err(rejected());
  }

  guard.next_status = Some(next);
  Ok(PipelineControl::Continue)
}

async fn persist_status(ctx_data: ContextData<UpdateStatusCtxData>) -> Result<PipelineControl> {
  let (stores, order_id, current, next) = {
    let guard = ctx_data.read();
    (guard.stores.clone(), guard.order_id, guard.current.clone(), guard.next_status)
  };
  let (Some(current), Some(next)) = (current, next) else {
    return Err(MarketError::Internal("status persisted before it was checked".to_string()));
  };

  let expected = current.order.status;
  match stores.orders.update_status(order_id, expected, next).await? {
    Some(order) => {
      info!("Update Status (Order {}): {} -> {}.", order_id, expected, next);
      // Items never change after placement.
      ctx_data.write().updated = Some(OrderRecord {
        order,
        items: current.items,
      });
      Ok(PipelineControl::Continue)
    }
    // Lost a race: the order vanished or moved on since it was loaded.
    None => match stores.orders.find_by_id(order_id).await? {
      None => Err(MarketError::not_found("Order", order_id)),
      Some(record) => Err(MarketError::InvalidStatusTransition {
        from: record.order.status.to_string(),
        to: next.to_string(),
      }),
    },
  }
}
