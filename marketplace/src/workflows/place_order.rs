// marketplace/src/workflows/place_order.rs

//! Order placement: turns a user's cart into a persisted order.
//!
//! Steps, in order:
//!
//! | step                | forward                                      | compensation          |
//! |---------------------|----------------------------------------------|-----------------------|
//! | `load_cart`         | user must exist, cart must be non-empty      |                       |
//! | `snapshot_prices`   | capture each product's current price         |                       |
//! | `open_order_header` | PENDING header, total = sum of lines         |                       |
//! | `attach_line_items` | one item per cart line                       |                       |
//! | `commit_order`      | consume cart lines, take stock, store order  | revert the placement  |
//!
//! Only `commit_order` writes, and it writes everything in one atomic store call.
//! When that call fails nothing was written. When it is cut off by the step timeout
//! it may still have landed, so its compensation reverts the placement if the order
//! is in the ledger and does nothing otherwise. Either way the caller observes a
//! complete order with the consumed lines gone from the cart, or no order with cart
//! and stock as they were.

use super::contexts::{PlaceOrderCtxData, PricedLine};
use crate::errors::{MarketError, Result};
use crate::models::{Order, OrderItem, OrderStatus, Product};
use chrono::Utc;
use market_flow::{ContextData, FlowResult, Pipeline, PipelineControl};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{event, info, warn, Level};
use uuid::Uuid;

pub const PLACE_ORDER_STEPS: [&str; 5] = [
  "load_cart",
  "snapshot_prices",
  "open_order_header",
  "attach_line_items",
  "commit_order",
];

pub fn build_place_order_pipeline(step_timeout: Duration) -> FlowResult<Pipeline<PlaceOrderCtxData, MarketError>> {
  let step_defs: Vec<(&str, bool)> = PLACE_ORDER_STEPS.iter().map(|name| (*name, false)).collect();
  let mut p = Pipeline::<PlaceOrderCtxData, MarketError>::new(&step_defs).with_default_step_timeout(step_timeout);

  p.on("load_cart", load_cart)?;
  p.on("snapshot_prices", snapshot_prices)?;
  p.on("open_order_header", open_order_header)?;
  p.on("attach_line_items", attach_line_items)?;
  p.on("commit_order", commit_order)?;
  p.compensate("commit_order", revert_order)?;

  Ok(p)
}

async fn load_cart(ctx_data: ContextData<PlaceOrderCtxData>) -> Result<PipelineControl> {
  let (stores, user_id) = {
    let guard = ctx_data.read();
    (guard.stores.clone(), guard.user_id)
  };

  if !stores.directory.user_exists(user_id).await? {
    return Err(MarketError::not_found("User", user_id));
  }
  let cart = stores.carts.list_items(user_id).await?;
  if cart.is_empty() {
    info!("Place Order (User {}): cart is empty, nothing to place.", user_id);
    return Err(MarketError::EmptyCart { user_id });
  }

  event!(Level::DEBUG, %user_id, lines = cart.len(), "Cart loaded.");
  ctx_data.write().cart = cart;
  Ok(PipelineControl::Continue)
}

async fn snapshot_prices(ctx_data: ContextData<PlaceOrderCtxData>) -> Result<PipelineControl> {
  let (stores, cart) = {
    let guard = ctx_data.read();
    (guard.stores.clone(), guard.cart.clone())
  };

  let product_ids: Vec<Uuid> = cart.iter().map(|item| item.product_id).collect();
  let products: HashMap<Uuid, Product> = stores
    .catalog
    .find_products(&product_ids)
    .await?
    .into_iter()
    .map(|product| (product.id, product))
    .collect();

  let lines = cart
    .iter()
    .map(|item| {
      if item.quantity <= 0 {
        return Err(MarketError::InvalidQuantity {
          quantity: item.quantity,
        });
      }
      let product = products
        .get(&item.product_id)
        .ok_or_else(|| MarketError::not_found("Product", item.product_id))?;
      Ok(PricedLine {
        product_id: product.id,
        quantity: item.quantity,
        unit_price: product.price,
      })
    })
    .collect::<Result<Vec<_>>>()?;

  ctx_data.write().lines = lines;
  Ok(PipelineControl::Continue)
}

async fn open_order_header(ctx_data: ContextData<PlaceOrderCtxData>) -> Result<PipelineControl> {
  let mut guard = ctx_data.write();
  let total_amount: Decimal = guard.lines.iter().map(PricedLine::line_total).sum();
  let order = Order {
    id: Uuid::new_v4(),
    user_id: guard.user_id,
    shipping_address: guard.shipping_address.clone(),
    payment_method: guard.payment_method.clone(),
    status: OrderStatus::Pending,
    total_amount,
    order_date: Utc::now(),
  };
  event!(Level::DEBUG, order_id = %order.id, %total_amount, "Order header opened.");
  guard.order = Some(order);
  Ok(PipelineControl::Continue)
}

async fn attach_line_items(ctx_data: ContextData<PlaceOrderCtxData>) -> Result<PipelineControl> {
  let mut guard = ctx_data.write();
  let order_id = guard
    .order
    .as_ref()
    .map(|order| order.id)
    .ok_or_else(|| MarketError::Internal("line items attached before the order header".to_string()))?;
  let items: Vec<OrderItem> = guard
    .lines
    .iter()
    .map(|line| OrderItem {
      id: Uuid::new_v4(),
      order_id,
      product_id: line.product_id,
      quantity: line.quantity,
      price: line.unit_price,
    })
    .collect();
  guard.items = items;
  Ok(PipelineControl::Continue)
}

async fn commit_order(ctx_data: ContextData<PlaceOrderCtxData>) -> Result<PipelineControl> {
  let (stores, order, items, cart) = {
    let guard = ctx_data.read();
    (guard.stores.clone(), guard.order.clone(), guard.items.clone(), guard.cart.clone())
  };
  let order = order.ok_or_else(|| MarketError::Internal("no order header to commit".to_string()))?;

  stores.placements.commit_placement(&order, &items, &cart).await?;
  info!(
    "Place Order (Order {}): committed {} item(s), total {}.",
    order.id,
    items.len(),
    order.total_amount
  );
  Ok(PipelineControl::Continue)
}

/// Undoes `commit_order` if it landed. A commit that failed left nothing behind, and
/// reverting an order the ledger does not hold is a no-op.
async fn revert_order(ctx_data: ContextData<PlaceOrderCtxData>) -> Result<()> {
  let (stores, order_id, cart) = {
    let guard = ctx_data.read();
    (guard.stores.clone(), guard.order.as_ref().map(|order| order.id), guard.cart.clone())
  };
  let Some(order_id) = order_id else {
    return Ok(());
  };
  match stores.placements.revert_placement(order_id, &cart).await {
    Ok(reverted) => {
      event!(Level::DEBUG, %order_id, reverted, "Placement rolled back.");
      Ok(())
    }
    Err(e) => {
      warn!(%order_id, error = %e, "Could not roll back placement.");
      Err(e)
    }
  }
}
