// marketplace/src/services/orders.rs

use crate::errors::{MarketError, Result};
use crate::models::{OrderRecord, OrderStatus};
use crate::projections::{order_view, Lookup, OrderView};
use crate::store::Stores;
use futures_util::future::try_join_all;
use std::collections::HashSet;
use tracing::{event, instrument, warn, Level};
use uuid::Uuid;

/// Read side of the order ledger, plus deletion.
#[derive(Clone)]
pub struct OrderQueries {
  stores: Stores,
}

impl OrderQueries {
  pub fn new(stores: Stores) -> Self {
    Self { stores }
  }

  pub async fn all(&self) -> Result<Vec<OrderView>> {
    let records = self.stores.orders.list_all().await?;
    self.render(&records).await
  }

  pub async fn by_id(&self, order_id: Uuid) -> Result<OrderView> {
    let record = self
      .stores
      .orders
      .find_by_id(order_id)
      .await?
      .ok_or_else(|| MarketError::not_found("Order", order_id))?;
    self.render(std::slice::from_ref(&record))
      .await?
      .pop()
      .ok_or_else(|| MarketError::Internal("rendering an order produced no view".to_string()))
  }

  /// Newest first.
  pub async fn by_user(&self, user_id: Uuid) -> Result<Vec<OrderView>> {
    if !self.stores.directory.user_exists(user_id).await? {
      return Err(MarketError::not_found("User", user_id));
    }
    let records = self.stores.orders.list_by_user(user_id).await?;
    self.render(&records).await
  }

  /// `status` is matched case-insensitively. A string naming no status matches no order.
  pub async fn by_status(&self, status: &str) -> Result<Vec<OrderView>> {
    let Ok(status) = status.parse::<OrderStatus>() else {
      event!(Level::DEBUG, %status, "Status filter names no known status.");
      return Ok(Vec::new());
    };
    let records = self.stores.orders.list_by_status(status).await?;
    self.render(&records).await
  }

  /// Orders containing at least one of the seller's products, newest first.
  pub async fn by_seller(&self, seller_id: Uuid) -> Result<Vec<OrderView>> {
    let records = self.stores.orders.list_by_seller(seller_id).await?;
    self.render(&records).await
  }

  /// Removes an order. Deleting a missing order is not an error.
  #[instrument(name = "OrderQueries::delete", skip(self), err(Display))]
  pub async fn delete(&self, order_id: Uuid) -> Result<bool> {
    let removed = self.stores.orders.delete(order_id).await?;
    event!(Level::INFO, %order_id, removed, "Order delete requested.");
    Ok(removed)
  }

  /// View of an order whose write has already succeeded. If the lookups for product,
  /// seller or user details fail, those fields are left empty instead of failing.
  pub async fn render_committed(&self, record: &OrderRecord) -> OrderView {
    match self.render(std::slice::from_ref(record)).await {
      Ok(mut views) if !views.is_empty() => views.remove(0),
      Ok(_) => order_view(record, &Lookup::default()),
      Err(e) => {
        warn!(order_id = %record.order.id, error = %e, "Rendering committed order without lookups.");
        order_view(record, &Lookup::default())
      }
    }
  }

  async fn render(&self, records: &[OrderRecord]) -> Result<Vec<OrderView>> {
    if records.is_empty() {
      return Ok(Vec::new());
    }
    let product_ids: Vec<Uuid> = records
      .iter()
      .flat_map(|record| record.items.iter().map(|item| item.product_id))
      .collect::<HashSet<_>>()
      .into_iter()
      .collect();
    let user_ids: HashSet<Uuid> = records.iter().map(|record| record.order.user_id).collect();

    let products = self.stores.catalog.find_products(&product_ids).await?;
    let seller_ids: HashSet<Uuid> = products.iter().map(|p| p.seller_id).collect();
    let sellers = try_join_all(seller_ids.into_iter().map(|id| self.stores.directory.find_seller(id))).await?;
    let users = try_join_all(user_ids.into_iter().map(|id| self.stores.directory.find_user(id))).await?;

    let lookup = Lookup::new(products, sellers.into_iter().flatten(), users.into_iter().flatten());
    Ok(records.iter().map(|record| order_view(record, &lookup)).collect())
  }
}
