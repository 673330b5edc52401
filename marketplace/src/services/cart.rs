// marketplace/src/services/cart.rs

use crate::errors::{MarketError, Result};
use crate::models::{CartItem, User};
use crate::projections::{cart_item_view, CartItemView, Lookup};
use crate::store::Stores;
use futures_util::future::try_join_all;
use std::collections::HashSet;
use tracing::{event, instrument, Level};
use uuid::Uuid;

/// Cart operations with the validation the stores leave to their callers.
#[derive(Clone)]
pub struct CartService {
  stores: Stores,
}

fn positive(quantity: i32) -> Result<i32> {
  if quantity <= 0 {
    return Err(MarketError::InvalidQuantity { quantity });
  }
  Ok(quantity)
}

impl CartService {
  pub fn new(stores: Stores) -> Self {
    Self { stores }
  }

  async fn ensure_user(&self, user_id: Uuid) -> Result<()> {
    if !self.stores.directory.user_exists(user_id).await? {
      return Err(MarketError::not_found("User", user_id));
    }
    Ok(())
  }

  pub async fn list_items(&self, user_id: Uuid) -> Result<Vec<CartItem>> {
    self.ensure_user(user_id).await?;
    self.stores.carts.list_items(user_id).await
  }

  pub async fn list_views(&self, user_id: Uuid) -> Result<Vec<CartItemView>> {
    let items = self.list_items(user_id).await?;
    let lookup = self.lookup_for(&items).await?;
    Ok(items.iter().map(|item| cart_item_view(item, &lookup)).collect())
  }

  /// Adds `quantity` of a product, merging with an existing line for it.
  #[instrument(name = "CartService::add_item", skip(self), err(Display))]
  pub async fn add_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartItem> {
    positive(quantity)?;
    self.ensure_user(user_id).await?;
    if self.stores.catalog.find_product(product_id).await?.is_none() {
      return Err(MarketError::not_found("Product", product_id));
    }
    let item = self.stores.carts.upsert_item(user_id, product_id, quantity).await?;
    event!(Level::DEBUG, item_id = %item.id, quantity = item.quantity, "Cart line updated.");
    Ok(item)
  }

  #[instrument(name = "CartService::set_quantity", skip(self), err(Display))]
  pub async fn set_quantity(&self, item_id: Uuid, quantity: i32) -> Result<CartItem> {
    positive(quantity)?;
    self
      .stores
      .carts
      .set_quantity(item_id, quantity)
      .await?
      .ok_or_else(|| MarketError::not_found("Cart item", item_id))
  }

  pub async fn remove_item(&self, item_id: Uuid) -> Result<()> {
    self.stores.carts.remove_item(item_id).await
  }

  pub async fn clear(&self, user_id: Uuid) -> Result<u64> {
    self.ensure_user(user_id).await?;
    self.stores.carts.clear(user_id).await
  }

  /// A single item rendered for a response.
  pub async fn view(&self, item: &CartItem) -> Result<CartItemView> {
    let lookup = self.lookup_for(std::slice::from_ref(item)).await?;
    Ok(cart_item_view(item, &lookup))
  }

  async fn lookup_for(&self, items: &[CartItem]) -> Result<Lookup> {
    let product_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
    let products = self.stores.catalog.find_products(&product_ids).await?;
    let seller_ids: HashSet<Uuid> = products.iter().map(|p| p.seller_id).collect();
    let sellers = try_join_all(seller_ids.into_iter().map(|id| self.stores.directory.find_seller(id))).await?;
    Ok(Lookup::new(products, sellers.into_iter().flatten(), Vec::<User>::new()))
  }
}
