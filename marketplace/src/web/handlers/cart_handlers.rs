// marketplace/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::Result;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequestPayload {
  pub user_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
}

#[derive(Deserialize, Debug)]
pub struct UpdateCartItemRequestPayload {
  pub quantity: i32,
}

#[instrument(name = "handler::view_cart", skip(app_state))]
pub async fn view_cart_handler(app_state: web::Data<AppState>, user_id: web::Path<Uuid>) -> Result<HttpResponse> {
  Ok(HttpResponse::Ok().json(app_state.carts.list_views(user_id.into_inner()).await?))
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, req_payload),
  fields(user_id = %req_payload.user_id, product_id = %req_payload.product_id, quantity = %req_payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<AddToCartRequestPayload>,
) -> Result<HttpResponse> {
  let item = app_state
    .carts
    .add_item(req_payload.user_id, req_payload.product_id, req_payload.quantity)
    .await?;
  info!(
    "Cart of user {} now holds {} of product {}.",
    item.user_id, item.quantity, item.product_id
  );
  Ok(HttpResponse::Ok().json(app_state.carts.view(&item).await?))
}

#[instrument(name = "handler::update_cart_item", skip(app_state, req_payload), fields(quantity = %req_payload.quantity))]
pub async fn update_cart_item_handler(
  app_state: web::Data<AppState>,
  item_id: web::Path<Uuid>,
  req_payload: web::Json<UpdateCartItemRequestPayload>,
) -> Result<HttpResponse> {
  let item = app_state
    .carts
    .set_quantity(item_id.into_inner(), req_payload.quantity)
    .await?;
  Ok(HttpResponse::Ok().json(app_state.carts.view(&item).await?))
}

#[instrument(name = "handler::remove_cart_item", skip(app_state))]
pub async fn remove_cart_item_handler(
  app_state: web::Data<AppState>,
  item_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
  app_state.carts.remove_item(item_id.into_inner()).await?;
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::clear_cart", skip(app_state))]
pub async fn clear_cart_handler(app_state: web::Data<AppState>, user_id: web::Path<Uuid>) -> Result<HttpResponse> {
  app_state.carts.clear(user_id.into_inner()).await?;
  Ok(HttpResponse::NoContent().finish())
}
