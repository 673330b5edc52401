// marketplace/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::Result;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequestPayload {
  pub user_id: Uuid,
  pub shipping_address: String,
  pub payment_method: String,
}

#[derive(Deserialize, Debug)]
pub struct UpdateStatusRequestPayload {
  pub status: String,
}

#[instrument(
  name = "handler::place_order",
  skip(app_state, req_payload),
  fields(user_id = %req_payload.user_id)
)]
pub async fn place_order_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<PlaceOrderRequestPayload>,
) -> Result<HttpResponse> {
  let PlaceOrderRequestPayload {
    user_id,
    shipping_address,
    payment_method,
  } = req_payload.into_inner();

  let record = app_state
    .workflows
    .place_order(user_id, shipping_address, payment_method)
    .await?;
  info!("Order {} created for user {}.", record.order.id, user_id);

  let view = app_state.orders.render_committed(&record).await;
  Ok(HttpResponse::Created().json(view))
}

#[instrument(name = "handler::list_orders", skip(app_state))]
pub async fn list_orders_handler(app_state: web::Data<AppState>) -> Result<HttpResponse> {
  Ok(HttpResponse::Ok().json(app_state.orders.all().await?))
}

#[instrument(name = "handler::get_order", skip(app_state))]
pub async fn get_order_handler(app_state: web::Data<AppState>, order_id: web::Path<Uuid>) -> Result<HttpResponse> {
  Ok(HttpResponse::Ok().json(app_state.orders.by_id(order_id.into_inner()).await?))
}

#[instrument(name = "handler::orders_by_user", skip(app_state))]
pub async fn orders_by_user_handler(
  app_state: web::Data<AppState>,
  user_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
  Ok(HttpResponse::Ok().json(app_state.orders.by_user(user_id.into_inner()).await?))
}

#[instrument(name = "handler::orders_by_status", skip(app_state))]
pub async fn orders_by_status_handler(
  app_state: web::Data<AppState>,
  status: web::Path<String>,
) -> Result<HttpResponse> {
  Ok(HttpResponse::Ok().json(app_state.orders.by_status(&status).await?))
}

#[instrument(name = "handler::orders_by_seller", skip(app_state))]
pub async fn orders_by_seller_handler(
  app_state: web::Data<AppState>,
  seller_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
  Ok(HttpResponse::Ok().json(app_state.orders.by_seller(seller_id.into_inner()).await?))
}

#[instrument(name = "handler::update_order_status", skip(app_state, req_payload), fields(status = %req_payload.status))]
pub async fn update_status_handler(
  app_state: web::Data<AppState>,
  order_id: web::Path<Uuid>,
  req_payload: web::Json<UpdateStatusRequestPayload>,
) -> Result<HttpResponse> {
  let updated = app_state
    .workflows
    .update_status(order_id.into_inner(), &req_payload.status)
    .await?;
  Ok(HttpResponse::Ok().json(app_state.orders.render_committed(&updated).await))
}

#[instrument(name = "handler::delete_order", skip(app_state))]
pub async fn delete_order_handler(
  app_state: web::Data<AppState>,
  order_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
  app_state.orders.delete(order_id.into_inner()).await?;
  Ok(HttpResponse::NoContent().finish())
}
