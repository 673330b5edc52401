// marketplace/src/web/routes.rs

use crate::web::handlers::{cart_handlers, order_handlers};
use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Malformed JSON bodies get the same `{"error", "detail"}` shape as domain errors.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
  let detail = err.to_string();
  InternalError::from_response(
    err,
    HttpResponse::BadRequest().json(json!({"error": "BadRequest", "detail": detail})),
  )
  .into()
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler));
  cfg.service(
    web::scope("/api")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/orders")
          .route("", web::get().to(order_handlers::list_orders_handler))
          .route("", web::post().to(order_handlers::place_order_handler))
          .route("/user/{user_id}", web::get().to(order_handlers::orders_by_user_handler))
          .route("/status/{status}", web::get().to(order_handlers::orders_by_status_handler))
          .route("/seller/{seller_id}", web::get().to(order_handlers::orders_by_seller_handler))
          .route("/{order_id}", web::get().to(order_handlers::get_order_handler))
          .route("/{order_id}", web::delete().to(order_handlers::delete_order_handler))
          .route("/{order_id}/status", web::put().to(order_handlers::update_status_handler)),
      )
      .service(
        web::scope("/cart")
          .route("/user/{user_id}", web::get().to(cart_handlers::view_cart_handler))
          .route("/add", web::post().to(cart_handlers::add_to_cart_handler))
          .route("/clear/{user_id}", web::delete().to(cart_handlers::clear_cart_handler))
          .route("/{item_id}", web::put().to(cart_handlers::update_cart_item_handler))
          .route("/{item_id}", web::delete().to(cart_handlers::remove_cart_item_handler)),
      ),
  );
}
