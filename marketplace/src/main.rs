// marketplace/src/main.rs

use marketplace::config::{AppConfig, LogFormat};
use marketplace::state::AppState;
use marketplace::store::connect_stores;
use marketplace::web::configure_app_routes;

use actix_web::{web, App, HttpServer};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Pretty => builder.init(),
  }
}

fn startup_error(err: impl std::fmt::Display) -> std::io::Error {
  std::io::Error::other(err.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  let app_config = match AppConfig::from_env() {
    Ok(cfg) => cfg,
    Err(e) => {
      init_tracing(LogFormat::Pretty);
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(startup_error(e));
    }
  };
  init_tracing(app_config.log_format);
  tracing::info!(backend = ?app_config.store_backend, "Starting marketplace server...");

  let stores = connect_stores(&app_config).await.map_err(|e| {
    tracing::error!(error = %e, "Failed to open the store backend.");
    startup_error(e)
  })?;

  let app_state = AppState::build(stores, &app_config).map_err(startup_error)?;

  let server_address = app_config.bind_address();
  tracing::info!("Binding server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(web::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
