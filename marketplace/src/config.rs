// marketplace/src/config.rs

use crate::errors::{MarketError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
  Memory,
  Postgres,
}

impl FromStr for StoreBackend {
  type Err = MarketError;

  fn from_str(raw: &str) -> Result<Self> {
    match raw.trim().to_ascii_lowercase().as_str() {
      "memory" => Ok(StoreBackend::Memory),
      "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
      other => Err(MarketError::Config(format!(
        "Invalid STORE_BACKEND '{}': expected 'memory' or 'postgres'",
        other
      ))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

impl FromStr for LogFormat {
  type Err = MarketError;

  fn from_str(raw: &str) -> Result<Self> {
    match raw.trim().to_ascii_lowercase().as_str() {
      "pretty" | "text" => Ok(LogFormat::Pretty),
      "json" => Ok(LogFormat::Json),
      other => Err(MarketError::Config(format!("Invalid LOG_FORMAT '{}'", other))),
    }
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub store_backend: StoreBackend,
  /// Required when `store_backend` is `Postgres`.
  pub database_url: Option<String>,
  /// Upper bound for each step of the order placement workflow.
  pub placement_step_timeout: Duration,
  pub seed_demo_data: bool,
  pub log_format: LogFormat,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 8080,
      store_backend: StoreBackend::Memory,
      database_url: None,
      placement_step_timeout: Duration::from_millis(5000),
      seed_demo_data: false,
      log_format: LogFormat::Pretty,
    }
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the configuration from an arbitrary variable source. Unset variables fall
  /// back to the defaults; set but malformed ones are errors.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let defaults = Self::default();

    let server_host = lookup("SERVER_HOST").unwrap_or(defaults.server_host);
    let server_port = match lookup("SERVER_PORT") {
      Some(raw) => raw
        .parse::<u16>()
        .map_err(|e| MarketError::Config(format!("Invalid SERVER_PORT: {}", e)))?,
      None => defaults.server_port,
    };
    let store_backend = match lookup("STORE_BACKEND") {
      Some(raw) => raw.parse::<StoreBackend>()?,
      None => defaults.store_backend,
    };
    let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
    if store_backend == StoreBackend::Postgres && database_url.is_none() {
      return Err(MarketError::Config(
        "Missing environment variable 'DATABASE_URL' (required for the postgres backend)".to_string(),
      ));
    }
    let placement_step_timeout = match lookup("PLACEMENT_STEP_TIMEOUT_MS") {
      Some(raw) => {
        let millis = raw
          .parse::<u64>()
          .map_err(|e| MarketError::Config(format!("Invalid PLACEMENT_STEP_TIMEOUT_MS: {}", e)))?;
        if millis == 0 {
          return Err(MarketError::Config("PLACEMENT_STEP_TIMEOUT_MS must be positive".to_string()));
        }
        Duration::from_millis(millis)
      }
      None => defaults.placement_step_timeout,
    };
    let seed_demo_data = match lookup("SEED_DEMO_DATA") {
      Some(raw) => raw
        .parse::<bool>()
        .map_err(|e| MarketError::Config(format!("Invalid SEED_DEMO_DATA value: {}", e)))?,
      None => defaults.seed_demo_data,
    };
    let log_format = match lookup("LOG_FORMAT") {
      Some(raw) => raw.parse::<LogFormat>()?,
      None => defaults.log_format,
    };

    Ok(Self {
      server_host,
      server_port,
      store_backend,
      database_url,
      placement_step_timeout,
      seed_demo_data,
      log_format,
    })
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}
