// core/tests/common/mod.rs
#![allow(dead_code)]

use market_flow::{ContextData, FlowError, PipelineControl};
use once_cell::sync::Lazy;
use std::future::Future;
use std::time::Duration;
use tracing::Level;

/// Records what ran, in order, so tests can assert both forward and undo sequences.
#[derive(Clone, Debug, Default)]
pub struct Journal {
  pub forward: Vec<String>,
  pub undone: Vec<String>,
  pub counter: i32,
  pub stop_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("flow error: {0}")]
  Flow(String),

  #[error("handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(err: FlowError) -> Self {
    TestError::Flow(format!("{:?}", err))
  }
}

pub fn record_step(
  step: &'static str,
) -> impl Fn(ContextData<Journal>) -> std::pin::Pin<Box<dyn Future<Output = Result<PipelineControl, TestError>> + Send>>
     + Send
     + Sync
     + 'static {
  move |ctx: ContextData<Journal>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.forward.push(step.to_string());
      if guard.stop_at.as_deref() == Some(step) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  }
}

pub fn fail_step(
  step: &'static str,
  message: &'static str,
) -> impl Fn(ContextData<Journal>) -> std::pin::Pin<Box<dyn Future<Output = Result<PipelineControl, TestError>> + Send>>
     + Send
     + Sync
     + 'static {
  move |ctx: ContextData<Journal>| {
    Box::pin(async move {
      ctx.write().forward.push(step.to_string());
      Err(TestError::Handler(message.to_string()))
    })
  }
}

pub fn slow_step(
  step: &'static str,
  delay: Duration,
) -> impl Fn(ContextData<Journal>) -> std::pin::Pin<Box<dyn Future<Output = Result<PipelineControl, TestError>> + Send>>
     + Send
     + Sync
     + 'static {
  move |ctx: ContextData<Journal>| {
    Box::pin(async move {
      ctx.write().forward.push(step.to_string());
      tokio::time::sleep(delay).await;
      Ok(PipelineControl::Continue)
    })
  }
}

pub fn undo_step(
  step: &'static str,
) -> impl Fn(ContextData<Journal>) -> std::pin::Pin<Box<dyn Future<Output = Result<(), TestError>> + Send>>
     + Send
     + Sync
     + 'static {
  move |ctx: ContextData<Journal>| {
    Box::pin(async move {
      ctx.write().undone.push(step.to_string());
      Ok(())
    })
  }
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
