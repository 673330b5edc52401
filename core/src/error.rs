// core/src/error.rs
use std::time::Duration;

use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Framework-level failures raised by the engine itself.
///
/// Application error types used as a pipeline's `Err` must implement
/// `From<FlowError>` so these can surface through `Pipeline::run`.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Step already defined: {step_name}")]
  DuplicateStep { step_name: String },

  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Step '{step_name}' did not finish within {timeout:?}")]
  StepTimedOut { step_name: String, timeout: Duration },

  #[error("No pipeline registered for context type {type_name}")]
  PipelineNotRegistered { type_name: String },

  #[error("Error in handler or external operation: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  #[error("Internal flow error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    // Unwrap a FlowError that was boxed into anyhow on its way up rather than nesting it.
    match err.downcast::<FlowError>() {
      Ok(flow_err) => flow_err,
      Err(source) => FlowError::HandlerError { source },
    }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
