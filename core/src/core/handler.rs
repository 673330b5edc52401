// core/src/core/handler.rs

//! Boxed handler types stored by a pipeline.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

/// Future type produced by every stored handler.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Forward action of a step.
///
/// Receives a clone of the run's `ContextData<TData>` and resolves to the
/// control signal for the engine, or to the pipeline's error type.
pub type Handler<TData, Err> =
  Box<dyn Fn(ContextData<TData>) -> BoxFuture<Result<PipelineControl, Err>> + Send + Sync>;

/// Undo action of a step, run during rollback.
///
/// A compensation must tolerate being called for a step that failed halfway:
/// it should undo exactly what the forward handlers recorded in the context.
pub type Compensation<TData, Err> = Box<dyn Fn(ContextData<TData>) -> BoxFuture<Result<(), Err>> + Send + Sync>;
