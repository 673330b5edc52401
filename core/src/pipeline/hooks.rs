// core/src/pipeline/hooks.rs

//! Registration of forward handlers (`on`) and undo actions (`compensate`).

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use crate::core::handler::{Compensation, Handler};
use crate::error::{FlowError, FlowResult};
use crate::pipeline::definition::Pipeline;
use std::future::Future;
use tracing::{event, Level};

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Registers a forward handler for `step_name`. Several handlers on one step run in
  /// registration order.
  ///
  /// The handler's own error type only needs to convert into the pipeline's `Err`.
  pub fn on<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) -> FlowResult<()>
  where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.position_of(step_name)?;
    let handler: Handler<TData, Err> = Box::new(move |ctx_data| {
      let fut = handler_fn(ctx_data);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    self.on.entry(step_name.to_string()).or_default().push(handler);
    event!(Level::TRACE, %step_name, "Forward handler registered.");
    Ok(())
  }

  /// Registers the undo action for `step_name`.
  ///
  /// During rollback every entered step is compensated, the failing one included,
  /// newest first. A step with several compensations runs them in reverse
  /// registration order.
  pub fn compensate<F, HandlerErr>(
    &mut self,
    step_name: &str,
    compensation_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) -> FlowResult<()>
  where
    F: Future<Output = Result<(), HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.position_of(step_name)?;
    let compensation: Compensation<TData, Err> = Box::new(move |ctx_data| {
      let fut = compensation_fn(ctx_data);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    self
      .compensations
      .entry(step_name.to_string())
      .or_default()
      .push(compensation);
    event!(Level::TRACE, %step_name, "Compensation registered.");
    Ok(())
  }
}
