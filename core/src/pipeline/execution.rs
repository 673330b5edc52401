// core/src/pipeline/execution.rs

//! `Pipeline::run`: executes steps in order and rolls back entered steps on failure.

use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::core::handler::BoxFuture;
use crate::core::step::StepDef;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use std::time::Duration;
use tracing::{event, info_span, instrument, Instrument, Level};

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Executes the pipeline against `ctx_data`.
  ///
  /// Structural problems (a required step with no handler) are reported before any
  /// step runs. Once steps are running, the first error or step timeout triggers
  /// rollback of every entered step in reverse order, and that first error is what
  /// the caller gets back. Failing compensations are logged, never surfaced in
  /// place of the original error.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      context_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    self.validate().map_err(Err::from)?;
    event!(Level::DEBUG, "Pipeline execution starting.");

    let mut entered: Vec<&StepDef> = Vec::with_capacity(self.steps.len());

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();
      let handlers = match self.on.get(step_name) {
        Some(handlers) if !handlers.is_empty() => handlers,
        _ => {
          event!(Level::DEBUG, step_name, "Optional step has no handlers, skipping.");
          continue;
        }
      };

      entered.push(step_def);
      let step_span = info_span!("pipeline_step", step_name, step_index = step_idx);

      for (handler_idx, handler_fn) in handlers.iter().enumerate() {
        let outcome = self
          .invoke_bounded(step_def, handler_fn(ctx_data.clone()))
          .instrument(step_span.clone())
          .await;

        match outcome {
          Ok(PipelineControl::Continue) => {}
          Ok(PipelineControl::Stop) => {
            event!(Level::INFO, step_name, handler_idx, "Pipeline stopped by a handler.");
            return Ok(PipelineResult::Stopped);
          }
          Err(e) => {
            event!(Level::WARN, step_name, handler_idx, error = %e, "Step failed, rolling back.");
            self.roll_back(&entered, &ctx_data).await;
            return Err(e);
          }
        }
      }
      event!(Level::DEBUG, step_name, "Step finished.");
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }

  /// Awaits `fut`, bounded by the step's effective timeout if it has one.
  async fn invoke_bounded<T>(&self, step_def: &StepDef, fut: BoxFuture<Result<T, Err>>) -> Result<T, Err> {
    match self.timeout_for(step_def) {
      Some(limit) => match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_elapsed) => Err(Err::from(timed_out(&step_def.name, limit))),
      },
      None => fut.await,
    }
  }

  /// Runs compensations for `entered` steps, newest first.
  async fn roll_back(&self, entered: &[&StepDef], ctx_data: &ContextData<TData>) {
    for step_def in entered.iter().rev() {
      let Some(compensations) = self.compensations.get(&step_def.name) else {
        continue;
      };
      for compensation_fn in compensations.iter().rev() {
        let span = info_span!("pipeline_compensation", step_name = %step_def.name);
        let outcome = self
          .invoke_bounded(step_def, compensation_fn(ctx_data.clone()))
          .instrument(span)
          .await;
        match outcome {
          Ok(()) => event!(Level::DEBUG, step_name = %step_def.name, "Step compensated."),
          Err(e) => event!(
            Level::ERROR,
            step_name = %step_def.name,
            error = %e,
            "Compensation failed; state may need manual repair."
          ),
        }
      }
    }
  }
}

fn timed_out(step_name: &str, timeout: Duration) -> FlowError {
  FlowError::StepTimedOut {
    step_name: step_name.to_string(),
    timeout,
  }
}
