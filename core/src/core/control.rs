// core/src/core/control.rs

//! Flow-control signals returned by handlers and the outcome of a whole run.

/// Returned by a forward handler to tell the engine whether to keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  /// Run the next handler or step.
  Continue,
  /// Halt the run here. Already-completed steps are kept, nothing is compensated.
  Stop,
}

/// Outcome of a run that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  /// Every step with handlers ran to completion.
  Completed,
  /// A handler returned `PipelineControl::Stop`.
  Stopped,
}
