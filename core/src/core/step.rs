// core/src/core/step.rs

use std::time::Duration;

/// One named step of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDef {
  pub name: String,
  /// Optional steps may have no handlers; they are skipped instead of failing the run.
  pub optional: bool,
  /// Overrides the pipeline's default step timeout when set.
  pub timeout: Option<Duration>,
}

impl StepDef {
  pub fn new(name: impl Into<String>, optional: bool) -> Self {
    Self {
      name: name.into(),
      optional,
      timeout: None,
    }
  }
}
