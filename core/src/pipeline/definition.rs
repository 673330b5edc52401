// core/src/pipeline/definition.rs

//! The `Pipeline<TData, Err>` struct and its structural editing methods.

use crate::core::handler::{Compensation, Handler};
use crate::core::step::StepDef;
use crate::error::{FlowError, FlowResult};
use std::collections::HashMap;
use std::time::Duration;

/// An ordered set of named steps over a shared `ContextData<TData>`.
///
/// `Err` is what handlers return and what `run` reports. It has to absorb
/// engine failures (missing handler, timeout), hence the `From<FlowError>` bound.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) compensations: HashMap<String, Vec<Compensation<TData, Err>>>,
  pub(crate) default_step_timeout: Option<Duration>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a pipeline from `(step_name, optional)` pairs, in execution order.
  pub fn new(step_defs: &[(&str, bool)]) -> Self {
    Self {
      steps: step_defs
        .iter()
        .map(|(name, optional)| StepDef::new(*name, *optional))
        .collect(),
      on: HashMap::new(),
      compensations: HashMap::new(),
      default_step_timeout: None,
    }
  }

  /// Applies `timeout` to every step that has no timeout of its own.
  pub fn with_default_step_timeout(mut self, timeout: Duration) -> Self {
    self.default_step_timeout = Some(timeout);
    self
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub(crate) fn position_of(&self, step_name: &str) -> FlowResult<usize> {
    self
      .steps
      .iter()
      .position(|s| s.name == step_name)
      .ok_or_else(|| FlowError::StepNotFound {
        step_name: step_name.to_string(),
      })
  }

  fn ensure_step_absent(&self, step_name: &str) -> FlowResult<()> {
    if self.steps.iter().any(|s| s.name == step_name) {
      return Err(FlowError::DuplicateStep {
        step_name: step_name.to_string(),
      });
    }
    Ok(())
  }

  pub fn insert_before_step(&mut self, existing_step: &str, new_step: impl Into<String>, optional: bool) -> FlowResult<()> {
    let idx = self.position_of(existing_step)?;
    let name = new_step.into();
    self.ensure_step_absent(&name)?;
    self.steps.insert(idx, StepDef::new(name, optional));
    Ok(())
  }

  pub fn insert_after_step(&mut self, existing_step: &str, new_step: impl Into<String>, optional: bool) -> FlowResult<()> {
    let idx = self.position_of(existing_step)?;
    let name = new_step.into();
    self.ensure_step_absent(&name)?;
    self.steps.insert(idx + 1, StepDef::new(name, optional));
    Ok(())
  }

  /// Removes a step with its handlers and compensations. Unknown names are a no-op.
  pub fn remove_step(&mut self, step_name: &str) {
    if let Ok(idx) = self.position_of(step_name) {
      self.steps.remove(idx);
      self.on.remove(step_name);
      self.compensations.remove(step_name);
    }
  }

  pub fn set_optional(&mut self, step_name: &str, optional: bool) -> FlowResult<()> {
    let idx = self.position_of(step_name)?;
    if let Some(step) = self.steps.get_mut(idx) {
      step.optional = optional;
    }
    Ok(())
  }

  pub fn set_step_timeout(&mut self, step_name: &str, timeout: Duration) -> FlowResult<()> {
    let idx = self.position_of(step_name)?;
    if let Some(step) = self.steps.get_mut(idx) {
      step.timeout = Some(timeout);
    }
    Ok(())
  }

  /// Effective timeout for a step: its own, else the pipeline default.
  pub(crate) fn timeout_for(&self, step: &StepDef) -> Option<Duration> {
    step.timeout.or(self.default_step_timeout)
  }

  /// Fails with `HandlerMissing` for the first non-optional step that has no forward handler.
  pub(crate) fn validate(&self) -> FlowResult<()> {
    for step in &self.steps {
      let has_handlers = self.on.get(&step.name).is_some_and(|h| !h.is_empty());
      if !has_handlers && !step.optional {
        return Err(FlowError::HandlerMissing {
          step_name: step.name.clone(),
        });
      }
    }
    Ok(())
  }
}
