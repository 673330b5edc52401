// core/src/registry.rs

//! `FlowRegistry<AppErr>`: pipelines keyed by their context type.
//!
//! Callers build a `ContextData<T>` and hand it to `run`; the registry finds the
//! pipeline registered for `T` and converts its error into the application error.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineResult;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// Type-erased runner so pipelines over different context types share one map.
#[async_trait]
trait ErasedRunner<AppErr>: Send + Sync
where
  AppErr: std::error::Error + Send + Sync + 'static,
{
  /// `ctx_obj` must hold the `ContextData<TData>` this runner was registered for.
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, AppErr>;
}

struct TypedRunner<TData, PipeErr, AppErr>
where
  TData: 'static + Send + Sync,
  PipeErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<PipeErr> + From<FlowError> + Send + Sync + 'static,
{
  pipeline: Arc<Pipeline<TData, PipeErr>>,
  _app_err: PhantomData<fn() -> AppErr>,
}

#[async_trait]
impl<TData, PipeErr, AppErr> ErasedRunner<AppErr> for TypedRunner<TData, PipeErr, AppErr>
where
  TData: 'static + Send + Sync,
  PipeErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<PipeErr> + From<FlowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, AppErr> {
    let Ok(ctx_data) = ctx_obj.downcast::<ContextData<TData>>() else {
      // Keys are TypeIds of TData, so a mismatch means the map itself is corrupt.
      return Err(AppErr::from(FlowError::Internal(format!(
        "registry entry for {} received a context of another type",
        std::any::type_name::<TData>()
      ))));
    };
    self.pipeline.run(*ctx_data).await.map_err(AppErr::from)
  }
}

/// Registry of pipelines, one per context type.
pub struct FlowRegistry<AppErr = FlowError>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  runners: RwLock<HashMap<TypeId, Arc<dyn ErasedRunner<AppErr>>>>,
}

impl<AppErr> FlowRegistry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      runners: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `pipeline` for its context type, replacing any earlier registration.
  pub fn register_pipeline<TData, PipeErr>(&self, pipeline: Pipeline<TData, PipeErr>)
  where
    TData: 'static + Send + Sync,
    PipeErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
    AppErr: From<PipeErr>,
  {
    event!(
      Level::DEBUG,
      context_type = %std::any::type_name::<TData>(),
      steps = ?pipeline.step_names(),
      "Registering pipeline."
    );
    let runner = TypedRunner::<TData, PipeErr, AppErr> {
      pipeline: Arc::new(pipeline),
      _app_err: PhantomData,
    };
    self.runners.write().insert(TypeId::of::<TData>(), Arc::new(runner));
  }

  pub fn is_registered<TData: 'static>(&self) -> bool {
    self.runners.read().contains_key(&TypeId::of::<TData>())
  }

  /// Runs the pipeline registered for `TData`.
  #[instrument(name = "FlowRegistry::run", skip_all, fields(context_type = %std::any::type_name::<TData>()))]
  pub async fn run<TData>(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, AppErr>
  where
    TData: 'static + Send + Sync,
  {
    let runner = self.runners.read().get(&TypeId::of::<TData>()).cloned();
    let Some(runner) = runner else {
      let type_name = std::any::type_name::<TData>();
      event!(Level::ERROR, %type_name, "No pipeline registered.");
      return Err(AppErr::from(FlowError::PipelineNotRegistered {
        type_name: type_name.to_string(),
      }));
    };
    runner.run_erased(Box::new(ctx_data)).await
  }
}

impl<AppErr> Default for FlowRegistry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}
