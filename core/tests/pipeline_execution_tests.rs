// core/tests/pipeline_execution_tests.rs
mod common;

use common::*;
use market_flow::{ContextData, FlowError, Pipeline, PipelineControl, PipelineResult};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn runs_steps_in_declared_order() {
  setup_tracing();
  let mut pipeline = Pipeline::<Journal, TestError>::new(&[("a", false), ("b", false), ("c", false)]);
  pipeline.on("a", record_step("a")).unwrap();
  pipeline.on("b", record_step("b")).unwrap();
  pipeline.on("c", record_step("c")).unwrap();

  let ctx = ContextData::new(Journal::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Completed);
  let journal = ctx.snapshot();
  assert_eq!(journal.forward, vec!["a", "b", "c"]);
  assert_eq!(journal.counter, 3);
  assert!(journal.undone.is_empty());
}

#[tokio::test]
#[serial]
async fn multiple_handlers_on_one_step_run_in_registration_order() {
  setup_tracing();
  let mut pipeline = Pipeline::<Journal, TestError>::new(&[("only", false)]);
  pipeline.on("only", record_step("first")).unwrap();
  pipeline.on("only", record_step("second")).unwrap();

  let ctx = ContextData::new(Journal::default());
  pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().forward, vec!["first", "second"]);
}

#[tokio::test]
#[serial]
async fn stop_halts_without_compensation() {
  setup_tracing();
  let mut pipeline = Pipeline::<Journal, TestError>::new(&[("a", false), ("halt", false), ("c", false)]);
  pipeline.on("a", record_step("a")).unwrap();
  pipeline.compensate("a", undo_step("a")).unwrap();
  pipeline.on("halt", record_step("halt")).unwrap();
  pipeline.on("c", record_step("c")).unwrap();

  let ctx = ContextData::new(Journal {
    stop_at: Some("halt".to_string()),
    ..Journal::default()
  });
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Stopped);
  let journal = ctx.snapshot();
  assert_eq!(journal.forward, vec!["a", "halt"]);
  assert!(journal.undone.is_empty());
}

#[tokio::test]
#[serial]
async fn handler_error_is_returned_unchanged() {
  setup_tracing();
  let mut pipeline = Pipeline::<Journal, TestError>::new(&[("good", false), ("bad", false), ("never", false)]);
  pipeline.on("good", record_step("good")).unwrap();
  pipeline.on("bad", fail_step("bad", "boom")).unwrap();
  pipeline.on("never", record_step("never")).unwrap();

  let ctx = ContextData::new(Journal::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap_err(), TestError::Handler("boom".to_string()));
  assert_eq!(ctx.read().forward, vec!["good", "bad"]);
}

#[tokio::test]
#[serial]
async fn missing_handler_on_required_step_fails_before_anything_runs() {
  setup_tracing();
  let mut pipeline = Pipeline::<Journal, TestError>::new(&[("a", false), ("unhandled", false)]);
  pipeline.on("a", record_step("a")).unwrap();

  let ctx = ContextData::new(Journal::default());
  let result = pipeline.run(ctx.clone()).await;

  match result {
    Err(TestError::Flow(msg)) => {
      assert!(msg.contains("HandlerMissing"));
      assert!(msg.contains("unhandled"));
    }
    other => panic!("expected HandlerMissing, got {:?}", other),
  }
  assert!(ctx.read().forward.is_empty(), "no step may run when validation fails");
}

#[tokio::test]
#[serial]
async fn optional_step_without_handlers_is_skipped() {
  setup_tracing();
  let mut pipeline = Pipeline::<Journal, TestError>::new(&[("a", false), ("maybe", true), ("c", false)]);
  pipeline.on("a", record_step("a")).unwrap();
  pipeline.on("c", record_step("c")).unwrap();

  let ctx = ContextData::new(Journal::default());
  assert_eq!(pipeline.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx.read().forward, vec!["a", "c"]);
}

#[tokio::test]
#[serial]
async fn registering_on_unknown_step_is_rejected() {
  let mut pipeline = Pipeline::<Journal, TestError>::new(&[("a", false)]);
  let err = pipeline.on("nope", record_step("nope")).unwrap_err();
  assert!(matches!(err, FlowError::StepNotFound { ref step_name } if step_name == "nope"));
}

#[tokio::test]
#[serial]
async fn structural_edits_keep_order_and_reject_duplicates() {
  let mut pipeline = Pipeline::<Journal, TestError>::new(&[("a", false), ("c", false)]);
  pipeline.insert_after_step("a", "b", false).unwrap();
  pipeline.insert_before_step("a", "start", true).unwrap();
  assert_eq!(pipeline.step_names(), vec!["start", "a", "b", "c"]);

  let dup = pipeline.insert_after_step("c", "b", false).unwrap_err();
  assert!(matches!(dup, FlowError::DuplicateStep { .. }));

  pipeline.remove_step("start");
  pipeline.remove_step("not-there");
  assert_eq!(pipeline.step_names(), vec!["a", "b", "c"]);

  assert!(pipeline.set_optional("missing", true).is_err());
}

#[tokio::test]
#[serial]
async fn handler_may_return_flow_error_directly() {
  setup_tracing();
  let mut pipeline = Pipeline::<Journal, FlowError>::new(&[("task", false)]);
  pipeline
    .on("task", |_ctx: ContextData<Journal>| async move {
      Err::<PipelineControl, _>(FlowError::Internal("intentional".to_string()))
    })
    .unwrap();

  let result = pipeline.run(ContextData::new(Journal::default())).await;
  assert!(matches!(result, Err(FlowError::Internal(ref s)) if s == "intentional"));
}

#[tokio::test]
#[serial]
async fn anyhow_failures_arrive_as_handler_errors() {
  setup_tracing();
  let mut pipeline = Pipeline::<Journal, FlowError>::new(&[("fetch", false)]);
  pipeline
    .on("fetch", |_ctx: ContextData<Journal>| async move {
      Err::<PipelineControl, _>(anyhow::anyhow!("upstream unavailable"))
    })
    .unwrap();

  let err = pipeline.run(ContextData::new(Journal::default())).await.unwrap_err();
  match err {
    FlowError::HandlerError { source } => assert_eq!(source.to_string(), "upstream unavailable"),
    other => panic!("expected HandlerError, got {other:?}"),
  }
}

#[test]
fn flow_error_boxed_in_anyhow_is_not_nested() {
  let wrapped = anyhow::Error::new(FlowError::StepNotFound {
    step_name: "x".to_string(),
  });
  assert!(matches!(FlowError::from(wrapped), FlowError::StepNotFound { .. }));
}
