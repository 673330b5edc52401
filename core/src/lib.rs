// core/src/lib.rs

//! market-flow: the asynchronous workflow engine behind the marketplace backend.
//!
//! A [`Pipeline`] is an ordered list of named steps running over one shared,
//! lockable context ([`ContextData`]). Each step has forward handlers and may
//! register a compensating action. When a handler fails (or overruns its step
//! timeout) the engine undoes every step it entered, newest first, and then
//! reports the original failure. This is how a multi-entity operation such as
//! order placement behaves as a single logical transaction even when the
//! stores underneath cannot offer one.
//!
//! Pipelines are usually registered in a [`FlowRegistry`] keyed by their
//! context type, so request handlers only need to build a context and call
//! `registry.run(ctx)`.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::handler::{Compensation, Handler};
pub use crate::core::step::StepDef;

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::FlowRegistry;
