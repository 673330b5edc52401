// core/src/pipeline/mod.rs

//! `Pipeline<TData, Err>`: definition, handler registration and execution with rollback.

pub mod definition;
pub mod execution;
pub mod hooks;

pub use definition::Pipeline;
