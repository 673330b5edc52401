// marketplace/src/lib.rs

//! Marketplace backend.
//!
//! Buyers fill carts from a shared catalog and turn them into orders; sellers and
//! administrators follow those orders through their lifecycle. Order placement is
//! the one operation that touches users, carts, products and orders together, and
//! it runs as a compensating `market_flow` pipeline (see [`workflows`]).

pub mod config;
pub mod errors;
pub mod models;
pub mod projections;
pub mod services;
pub mod state;
pub mod store;
pub mod web;
pub mod workflows;

pub use errors::{MarketError, Result};
