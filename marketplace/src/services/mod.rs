// marketplace/src/services/mod.rs

//! Single-entity operations over the stores that need no workflow.

pub mod cart;
pub mod orders;

pub use cart::CartService;
pub use orders::OrderQueries;
