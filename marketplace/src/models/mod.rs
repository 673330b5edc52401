// marketplace/src/models/mod.rs

//! Records held by the stores.

pub mod cart_item;
pub mod order;
pub mod order_item;
pub mod product;
pub mod seller;
pub mod user;

pub use cart_item::CartItem;
pub use order::{Order, OrderRecord, OrderStatus};
pub use order_item::OrderItem;
pub use product::Product;
pub use seller::Seller;
pub use user::User;
