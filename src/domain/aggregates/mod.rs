//! Aggregates module
pub mod cart;
pub mod order;
pub mod product;
pub mod user;

pub use cart::{Cart, CartLine};
pub use order::{ContactInfo, Order, OrderLine, OrderStatus, StatusPolicy, TimelineStep};
pub use product::{Product, ProductDraft};
pub use user::{Address, Role, User};
