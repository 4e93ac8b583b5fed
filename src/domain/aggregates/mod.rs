//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod user;

pub use product::{Product, ProductDraft, ProductSnapshot};
pub use order::{
    Address, CustomerContact, LineItem, NewOrder, Order, OrderError, OrderStatus, OrderUpdate, PaymentMethod,
    PaymentStatus, StatusChange, Tracking,
};
pub use cart::{Cart, CartItem};
pub use user::{Role, User, UserProfile};
