//! Persistence ports.
//!
//! Each resource gets a repository trait. Lookups of absent ids return
//! `Ok(None)` (or `Ok(false)` for deletes); only backend failures and
//! uniqueness violations are errors. There are no cross-resource
//! transactions, and cart/order updates are whole-document writes with no
//! concurrency token, so two concurrent read-modify-write cycles on the same
//! document can lose one of the writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::SessionRecord;
use crate::domain::aggregates::{Cart, Order, OrderStatus, Product, User};
use crate::domain::value_objects::Email;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the email is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &Email) -> StoreResult<Option<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn update_user(&self, user: &User) -> StoreResult<bool>;
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn insert_product(&self, product: &Product) -> StoreResult<()>;
    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>>;
    async fn list_products(&self) -> StoreResult<Vec<Product>>;
    async fn update_product(&self, product: &Product) -> StoreResult<bool>;
    async fn delete_product(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the user already has a cart.
    async fn insert_cart(&self, cart: &Cart) -> StoreResult<()>;
    async fn find_cart(&self, id: Uuid) -> StoreResult<Option<Cart>>;
    async fn find_cart_by_user(&self, user_id: Uuid) -> StoreResult<Option<Cart>>;
    async fn list_carts(&self) -> StoreResult<Vec<Cart>>;
    async fn update_cart(&self, cart: &Cart) -> StoreResult<bool>;
    async fn delete_cart(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert_order(&self, order: &Order) -> StoreResult<()>;
    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>>;
    /// Newest first.
    async fn list_orders(&self) -> StoreResult<Vec<Order>>;
    /// Newest first.
    async fn list_orders_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>>;
    /// Newest first.
    async fn list_orders_by_status(&self, status: OrderStatus) -> StoreResult<Vec<Order>>;
    async fn update_order(&self, order: &Order) -> StoreResult<bool>;
    async fn delete_order(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert_session(&self, session: &SessionRecord) -> StoreResult<()>;
    async fn find_session(&self, token_hash: &str) -> StoreResult<Option<SessionRecord>>;
    async fn delete_session(&self, token_hash: &str) -> StoreResult<bool>;
    async fn delete_sessions_for_user(&self, user_id: Uuid) -> StoreResult<u64>;
    /// Drops every session that expired at or before `now`.
    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

/// A backend that persists every resource.
pub trait Store: UserRepository + ProductRepository + CartRepository + OrderRepository + SessionRepository {}

impl<T> Store for T where T: UserRepository + ProductRepository + CartRepository + OrderRepository + SessionRepository {}
