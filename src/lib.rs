//! Storefront
//!
//! Cart and order core of a small web shop.
//!
//! ## Server
//! - Users with bearer sessions and roles
//! - Product catalog
//! - Per-user server carts that always read live product data
//! - Orders snapshotted at checkout with a fixed status lifecycle
//!   (`pending → processing → shipped → delivered`, `cancelled` from any
//!   non-terminal status)
//!
//! ## Client
//! - [`storefront::CartStore`]: the local-first shopping cart, persisted in
//!   device storage and broadcasting a change notification on every mutation
//! - [`storefront::Session`]: the signed-in user and token
//! - [`storefront::checkout`]: builds and submits an order from the cart

use thiserror::Error;

pub mod auth;
pub mod config;
pub mod domain;
pub mod http;
pub mod pricing;
pub mod publisher;
pub mod services;
pub mod store;
pub mod storefront;

use domain::aggregates::{OrderError, OrderStatus};
use store::StoreError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("{0}")]
    Validation(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Not allowed")]
    Forbidden,

    #[error("{0}")]
    Conflict(String),

    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for EcommerceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => Self::Conflict(message),
            other => Self::Store(other),
        }
    }
}

impl From<OrderError> for EcommerceError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::EmptyCart => Self::EmptyCart,
            OrderError::InvalidTransition { from, to } => Self::InvalidTransition { from, to },
            OrderError::Locked(_) => Self::Conflict(err.to_string()),
            OrderError::MissingField(_) | OrderError::InvalidField { .. } => Self::Validation(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, EcommerceError>;
