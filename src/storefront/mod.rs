//! Client side of the shop: the local cart, the session and checkout.
//!
//! Everything here runs on the shopper's device against a [`LocalStorage`]
//! and talks to the server only through [`ApiClient`].

pub mod api;
pub mod cart_store;
pub mod checkout;
pub mod session;
pub mod storage;

pub use api::{ApiClient, ClientError};
pub use cart_store::{CartChanged, CartLine, CartStore, CART_KEY};
pub use checkout::{place_order, CardDetails, CheckoutError, CheckoutForm, OrderDraft};
pub use session::{login, logout, Session, TOKEN_KEY, USER_KEY};
pub use storage::{FileStorage, LocalStorage, MemoryStorage, StorageError};
