//! REST surface under `/api/v1`.

use axum::{routing::get, Json, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::publisher::EventPublisher;
use crate::services::{CartService, OrderService, ProductService, UserService};
use crate::store::Store;

mod carts;
pub mod error;
pub mod extract;
mod orders;
mod products;
mod users;

pub use error::{ApiError, ApiJson, ApiPath, ApiQuery, ApiResult};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub products: Arc<ProductService>,
    pub carts: Arc<CartService>,
    pub orders: Arc<OrderService>,
}

impl AppState {
    /// Wires every service onto one backing store.
    pub fn new<S: Store + 'static>(store: Arc<S>, publisher: EventPublisher, session_ttl: chrono::Duration) -> Self {
        Self {
            users: Arc::new(UserService::new(store.clone(), store.clone(), session_ttl)),
            products: Arc::new(ProductService::new(store.clone(), publisher.clone())),
            carts: Arc::new(CartService::new(store.clone(), store.clone())),
            orders: Arc::new(OrderService::new(store, publisher)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(users::routes())
        .merge(products::routes())
        .merge(carts::routes())
        .merge(orders::routes());

    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront"})) }))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
