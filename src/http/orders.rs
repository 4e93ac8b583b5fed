use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::error::{ApiJson, ApiPath, ApiResult};
use super::extract::AuthUser;
use super::AppState;
use crate::domain::aggregates::{Order, OrderStatus, OrderUpdate, Tracking};
use crate::services::{CreateOrder, OrderStats};
use crate::EcommerceError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/stats", get(order_stats))
        .route("/orders/status/:status", get(list_by_status))
        .route("/orders/user/:user_id", get(list_user_orders))
        .route("/orders/:id", get(get_order).put(update_order).delete(delete_order))
        .route("/orders/:id/status", put(update_status))
        .route("/orders/:id/tracking", put(add_tracking))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrackingRequest {
    pub tracking_number: String,
    pub carrier: String,
}

async fn create_order(
    State(s): State<AppState>,
    AuthUser(me): AuthUser,
    ApiJson(r): ApiJson<CreateOrder>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    Ok((StatusCode::CREATED, Json(s.orders.create(&me, r).await?)))
}

async fn list_orders(State(s): State<AppState>, AuthUser(me): AuthUser) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(s.orders.list_all(&me).await?))
}

async fn order_stats(State(s): State<AppState>, AuthUser(me): AuthUser) -> ApiResult<Json<OrderStats>> {
    Ok(Json(s.orders.stats(&me).await?))
}

async fn list_by_status(State(s): State<AppState>, AuthUser(me): AuthUser, ApiPath(status): ApiPath<String>) -> ApiResult<Json<Vec<Order>>> {
    let status: OrderStatus = status.parse().map_err(EcommerceError::from)?;
    Ok(Json(s.orders.list_by_status(&me, status).await?))
}

async fn list_user_orders(State(s): State<AppState>, AuthUser(me): AuthUser, ApiPath(user_id): ApiPath<Uuid>) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(s.orders.list_for_user(&me, user_id).await?))
}

async fn get_order(State(s): State<AppState>, AuthUser(me): AuthUser, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Json<Order>> {
    Ok(Json(s.orders.get(&me, id).await?))
}

async fn update_order(
    State(s): State<AppState>,
    AuthUser(me): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(r): ApiJson<OrderUpdate>,
) -> ApiResult<Json<Order>> {
    Ok(Json(s.orders.update(&me, id, r).await?))
}

async fn delete_order(State(s): State<AppState>, AuthUser(me): AuthUser, ApiPath(id): ApiPath<Uuid>) -> ApiResult<StatusCode> {
    s.orders.delete(&me, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_status(
    State(s): State<AppState>,
    AuthUser(me): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(r): ApiJson<StatusRequest>,
) -> ApiResult<Json<Order>> {
    Ok(Json(s.orders.update_status(&me, id, r.status, r.note).await?))
}

async fn add_tracking(
    State(s): State<AppState>,
    AuthUser(me): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(r): ApiJson<TrackingRequest>,
) -> ApiResult<Json<Order>> {
    let tracking = Tracking { number: r.tracking_number, carrier: r.carrier };
    Ok(Json(s.orders.add_tracking(&me, id, tracking).await?))
}
