use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::error::{ApiJson, ApiPath, ApiQuery, ApiResult};
use super::extract::AuthUser;
use super::AppState;
use crate::{
    services::{AddCartItem, CartItemInput, CartView},
    EcommerceError,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/carts", get(list_carts).post(create_cart))
        .route("/carts/:id", get(get_cart).put(replace_cart).delete(delete_cart))
        .route("/carts/user/:user_id", get(get_user_cart))
        .route("/carts/user/:user_id/add", post(add_item))
        .route("/carts/user/:user_id/remove", post(remove_item))
}

#[derive(Debug, Deserialize)]
pub struct ReplaceCartRequest {
    #[serde(default)]
    pub items: Vec<CartItemInput>,
}

/// `?create=false` looks the cart up without creating one (404 when absent).
#[derive(Debug, Deserialize)]
pub struct CartLookup {
    #[serde(default = "create_by_default")]
    pub create: bool,
}

fn create_by_default() -> bool { true }

#[derive(Debug, Deserialize)]
pub struct RemoveCartItemRequest {
    pub product_id: Uuid,
}

async fn create_cart(State(s): State<AppState>, AuthUser(me): AuthUser) -> ApiResult<(StatusCode, Json<CartView>)> {
    Ok((StatusCode::CREATED, Json(s.carts.create(&me).await?)))
}

async fn list_carts(State(s): State<AppState>, AuthUser(me): AuthUser) -> ApiResult<Json<Vec<CartView>>> {
    Ok(Json(s.carts.list(&me).await?))
}

async fn get_cart(State(s): State<AppState>, AuthUser(me): AuthUser, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Json<CartView>> {
    Ok(Json(s.carts.get(&me, id).await?))
}

async fn replace_cart(
    State(s): State<AppState>,
    AuthUser(me): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(r): ApiJson<ReplaceCartRequest>,
) -> ApiResult<Json<CartView>> {
    Ok(Json(s.carts.replace(&me, id, r.items).await?))
}

async fn delete_cart(State(s): State<AppState>, AuthUser(me): AuthUser, ApiPath(id): ApiPath<Uuid>) -> ApiResult<StatusCode> {
    s.carts.delete(&me, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_user_cart(
    State(s): State<AppState>,
    AuthUser(me): AuthUser,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiQuery(q): ApiQuery<CartLookup>,
) -> ApiResult<Json<CartView>> {
    if q.create {
        return Ok(Json(s.carts.get_for_user(&me, user_id).await?));
    }
    let cart = s.carts.find_for_user(&me, user_id).await?.ok_or(EcommerceError::NotFound("Cart"))?;
    Ok(Json(cart))
}

async fn add_item(
    State(s): State<AppState>,
    AuthUser(me): AuthUser,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiJson(r): ApiJson<AddCartItem>,
) -> ApiResult<Json<CartView>> {
    Ok(Json(s.carts.add_item(&me, user_id, r).await?))
}

async fn remove_item(
    State(s): State<AppState>,
    AuthUser(me): AuthUser,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiJson(r): ApiJson<RemoveCartItemRequest>,
) -> ApiResult<Json<CartView>> {
    Ok(Json(s.carts.remove_item(&me, user_id, r.product_id).await?))
}
