use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use uuid::Uuid;

use super::error::{ApiJson, ApiPath, ApiQuery, ApiResult};
use super::extract::AuthUser;
use super::AppState;
use crate::domain::aggregates::{Product, ProductDraft};
use crate::services::ProductQuery;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/:id", get(get_product).put(update_product).delete(delete_product))
}

async fn list_products(State(s): State<AppState>, ApiQuery(q): ApiQuery<ProductQuery>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(s.products.list(&q).await?))
}

async fn get_product(State(s): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Json<Product>> {
    Ok(Json(s.products.get(id).await?))
}

async fn create_product(
    State(s): State<AppState>,
    AuthUser(me): AuthUser,
    ApiJson(r): ApiJson<ProductDraft>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    Ok((StatusCode::CREATED, Json(s.products.create(&me, r).await?)))
}

async fn update_product(
    State(s): State<AppState>,
    AuthUser(me): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(r): ApiJson<ProductDraft>,
) -> ApiResult<Json<Product>> {
    Ok(Json(s.products.update(&me, id, r).await?))
}

async fn delete_product(State(s): State<AppState>, AuthUser(me): AuthUser, ApiPath(id): ApiPath<Uuid>) -> ApiResult<StatusCode> {
    s.products.delete(&me, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
