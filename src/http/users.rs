use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use super::error::{ApiJson, ApiPath, ApiResult};
use super::extract::{AuthUser, BearerToken};
use super::AppState;
use crate::domain::aggregates::UserProfile;
use crate::services::{AuthResponse, LoginRequest, RegisterUser, UpdateUser};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(register))
        .route("/users/login", post(login))
        .route("/users/logout", post(logout))
        .route("/users/profile", get(profile))
        .route("/users/:id", get(get_user).put(update_user).delete(delete_user))
}

async fn register(State(s): State<AppState>, ApiJson(r): ApiJson<RegisterUser>) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    Ok((StatusCode::CREATED, Json(s.users.register(r).await?)))
}

async fn login(State(s): State<AppState>, ApiJson(r): ApiJson<LoginRequest>) -> ApiResult<Json<AuthResponse>> {
    Ok(Json(s.users.login(r).await?))
}

async fn logout(State(s): State<AppState>, AuthUser(_): AuthUser, BearerToken(token): BearerToken) -> ApiResult<StatusCode> {
    s.users.logout(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn profile(State(s): State<AppState>, AuthUser(me): AuthUser) -> ApiResult<Json<UserProfile>> {
    Ok(Json(s.users.profile(&me).await?))
}

async fn list_users(State(s): State<AppState>, AuthUser(me): AuthUser) -> ApiResult<Json<Vec<UserProfile>>> {
    Ok(Json(s.users.list(&me).await?))
}

async fn get_user(State(s): State<AppState>, AuthUser(me): AuthUser, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Json<UserProfile>> {
    Ok(Json(s.users.get(&me, id).await?))
}

async fn update_user(
    State(s): State<AppState>,
    AuthUser(me): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(r): ApiJson<UpdateUser>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(s.users.update(&me, id, r).await?))
}

async fn delete_user(State(s): State<AppState>, AuthUser(me): AuthUser, ApiPath(id): ApiPath<Uuid>) -> ApiResult<StatusCode> {
    s.users.delete(&me, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
