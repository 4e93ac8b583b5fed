use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::EcommerceError;

/// Every failure leaving the HTTP boundary, rendered as `{ "error": message }`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error(transparent)]
    Domain(#[from] EcommerceError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Domain(err) => match err {
                EcommerceError::Validation(_) | EcommerceError::EmptyCart => StatusCode::BAD_REQUEST,
                EcommerceError::NotFound(_) => StatusCode::NOT_FOUND,
                EcommerceError::NotAuthenticated | EcommerceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                EcommerceError::Forbidden => StatusCode::FORBIDDEN,
                EcommerceError::Conflict(_) | EcommerceError::InvalidTransition { .. } => StatusCode::CONFLICT,
                EcommerceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Domain(EcommerceError::Store(e)) => {
                error!(error = %e, "store failure");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self { ApiError::MalformedRequest(rejection.body_text()) }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self { ApiError::MalformedRequest(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self { ApiError::MalformedRequest(rejection.body_text()) }
}

/// `axum::Json` whose rejection uses the JSON error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

pub type ApiResult<T> = Result<T, ApiError>;
