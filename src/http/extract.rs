use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{error::ApiError, AppState};
use crate::auth::Identity;
use crate::EcommerceError;

const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// The raw bearer token, from `Authorization: Bearer <token>` or
/// `x-access-token`.
pub struct BearerToken(pub String);

/// The caller behind a valid, unexpired session.
pub struct AuthUser(pub Identity);

fn bearer(parts: &Parts) -> Option<String> {
    let from_authorization = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let from_access_header = || parts.headers.get(ACCESS_TOKEN_HEADER).and_then(|v| v.to_str().ok());
    from_authorization
        .or_else(from_access_header)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        bearer(parts).map(BearerToken).ok_or(ApiError::Domain(EcommerceError::NotAuthenticated))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let identity = state.users.authenticate(&token).await?;
        Ok(AuthUser(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(header: &str, value: &str) -> Parts {
        let (parts, _) = Request::builder().header(header, value).body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn test_token_sources() {
        assert_eq!(bearer(&parts("authorization", "Bearer abc")).as_deref(), Some("abc"));
        assert_eq!(bearer(&parts("x-access-token", "def")).as_deref(), Some("def"));
        assert_eq!(bearer(&parts("authorization", "Basic abc")), None);
        assert_eq!(bearer(&parts("x-access-token", "  ")), None);
    }
}
