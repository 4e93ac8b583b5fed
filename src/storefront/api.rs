//! Typed client for the `/api/v1` REST surface.

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use uuid::Uuid;

use crate::domain::aggregates::{Order, Product, UserProfile};
use crate::services::{AddCartItem, AuthResponse, CartView, CreateOrder, LoginRequest, ProductQuery, RegisterUser};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Missing, expired or revoked credentials. The caller should sign out.
    #[error("not authenticated: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("request failed ({status}): {message}")]
    Api { status: StatusCode, message: String },
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://localhost:8083`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: Client::new(), base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let request = self.client.request(method, format!("{}/api/v1{path}", self.base_url));
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn send_empty(request: RequestBuilder) -> Result<(), ClientError> {
        Self::check(request.send().await?).await.map(drop)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.canonical_reason().unwrap_or("request failed").to_string(),
        };
        Err(match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            status => ClientError::Api { status, message },
        })
    }

    pub async fn register(&self, request: &RegisterUser) -> Result<AuthResponse, ClientError> {
        Self::send(self.request(Method::POST, "/users", None).json(request)).await
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ClientError> {
        Self::send(self.request(Method::POST, "/users/login", None).json(request)).await
    }

    pub async fn logout(&self, token: &str) -> Result<(), ClientError> {
        Self::send_empty(self.request(Method::POST, "/users/logout", Some(token))).await
    }

    pub async fn profile(&self, token: &str) -> Result<UserProfile, ClientError> {
        Self::send(self.request(Method::GET, "/users/profile", Some(token))).await
    }

    pub async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, ClientError> {
        Self::send(self.request(Method::GET, "/products", None).query(query)).await
    }

    pub async fn get_product(&self, id: Uuid) -> Result<Product, ClientError> {
        Self::send(self.request(Method::GET, &format!("/products/{id}"), None)).await
    }

    pub async fn user_cart(&self, token: &str, user_id: Uuid) -> Result<CartView, ClientError> {
        Self::send(self.request(Method::GET, &format!("/carts/user/{user_id}"), Some(token))).await
    }

    /// The user's server cart, or `None` when they have none. Never creates one.
    pub async fn find_user_cart(&self, token: &str, user_id: Uuid) -> Result<Option<CartView>, ClientError> {
        let request = self.request(Method::GET, &format!("/carts/user/{user_id}?create=false"), Some(token));
        match Self::send(request).await {
            Ok(cart) => Ok(Some(cart)),
            Err(ClientError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn add_cart_item(&self, token: &str, user_id: Uuid, item: &AddCartItem) -> Result<CartView, ClientError> {
        Self::send(self.request(Method::POST, &format!("/carts/user/{user_id}/add"), Some(token)).json(item)).await
    }

    pub async fn remove_cart_item(&self, token: &str, user_id: Uuid, product_id: Uuid) -> Result<CartView, ClientError> {
        let body = json!({ "product_id": product_id });
        Self::send(self.request(Method::POST, &format!("/carts/user/{user_id}/remove"), Some(token)).json(&body)).await
    }

    pub async fn delete_cart(&self, token: &str, cart_id: Uuid) -> Result<(), ClientError> {
        Self::send_empty(self.request(Method::DELETE, &format!("/carts/{cart_id}"), Some(token))).await
    }

    pub async fn create_order(&self, token: &str, order: &CreateOrder) -> Result<Order, ClientError> {
        Self::send(self.request(Method::POST, "/orders", Some(token)).json(order)).await
    }

    pub async fn get_order(&self, token: &str, id: Uuid) -> Result<Order, ClientError> {
        Self::send(self.request(Method::GET, &format!("/orders/{id}"), Some(token))).await
    }

    pub async fn user_orders(&self, token: &str, user_id: Uuid) -> Result<Vec<Order>, ClientError> {
        Self::send(self.request(Method::GET, &format!("/orders/user/{user_id}"), Some(token))).await
    }
}
