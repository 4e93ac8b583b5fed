//! PostgreSQL document store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use uuid::Uuid;

use super::{
    CartRepository, OrderRepository, ProductRepository, SessionRepository, StoreError, StoreResult, UserRepository,
};
use crate::auth::SessionRecord;
use crate::domain::aggregates::{Cart, Order, OrderStatus, Product, User};
use crate::domain::value_objects::Email;

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects and applies pending migrations.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
        sqlx::migrate!("./migrations").run(&pool).await.map_err(sqlx::Error::from)?;
        Ok(Self { pool })
    }

    async fn fetch_doc<T>(&self, sql: &str, id: Uuid) -> StoreResult<Option<T>>
    where
        T: DeserializeOwned + Send + Unpin + 'static,
    {
        let doc = sqlx::query_scalar::<_, Json<T>>(sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(doc.map(|Json(value)| value))
    }

    async fn fetch_docs<T>(&self, sql: &str) -> StoreResult<Vec<T>>
    where
        T: DeserializeOwned + Send + Unpin + 'static,
    {
        let docs = sqlx::query_scalar::<_, Json<T>>(sql).fetch_all(&self.pool).await?;
        Ok(docs.into_iter().map(|Json(value)| value).collect())
    }

    async fn delete_by_id(&self, sql: &str, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

fn conflict_on_unique(err: sqlx::Error, what: impl FnOnce() -> String) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(what()),
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query("INSERT INTO users (id, email, doc, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(user.id)
            .bind(user.email.as_str())
            .bind(Json(user))
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, || format!("email {} is already registered", user.email)))?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.fetch_doc("SELECT doc FROM users WHERE id = $1", id).await
    }

    async fn find_user_by_email(&self, email: &Email) -> StoreResult<Option<User>> {
        let doc = sqlx::query_scalar::<_, Json<User>>("SELECT doc FROM users WHERE email = $1")
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc.map(|Json(user)| user))
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.fetch_docs("SELECT doc FROM users ORDER BY created_at").await
    }

    async fn update_user(&self, user: &User) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE users SET email = $2, doc = $3, updated_at = $4 WHERE id = $1")
            .bind(user.id)
            .bind(user.email.as_str())
            .bind(Json(user))
            .bind(user.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, || format!("email {} is already registered", user.email)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        self.delete_by_id("DELETE FROM users WHERE id = $1", id).await
    }
}

#[async_trait]
impl ProductRepository for PgStore {
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        sqlx::query("INSERT INTO products (id, doc, created_at, updated_at) VALUES ($1, $2, $3, $4)")
            .bind(product.id)
            .bind(Json(product))
            .bind(product.created_at)
            .bind(product.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        self.fetch_doc("SELECT doc FROM products WHERE id = $1", id).await
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        self.fetch_docs("SELECT doc FROM products ORDER BY created_at DESC, id DESC").await
    }

    async fn update_product(&self, product: &Product) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE products SET doc = $2, updated_at = $3 WHERE id = $1")
            .bind(product.id)
            .bind(Json(product))
            .bind(product.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_product(&self, id: Uuid) -> StoreResult<bool> {
        self.delete_by_id("DELETE FROM products WHERE id = $1", id).await
    }
}

#[async_trait]
impl CartRepository for PgStore {
    async fn insert_cart(&self, cart: &Cart) -> StoreResult<()> {
        sqlx::query("INSERT INTO carts (id, user_id, doc, updated_at) VALUES ($1, $2, $3, $4)")
            .bind(cart.id())
            .bind(cart.user_id())
            .bind(Json(cart))
            .bind(cart.updated_at())
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, || format!("user {} already has a cart", cart.user_id())))?;
        Ok(())
    }

    async fn find_cart(&self, id: Uuid) -> StoreResult<Option<Cart>> {
        self.fetch_doc("SELECT doc FROM carts WHERE id = $1", id).await
    }

    async fn find_cart_by_user(&self, user_id: Uuid) -> StoreResult<Option<Cart>> {
        self.fetch_doc("SELECT doc FROM carts WHERE user_id = $1", user_id).await
    }

    async fn list_carts(&self) -> StoreResult<Vec<Cart>> {
        self.fetch_docs("SELECT doc FROM carts ORDER BY updated_at DESC").await
    }

    async fn update_cart(&self, cart: &Cart) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE carts SET doc = $2, updated_at = $3 WHERE id = $1")
            .bind(cart.id())
            .bind(Json(cart))
            .bind(cart.updated_at())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_cart(&self, id: Uuid) -> StoreResult<bool> {
        self.delete_by_id("DELETE FROM carts WHERE id = $1", id).await
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        sqlx::query("INSERT INTO orders (id, user_id, status, doc, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $5)")
            .bind(order.id())
            .bind(order.user_id())
            .bind(order.status().as_str())
            .bind(Json(order))
            .bind(order.created_at())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        self.fetch_doc("SELECT doc FROM orders WHERE id = $1", id).await
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        self.fetch_docs("SELECT doc FROM orders ORDER BY created_at DESC, id DESC").await
    }

    async fn list_orders_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
        let docs = sqlx::query_scalar::<_, Json<Order>>(
            "SELECT doc FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(docs.into_iter().map(|Json(order)| order).collect())
    }

    async fn list_orders_by_status(&self, status: OrderStatus) -> StoreResult<Vec<Order>> {
        let docs = sqlx::query_scalar::<_, Json<Order>>(
            "SELECT doc FROM orders WHERE status = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(docs.into_iter().map(|Json(order)| order).collect())
    }

    async fn update_order(&self, order: &Order) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE orders SET status = $2, doc = $3, updated_at = NOW() WHERE id = $1")
            .bind(order.id())
            .bind(order.status().as_str())
            .bind(Json(order))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_order(&self, id: Uuid) -> StoreResult<bool> {
        self.delete_by_id("DELETE FROM orders WHERE id = $1", id).await
    }
}

#[async_trait]
impl SessionRepository for PgStore {
    async fn insert_session(&self, session: &SessionRecord) -> StoreResult<()> {
        sqlx::query("INSERT INTO sessions (token_hash, user_id, expires_at, created_at) VALUES ($1, $2, $3, $4)")
            .bind(&session.token_hash)
            .bind(session.user_id)
            .bind(session.expires_at)
            .bind(session.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_session(&self, token_hash: &str) -> StoreResult<Option<SessionRecord>> {
        let session = sqlx::query_as::<_, SessionRecord>(
            "SELECT token_hash, user_id, expires_at, created_at FROM sessions WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn delete_session(&self, token_hash: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1").bind(token_hash).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_sessions_for_user(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1").bind(user_id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1").bind(now).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
