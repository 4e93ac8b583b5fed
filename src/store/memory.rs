//! In-process store used by tests and when no database is configured.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    CartRepository, OrderRepository, ProductRepository, SessionRepository, StoreError, StoreResult, UserRepository,
};
use crate::auth::SessionRecord;
use crate::domain::aggregates::{Cart, Order, OrderStatus, Product, User};
use crate::domain::value_objects::Email;

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    products: RwLock<HashMap<Uuid, Product>>,
    carts: RwLock<HashMap<Uuid, Cart>>,
    orders: RwLock<HashMap<Uuid, Order>>,
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then_with(|| b.id().cmp(&a.id())));
    orders
}

/// Replaces `id` in `map` if present.
fn replace<T: Clone>(map: &mut HashMap<Uuid, T>, id: Uuid, value: &T) -> bool {
    match map.get_mut(&id) {
        Some(slot) => {
            *slot = value.clone();
            true
        }
        None => false,
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!("email {} is already registered", user.email)));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &Email) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.values().find(|u| &u.email == email).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn update_user(&self, user: &User) -> StoreResult<bool> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email && u.id != user.id) {
            return Err(StoreError::Conflict(format!("email {} is already registered", user.email)));
        }
        Ok(replace(&mut users, user.id, user))
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.users.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        self.products.write().await.insert(product.id, product.clone());
        Ok(())
    }

    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let mut products: Vec<Product> = self.products.read().await.values().cloned().collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(products)
    }

    async fn update_product(&self, product: &Product) -> StoreResult<bool> {
        Ok(replace(&mut *self.products.write().await, product.id, product))
    }

    async fn delete_product(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.products.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn insert_cart(&self, cart: &Cart) -> StoreResult<()> {
        let mut carts = self.carts.write().await;
        if carts.values().any(|c| c.user_id() == cart.user_id()) {
            return Err(StoreError::Conflict(format!("user {} already has a cart", cart.user_id())));
        }
        carts.insert(cart.id(), cart.clone());
        Ok(())
    }

    async fn find_cart(&self, id: Uuid) -> StoreResult<Option<Cart>> {
        Ok(self.carts.read().await.get(&id).cloned())
    }

    async fn find_cart_by_user(&self, user_id: Uuid) -> StoreResult<Option<Cart>> {
        Ok(self.carts.read().await.values().find(|c| c.user_id() == user_id).cloned())
    }

    async fn list_carts(&self) -> StoreResult<Vec<Cart>> {
        Ok(self.carts.read().await.values().cloned().collect())
    }

    async fn update_cart(&self, cart: &Cart) -> StoreResult<bool> {
        Ok(replace(&mut *self.carts.write().await, cart.id(), cart))
    }

    async fn delete_cart(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.carts.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        self.orders.write().await.insert(order.id(), order.clone());
        Ok(())
    }

    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        Ok(newest_first(self.orders.read().await.values().cloned().collect()))
    }

    async fn list_orders_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
        let orders = self.orders.read().await;
        Ok(newest_first(orders.values().filter(|o| o.user_id() == user_id).cloned().collect()))
    }

    async fn list_orders_by_status(&self, status: OrderStatus) -> StoreResult<Vec<Order>> {
        let orders = self.orders.read().await;
        Ok(newest_first(orders.values().filter(|o| o.status() == status).cloned().collect()))
    }

    async fn update_order(&self, order: &Order) -> StoreResult<bool> {
        Ok(replace(&mut *self.orders.write().await, order.id(), order))
    }

    async fn delete_order(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.orders.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn insert_session(&self, session: &SessionRecord) -> StoreResult<()> {
        self.sessions.write().await.insert(session.token_hash.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, token_hash: &str) -> StoreResult<Option<SessionRecord>> {
        Ok(self.sessions.read().await.get(token_hash).cloned())
    }

    async fn delete_session(&self, token_hash: &str) -> StoreResult<bool> {
        Ok(self.sessions.write().await.remove(token_hash).is_some())
    }

    async fn delete_sessions_for_user(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - sessions.len()) as u64)
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - sessions.len()) as u64)
    }
}
