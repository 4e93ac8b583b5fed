//! Order placement and administration.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{ensure_access, ensure_admin, ensure_staff};
use crate::auth::Identity;
use crate::domain::aggregates::{
    Address, CustomerContact, LineItem, NewOrder, Order, OrderStatus, OrderUpdate, PaymentMethod, Tracking,
};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::Money;
use crate::publisher::EventPublisher;
use crate::store::OrderRepository;
use crate::{EcommerceError, Result};

/// Checkout payload. Any totals the client sends are ignored; they are
/// recomputed from `items`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CreateOrder {
    pub customer: CustomerContact,
    pub shipping_address: Address,
    /// Omitted means "same as shipping".
    #[serde(default)]
    pub billing_address: Option<Address>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct StatusStats {
    pub status: OrderStatus,
    pub count: u64,
    pub total_value: Money,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct OrderStats {
    pub by_status: Vec<StatusStats>,
    pub total_orders: u64,
    /// Excludes cancelled orders.
    pub total_revenue: Money,
}

pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    publisher: EventPublisher,
}

impl OrderService {
    pub fn new(orders: Arc<dyn OrderRepository>, publisher: EventPublisher) -> Self {
        Self { orders, publisher }
    }

    pub async fn create(&self, identity: &Identity, request: CreateOrder) -> Result<Order> {
        let mut order = Order::place(NewOrder {
            user_id: identity.user_id,
            customer: request.customer,
            shipping_address: request.shipping_address,
            billing_address: request.billing_address,
            items: request.items,
            payment_method: request.payment_method,
            notes: request.notes,
        })?;
        self.orders.insert_order(&order).await?;
        info!(order_id = %order.id(), user_id = %order.user_id(), total = %order.total(), "order placed");
        self.publisher.publish_all(order.take_events()).await;
        Ok(order)
    }

    pub async fn get(&self, identity: &Identity, id: Uuid) -> Result<Order> {
        let order = self.find(id).await?;
        ensure_access(identity, order.user_id())?;
        Ok(order)
    }

    pub async fn list_for_user(&self, identity: &Identity, user_id: Uuid) -> Result<Vec<Order>> {
        ensure_access(identity, user_id)?;
        Ok(self.orders.list_orders_by_user(user_id).await?)
    }

    pub async fn list_all(&self, identity: &Identity) -> Result<Vec<Order>> {
        ensure_staff(identity)?;
        Ok(self.orders.list_orders().await?)
    }

    pub async fn list_by_status(&self, identity: &Identity, status: OrderStatus) -> Result<Vec<Order>> {
        ensure_staff(identity)?;
        Ok(self.orders.list_orders_by_status(status).await?)
    }

    pub async fn update(&self, identity: &Identity, id: Uuid, update: OrderUpdate) -> Result<Order> {
        ensure_staff(identity)?;
        let mut order = self.find(id).await?;
        order.apply(update)?;
        self.save(&mut order).await?;
        Ok(order)
    }

    /// A same-status update succeeds without recording anything.
    pub async fn update_status(
        &self,
        identity: &Identity,
        id: Uuid,
        status: OrderStatus,
        note: Option<String>,
    ) -> Result<Order> {
        ensure_staff(identity)?;
        let mut order = self.find(id).await?;
        if order.transition(status, note)? {
            self.save(&mut order).await?;
            info!(order_id = %id, %status, "order status changed");
        }
        Ok(order)
    }

    pub async fn add_tracking(&self, identity: &Identity, id: Uuid, tracking: Tracking) -> Result<Order> {
        ensure_staff(identity)?;
        let mut order = self.find(id).await?;
        order.ship(tracking)?;
        self.save(&mut order).await?;
        Ok(order)
    }

    pub async fn delete(&self, identity: &Identity, id: Uuid) -> Result<()> {
        ensure_admin(identity)?;
        if !self.orders.delete_order(id).await? {
            return Err(EcommerceError::NotFound("Order"));
        }
        info!(order_id = %id, "order deleted");
        self.publisher.publish(&DomainEvent::Order(OrderEvent::Deleted { order_id: id })).await;
        Ok(())
    }

    pub async fn stats(&self, identity: &Identity) -> Result<OrderStats> {
        ensure_staff(identity)?;
        let orders = self.orders.list_orders().await?;
        let by_status = OrderStatus::ALL
            .into_iter()
            .map(|status| {
                let matching = orders.iter().filter(|o| o.status() == status);
                StatusStats {
                    status,
                    count: matching.clone().count() as u64,
                    total_value: matching.map(Order::total).sum(),
                }
            })
            .collect();
        let total_revenue = orders.iter().filter(|o| o.status() != OrderStatus::Cancelled).map(Order::total).sum();
        Ok(OrderStats { by_status, total_orders: orders.len() as u64, total_revenue })
    }

    async fn find(&self, id: Uuid) -> Result<Order> {
        self.orders.find_order(id).await?.ok_or(EcommerceError::NotFound("Order"))
    }

    async fn save(&self, order: &mut Order) -> Result<()> {
        if !self.orders.update_order(order).await? {
            return Err(EcommerceError::NotFound("Order"));
        }
        self.publisher.publish_all(order.take_events()).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{PaymentStatus, Role};
    use crate::domain::value_objects::Quantity;
    use crate::store::MemoryStore;

    fn service() -> OrderService { OrderService::new(Arc::new(MemoryStore::new()), EventPublisher::disabled()) }

    fn customer() -> Identity { Identity { user_id: Uuid::new_v4(), role: Role::User } }
    fn admin() -> Identity { Identity { user_id: Uuid::new_v4(), role: Role::Admin } }

    fn address() -> Address {
        Address {
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            address: "1 Compiler Way".into(),
            city: "Arlington".into(),
            state: "VA".into(),
            zip_code: "22201".into(),
            country: "USA".into(),
        }
    }

    fn request(lines: &[(u32, u32)]) -> CreateOrder {
        CreateOrder {
            customer: CustomerContact {
                first_name: "Grace".into(),
                last_name: "Hopper".into(),
                email: "grace@example.com".into(),
                phone: "555-0199".into(),
            },
            shipping_address: address(),
            billing_address: None,
            items: lines
                .iter()
                .map(|&(cents, qty)| LineItem {
                    product_id: Uuid::new_v4(),
                    name: "Terminal".into(),
                    unit_price: Money::from_cents(cents),
                    quantity: Quantity::new(qty).unwrap(),
                    image: String::new(),
                })
                .collect(),
            payment_method: PaymentMethod::Paypal,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_place_and_fetch() {
        let orders = service();
        let me = customer();
        let order = orders.create(&me, request(&[(2000, 2)])).await.unwrap();
        assert_eq!(order.user_id(), me.user_id);
        assert_eq!(order.total(), Money::from_cents(5319));
        assert_eq!(orders.get(&me, order.id()).await.unwrap().id(), order.id());
        assert_eq!(orders.list_for_user(&me, me.user_id).await.unwrap().len(), 1);
        assert!(matches!(orders.get(&customer(), order.id()).await, Err(EcommerceError::Forbidden)));
    }

    #[tokio::test]
    async fn test_empty_cart_persists_nothing() {
        let orders = service();
        let me = customer();
        assert!(matches!(orders.create(&me, request(&[])).await, Err(EcommerceError::EmptyCart)));
        assert!(orders.list_all(&admin()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_updates() {
        let orders = service();
        let staff = admin();
        let order = orders.create(&customer(), request(&[(100, 1)])).await.unwrap();

        assert!(matches!(
            orders.update_status(&customer(), order.id(), OrderStatus::Processing, None).await,
            Err(EcommerceError::Forbidden)
        ));
        let updated = orders.update_status(&staff, order.id(), OrderStatus::Processing, None).await.unwrap();
        assert_eq!(updated.status(), OrderStatus::Processing);
        let same = orders.update_status(&staff, order.id(), OrderStatus::Processing, None).await.unwrap();
        assert_eq!(same.status_history().len(), 2);

        let shipped = orders
            .add_tracking(&staff, order.id(), Tracking { number: "94001".into(), carrier: "USPS".into() })
            .await
            .unwrap();
        assert_eq!(shipped.status(), OrderStatus::Shipped);
        orders.update_status(&staff, order.id(), OrderStatus::Delivered, None).await.unwrap();
        assert!(matches!(
            orders.update_status(&staff, order.id(), OrderStatus::Cancelled, None).await,
            Err(EcommerceError::InvalidTransition { .. })
        ));
        assert!(matches!(
            orders.update_status(&staff, Uuid::new_v4(), OrderStatus::Processing, None).await,
            Err(EcommerceError::NotFound("Order"))
        ));
    }

    #[tokio::test]
    async fn test_update_fields() {
        let orders = service();
        let staff = admin();
        let order = orders.create(&customer(), request(&[(100, 1)])).await.unwrap();
        let update = OrderUpdate {
            payment_status: Some(PaymentStatus::Paid),
            notes: Some("Gift wrap".into()),
            ..Default::default()
        };
        let updated = orders.update(&staff, order.id(), update).await.unwrap();
        assert_eq!(updated.payment_status(), PaymentStatus::Paid);
        assert_eq!(updated.notes(), Some("Gift wrap"));
    }

    #[tokio::test]
    async fn test_stats_exclude_cancelled_revenue() {
        let orders = service();
        let staff = admin();
        let kept = orders.create(&customer(), request(&[(6000, 1)])).await.unwrap();
        let dropped = orders.create(&customer(), request(&[(4000, 1)])).await.unwrap();
        orders.update_status(&staff, dropped.id(), OrderStatus::Cancelled, None).await.unwrap();

        let stats = orders.stats(&staff).await.unwrap();
        assert_eq!(stats.total_orders, 2);
        assert_eq!(stats.total_revenue, kept.total());
        let cancelled = stats.by_status.iter().find(|s| s.status == OrderStatus::Cancelled).unwrap();
        assert_eq!(cancelled.count, 1);
        assert_eq!(cancelled.total_value, dropped.total());
    }

    #[tokio::test]
    async fn test_only_admin_deletes() {
        let orders = service();
        let order = orders.create(&customer(), request(&[(100, 1)])).await.unwrap();
        let moderator = Identity { user_id: Uuid::new_v4(), role: Role::Moderator };
        assert!(matches!(orders.delete(&moderator, order.id()).await, Err(EcommerceError::Forbidden)));
        orders.delete(&admin(), order.id()).await.unwrap();
        assert!(matches!(orders.delete(&admin(), order.id()).await, Err(EcommerceError::NotFound(_))));
    }
}
