//! Domain events
use crate::domain::aggregates::{OrderStatus, Tracking};
use crate::domain::value_objects::Money;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "aggregate", content = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

impl DomainEvent {
    /// Subject suffix used when the event is published, e.g. `order.placed`.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Product(ProductEvent::Created { .. }) => "product.created",
            Self::Product(ProductEvent::Updated { .. }) => "product.updated",
            Self::Product(ProductEvent::Deleted { .. }) => "product.deleted",
            Self::Order(OrderEvent::Placed { .. }) => "order.placed",
            Self::Order(OrderEvent::StatusChanged { .. }) => "order.status_changed",
            Self::Order(OrderEvent::Shipped { .. }) => "order.shipped",
            Self::Order(OrderEvent::Deleted { .. }) => "order.deleted",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: Uuid, name: String, price: Money },
    Updated { product_id: Uuid, price: Money, stock: u32 },
    Deleted { product_id: Uuid },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, user_id: Uuid, total: Money },
    StatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
    Shipped { order_id: Uuid, tracking: Tracking },
    Deleted { order_id: Uuid },
}
