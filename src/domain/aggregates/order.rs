//! Order Aggregate
//!
//! An order is a snapshot taken at checkout: line items carry the name, price
//! and image they had in the cart, and the totals are computed once when the
//! order is placed. Only the status, payment status, notes, addresses and
//! tracking details change afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{Email, Money, Quantity};
use crate::pricing::OrderTotals;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    id: Uuid,
    user_id: Uuid,
    customer: CustomerContact,
    shipping_address: Address,
    billing_address: Address,
    items: Vec<LineItem>,
    #[serde(flatten)]
    totals: OrderTotals,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    status: OrderStatus,
    status_history: Vec<StatusChange>,
    tracking: Option<Tracking>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerContact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Money,
    pub quantity: Quantity,
    #[serde(default)]
    pub image: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub note: String,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracking {
    pub number: String,
    pub carrier: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    CreditCard,
    DebitCard,
    Paypal,
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn requires_card(&self) -> bool { matches!(self, Self::CreditCard | Self::DebitCard) }
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [Self::Pending, Self::Processing, Self::Shipped, Self::Delivered, Self::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool { matches!(self, Self::Delivered | Self::Cancelled) }

    /// Position on the fulfilment track; `Cancelled` is off the track.
    fn stage(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Processing => Some(1),
            Self::Shipped => Some(2),
            Self::Delivered => Some(3),
            Self::Cancelled => None,
        }
    }

    /// Forward moves along the track, or cancellation, out of a non-terminal status.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if self.is_terminal() { return false; }
        match (self.stage(), next.stage()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, Some(_)) => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| OrderError::InvalidField { field: "status".into(), reason: format!("unknown status '{s}'") })
    }
}

/// Everything needed to place an order. `billing_address: None` means
/// "same as shipping".
#[derive(Clone, Debug)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub customer: CustomerContact,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub items: Vec<LineItem>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

/// Administrative edit of an order. Items and totals are not editable.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub status_note: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub notes: Option<String>,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
}

impl CustomerContact {
    pub fn check(&self) -> Result<(), OrderError> {
        required("customer.first_name", &self.first_name)?;
        required("customer.last_name", &self.last_name)?;
        required("customer.email", &self.email)?;
        required("customer.phone", &self.phone)?;
        Email::parse(&self.email).map_err(|e| OrderError::InvalidField { field: "customer.email".into(), reason: e.to_string() })?;
        Ok(())
    }
}

impl Address {
    /// Checks required fields; errors name the field as `{prefix}.{field}`.
    pub fn check(&self, prefix: &str) -> Result<(), OrderError> {
        let fields = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("zip_code", &self.zip_code),
            ("country", &self.country),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(OrderError::MissingField(format!("{prefix}.{name}")));
            }
        }
        Ok(())
    }
}

fn required(field: &str, value: &str) -> Result<(), OrderError> {
    if value.trim().is_empty() { Err(OrderError::MissingField(field.to_string())) } else { Ok(()) }
}

fn check_price(field: &str, price: Money) -> Result<(), OrderError> {
    let reason = if price.is_negative() {
        "must not be negative"
    } else if !price.is_cents() {
        "must be a whole number of cents"
    } else if price > Money::MAX_PRICE {
        "is too large"
    } else {
        return Ok(());
    };
    Err(OrderError::InvalidField { field: field.to_string(), reason: reason.into() })
}

impl Order {
    /// Places a new `pending` order, computing totals from the line snapshots.
    pub fn place(new: NewOrder) -> Result<Self, OrderError> {
        if new.items.is_empty() { return Err(OrderError::EmptyCart); }
        new.customer.check()?;
        new.shipping_address.check("shipping_address")?;
        let billing_address = new.billing_address.unwrap_or_else(|| new.shipping_address.clone());
        billing_address.check("billing_address")?;
        for (idx, item) in new.items.iter().enumerate() {
            required(&format!("items[{idx}].name"), &item.name)?;
            check_price(&format!("items[{idx}].unit_price"), item.unit_price)?;
        }

        let totals = OrderTotals::for_lines(new.items.iter().map(|i| (i.unit_price, i.quantity.value())))
            .ok_or_else(|| OrderError::InvalidField { field: "items".into(), reason: "order total is too large".into() })?;
        let now = Utc::now();
        let mut order = Self {
            id: Uuid::now_v7(),
            user_id: new.user_id,
            customer: new.customer,
            shipping_address: new.shipping_address,
            billing_address,
            items: new.items,
            totals,
            payment_method: new.payment_method,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Pending,
            status_history: vec![StatusChange { status: OrderStatus::Pending, note: "Order created".into(), at: now }],
            tracking: None,
            notes: new.notes.filter(|n| !n.trim().is_empty()),
            created_at: now,
            updated_at: now,
            events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed { order_id: order.id, user_id: order.user_id, total: order.totals.total }));
        Ok(order)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn customer(&self) -> &CustomerContact { &self.customer }
    pub fn shipping_address(&self) -> &Address { &self.shipping_address }
    pub fn billing_address(&self) -> &Address { &self.billing_address }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn totals(&self) -> &OrderTotals { &self.totals }
    pub fn total(&self) -> Money { self.totals.total }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn payment_status(&self) -> PaymentStatus { self.payment_status }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn status_history(&self) -> &[StatusChange] { &self.status_history }
    pub fn tracking(&self) -> Option<&Tracking> { self.tracking.as_ref() }
    pub fn notes(&self) -> Option<&str> { self.notes.as_deref() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    /// Moves the order to `next`. Returns `Ok(false)` when it already is there.
    pub fn transition(&mut self, next: OrderStatus, note: Option<String>) -> Result<bool, OrderError> {
        if next == self.status { return Ok(false); }
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition { from: self.status, to: next });
        }
        let from = self.status;
        self.status = next;
        let note = note.filter(|n| !n.trim().is_empty()).unwrap_or_else(|| format!("Status changed to {next}"));
        self.status_history.push(StatusChange { status: next, note, at: Utc::now() });
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, from, to: next }));
        Ok(true)
    }

    /// Records tracking details and marks the order shipped.
    pub fn ship(&mut self, tracking: Tracking) -> Result<(), OrderError> {
        required("tracking_number", &tracking.number)?;
        required("carrier", &tracking.carrier)?;
        let note = format!("Order shipped via {}. Tracking: {}", tracking.carrier, tracking.number);
        self.transition(OrderStatus::Shipped, Some(note))?;
        self.tracking = Some(tracking.clone());
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Shipped { order_id: self.id, tracking }));
        Ok(())
    }

    /// Applies an administrative edit. Everything is validated before anything
    /// is changed, so a rejected update leaves the order untouched.
    pub fn apply(&mut self, update: OrderUpdate) -> Result<(), OrderError> {
        if let Some(next) = update.status {
            if next != self.status && !self.status.can_transition_to(next) {
                return Err(OrderError::InvalidTransition { from: self.status, to: next });
            }
        }
        let edits_addresses = update.shipping_address.is_some() || update.billing_address.is_some();
        if edits_addresses && !matches!(self.status, OrderStatus::Pending | OrderStatus::Processing) {
            return Err(OrderError::Locked(self.status));
        }
        if let Some(address) = &update.shipping_address { address.check("shipping_address")?; }
        if let Some(address) = &update.billing_address { address.check("billing_address")?; }

        if let Some(address) = update.shipping_address { self.shipping_address = address; }
        if let Some(address) = update.billing_address { self.billing_address = address; }
        if let Some(payment_status) = update.payment_status { self.payment_status = payment_status; }
        if let Some(notes) = update.notes { self.notes = Some(notes).filter(|n| !n.trim().is_empty()); }
        self.touch();
        if let Some(next) = update.status {
            self.transition(next, update.status_note)?;
        }
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("cannot place an order with an empty cart")]
    EmptyCart,
    #[error("{0} is required")]
    MissingField(String),
    #[error("{field} is invalid: {reason}")]
    InvalidField { field: String, reason: String },
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("order is {0} and can no longer be edited")]
    Locked(OrderStatus),
}
