//! Cart Aggregate
//!
//! The per-user server cart. Lines hold only a product reference and a
//! quantity; prices are always read from the live catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::Quantity;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    id: Uuid,
    user_id: Uuid,
    items: Vec<CartItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: Uuid,
    pub quantity: Quantity,
}

impl Cart {
    pub fn for_user(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self { id: Uuid::now_v7(), user_id, items: vec![], created_at: now, updated_at: now }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// Sum of line quantities.
    pub fn item_count(&self) -> u64 { self.items.iter().map(|i| u64::from(i.quantity.value())).sum() }

    pub fn quantity_of(&self, product_id: Uuid) -> Option<Quantity> {
        self.items.iter().find(|i| i.product_id == product_id).map(|i| i.quantity)
    }

    /// Adds to an existing line or appends a new one.
    pub fn add_item(&mut self, product_id: Uuid, quantity: Quantity) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            existing.quantity = existing.quantity.add(quantity);
        } else {
            self.items.push(CartItem { product_id, quantity });
        }
        self.touch();
    }

    /// Returns whether a line was removed. Absent lines are not an error.
    pub fn remove_item(&mut self, product_id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        let removed = self.items.len() != before;
        if removed { self.touch(); }
        removed
    }

    /// Replaces all lines, folding duplicate products into one line.
    pub fn replace_items(&mut self, items: Vec<CartItem>) {
        self.items.clear();
        for item in items {
            self.add_item(item.product_id, item.quantity);
        }
        self.touch();
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}
