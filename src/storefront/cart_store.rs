//! Local-first shopping cart.
//!
//! The cart lives in device storage under [`CART_KEY`] as a JSON list of
//! `{ product, quantity }` records. Lines keep the product snapshot taken when
//! they were added, so [`CartStore::total`] uses add-time prices even if the
//! catalog changes later. Every successful mutation broadcasts a
//! [`CartChanged`] to all subscribers.
//!
//! Storage failures never surface as errors: reads fall back to an empty
//! cart and writes report `false`. A change whose total would leave the
//! decimal range is refused the same way.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

use super::storage::LocalStorage;
use crate::domain::aggregates::ProductSnapshot;
use crate::domain::value_objects::{Money, Quantity};
use crate::pricing;

pub const CART_KEY: &str = "cart";

const CHANGE_CAPACITY: usize = 16;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: ProductSnapshot,
    pub quantity: Quantity,
}

/// Sent after every successful mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CartChanged {
    pub item_count: u64,
    pub total: Money,
}

pub struct CartStore {
    storage: Arc<dyn LocalStorage>,
    changes: broadcast::Sender<CartChanged>,
}

impl CartStore {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self { storage, changes }
    }

    /// Listeners that fall more than a few changes behind see
    /// `RecvError::Lagged` and should re-read the cart.
    pub fn subscribe(&self) -> broadcast::Receiver<CartChanged> { self.changes.subscribe() }

    /// The stored lines in insertion order. Missing, unreadable or corrupt
    /// data reads as an empty cart.
    pub fn get(&self) -> Vec<CartLine> {
        let raw = match self.storage.get_item(CART_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to read cart");
                return Vec::new();
            }
        };
        let lines: Vec<CartLine> = serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "discarding corrupt cart");
            Vec::new()
        });
        if total(&lines).is_none() {
            warn!("discarding cart with an out-of-range total");
            return Vec::new();
        }
        lines
    }

    /// Adds `quantity` to the product's line, creating it with a snapshot of
    /// `product` if needed. A zero quantity is rejected.
    pub fn add(&self, product: &ProductSnapshot, quantity: u32) -> bool {
        let Some(quantity) = Quantity::new(quantity) else { return false };
        let mut lines = self.get();
        match lines.iter_mut().find(|l| l.product.id == product.id) {
            Some(line) => line.quantity = line.quantity.add(quantity),
            None => lines.push(CartLine { product: product.clone(), quantity }),
        }
        self.save(&lines)
    }

    /// Removing an absent product still succeeds.
    pub fn remove(&self, product_id: Uuid) -> bool {
        let mut lines = self.get();
        lines.retain(|l| l.product.id != product_id);
        self.save(&lines)
    }

    /// Sets the quantity exactly; anything below one removes the line.
    pub fn update_quantity(&self, product_id: Uuid, quantity: i64) -> bool {
        let Some(quantity) = u32::try_from(quantity).ok().and_then(Quantity::new) else {
            return if quantity < 1 { self.remove(product_id) } else { false };
        };
        let mut lines = self.get();
        if let Some(line) = lines.iter_mut().find(|l| l.product.id == product_id) {
            line.quantity = quantity;
        }
        self.save(&lines)
    }

    pub fn clear(&self) -> bool {
        match self.storage.remove_item(CART_KEY) {
            Ok(()) => {
                self.notify(CartChanged { item_count: 0, total: Money::ZERO });
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to clear cart");
                false
            }
        }
    }

    /// Sum of quantities, not number of lines.
    pub fn item_count(&self) -> u64 { item_count(&self.get()) }

    /// Sum of snapshot price times quantity.
    pub fn total(&self) -> Money {
        // `get` only returns carts whose total is in range.
        total(&self.get()).unwrap_or_default()
    }

    pub fn contains(&self, product_id: Uuid) -> bool { self.get().iter().any(|l| l.product.id == product_id) }

    /// Zero when the product is not in the cart.
    pub fn quantity_of(&self, product_id: Uuid) -> u32 {
        self.get().iter().find(|l| l.product.id == product_id).map_or(0, |l| l.quantity.value())
    }

    /// Folds server-side lines into the local cart: quantities of shared
    /// products are summed and the incoming snapshot replaces the local one.
    pub fn merge(&self, incoming: Vec<CartLine>) -> bool {
        if incoming.is_empty() { return true; }
        let mut lines = self.get();
        for line in incoming {
            match lines.iter_mut().find(|l| l.product.id == line.product.id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.add(line.quantity);
                    existing.product = line.product;
                }
                None => lines.push(line),
            }
        }
        self.save(&lines)
    }

    fn save(&self, lines: &[CartLine]) -> bool {
        let Some(total) = total(lines) else {
            warn!("refusing cart change: total out of range");
            return false;
        };
        let encoded = match serde_json::to_string(lines) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(error = %e, "failed to encode cart");
                return false;
            }
        };
        if let Err(e) = self.storage.set_item(CART_KEY, &encoded) {
            warn!(error = %e, "failed to save cart");
            return false;
        }
        self.notify(CartChanged { item_count: item_count(lines), total });
        true
    }

    fn notify(&self, change: CartChanged) {
        // No subscribers is not an error.
        let _ = self.changes.send(change);
    }
}

fn item_count(lines: &[CartLine]) -> u64 { lines.iter().map(|l| u64::from(l.quantity.value())).sum() }

fn total(lines: &[CartLine]) -> Option<Money> {
    pricing::subtotal(lines.iter().map(|l| (l.product.price, l.quantity.value())))
}
