//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::{not_blank, Money};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub category: String,
    pub image: String,
    pub images: Vec<String>,
    /// Never decremented by order placement.
    pub stock: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Copy of the catalog fields a cart line needs, captured when the line is
/// created and not refreshed afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: Uuid,
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub stock: u32,
}

/// Create/replace payload for a product.
#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
pub struct ProductDraft {
    #[validate(custom = "not_blank")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(custom = "valid_price")]
    pub price: Money,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub stock: u32,
}

impl Product {
    pub fn create(draft: ProductDraft) -> (Self, DomainEvent) {
        let now = Utc::now();
        let product = Self {
            id: Uuid::now_v7(),
            name: draft.name.trim().to_string(),
            description: draft.description,
            price: draft.price,
            category: draft.category.trim().to_string(),
            image: draft.image,
            images: draft.images,
            stock: draft.stock,
            created_at: now,
            updated_at: now,
        };
        let event = DomainEvent::Product(ProductEvent::Created {
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
        });
        (product, event)
    }

    pub fn replace(&mut self, draft: ProductDraft) -> DomainEvent {
        self.name = draft.name.trim().to_string();
        self.description = draft.description;
        self.price = draft.price;
        self.category = draft.category.trim().to_string();
        self.image = draft.image;
        self.images = draft.images;
        self.stock = draft.stock;
        self.updated_at = Utc::now();
        DomainEvent::Product(ProductEvent::Updated { product_id: self.id, price: self.price, stock: self.stock })
    }

    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.id,
            name: self.name.clone(),
            price: self.price,
            image: self.image.clone(),
            stock: self.stock,
        }
    }

    /// Case-insensitive match of `needle` against name and description.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle) || self.description.to_lowercase().contains(&needle)
    }
}

fn valid_price(price: &Money) -> Result<(), ValidationError> {
    if price.amount() < Decimal::ZERO {
        Err(ValidationError::new("negative"))
    } else if !price.is_cents() {
        Err(ValidationError::new("sub_cent"))
    } else if *price > Money::MAX_PRICE {
        Err(ValidationError::new("too_large"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, cents: u32) -> ProductDraft {
        ProductDraft {
            name: name.into(),
            description: "A sturdy widget".into(),
            price: Money::from_cents(cents),
            category: "tools".into(),
            image: "widget.png".into(),
            images: vec![],
            stock: 5,
        }
    }

    #[test]
    fn test_product_create() {
        let (p, event) = Product::create(draft("  Widget ", 1999));
        assert_eq!(p.name, "Widget");
        assert!(matches!(event, DomainEvent::Product(ProductEvent::Created { .. })));
        assert_eq!(p.snapshot().price, Money::from_cents(1999));
    }

    #[test]
    fn test_draft_validation() {
        assert!(draft("Widget", 0).validate().is_ok());
        let errors = draft("  ", 100).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
        let mut negative = draft("Widget", 100);
        negative.price = Money::new(Decimal::new(-1, 0));
        assert!(negative.validate().unwrap_err().field_errors().contains_key("price"));
        let mut fraction = draft("Widget", 100);
        fraction.price = Money::new(Decimal::new(1999, 3));
        assert!(fraction.validate().unwrap_err().field_errors().contains_key("price"));
        let mut huge = draft("Widget", 100);
        huge.price = Money::new(Decimal::MAX);
        assert!(huge.validate().unwrap_err().field_errors().contains_key("price"));
    }

    #[test]
    fn test_search_matches_description() {
        let (p, _) = Product::create(draft("Widget", 100));
        assert!(p.matches("STURDY"));
        assert!(!p.matches("gadget"));
    }
}
