//! Catalog management.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{ensure_staff, invalid};
use crate::auth::Identity;
use crate::domain::aggregates::{Product, ProductDraft};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::publisher::EventPublisher;
use crate::store::ProductRepository;
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

pub struct ProductService {
    products: Arc<dyn ProductRepository>,
    publisher: EventPublisher,
}

impl ProductService {
    pub fn new(products: Arc<dyn ProductRepository>, publisher: EventPublisher) -> Self {
        Self { products, publisher }
    }

    pub async fn list(&self, query: &ProductQuery) -> Result<Vec<Product>> {
        let category = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
        let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let products = self.products.list_products().await?;
        Ok(products
            .into_iter()
            .filter(|p| category.map_or(true, |c| p.category.eq_ignore_ascii_case(c)))
            .filter(|p| search.map_or(true, |s| p.matches(s)))
            .collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<Product> {
        self.products.find_product(id).await?.ok_or(EcommerceError::NotFound("Product"))
    }

    pub async fn create(&self, identity: &Identity, draft: ProductDraft) -> Result<Product> {
        ensure_staff(identity)?;
        draft.validate().map_err(invalid)?;
        let (product, event) = Product::create(draft);
        self.products.insert_product(&product).await?;
        info!(product_id = %product.id, "product created");
        self.publisher.publish(&event).await;
        Ok(product)
    }

    pub async fn update(&self, identity: &Identity, id: Uuid, draft: ProductDraft) -> Result<Product> {
        ensure_staff(identity)?;
        draft.validate().map_err(invalid)?;
        let mut product = self.get(id).await?;
        let event = product.replace(draft);
        if !self.products.update_product(&product).await? {
            return Err(EcommerceError::NotFound("Product"));
        }
        self.publisher.publish(&event).await;
        Ok(product)
    }

    pub async fn delete(&self, identity: &Identity, id: Uuid) -> Result<()> {
        ensure_staff(identity)?;
        if !self.products.delete_product(id).await? {
            return Err(EcommerceError::NotFound("Product"));
        }
        info!(product_id = %id, "product deleted");
        self.publisher.publish(&DomainEvent::Product(ProductEvent::Deleted { product_id: id })).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::Role;
    use crate::domain::value_objects::Money;
    use crate::store::MemoryStore;

    fn staff() -> Identity { Identity { user_id: Uuid::new_v4(), role: Role::Admin } }

    fn draft(name: &str, category: &str) -> ProductDraft {
        ProductDraft {
            name: name.into(),
            description: format!("{name} for the home"),
            price: Money::from_cents(1500),
            category: category.into(),
            image: String::new(),
            images: vec![],
            stock: 3,
        }
    }

    fn service() -> ProductService { ProductService::new(Arc::new(MemoryStore::new()), EventPublisher::disabled()) }

    #[tokio::test]
    async fn test_customers_cannot_manage_catalog() {
        let products = service();
        let customer = Identity { user_id: Uuid::new_v4(), role: Role::User };
        assert!(matches!(products.create(&customer, draft("Lamp", "lighting")).await, Err(EcommerceError::Forbidden)));
    }

    #[tokio::test]
    async fn test_filter_by_category_and_search() {
        let products = service();
        let admin = staff();
        products.create(&admin, draft("Lamp", "Lighting")).await.unwrap();
        products.create(&admin, draft("Desk", "Furniture")).await.unwrap();
        products.create(&admin, draft("Floor Lamp", "lighting")).await.unwrap();

        let lighting = products.list(&ProductQuery { category: Some("lighting".into()), search: None }).await.unwrap();
        assert_eq!(lighting.len(), 2);
        let floor = products.list(&ProductQuery { category: None, search: Some("floor".into()) }).await.unwrap();
        assert_eq!(floor.len(), 1);
        assert_eq!(products.list(&ProductQuery::default()).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let products = service();
        let admin = staff();
        let lamp = products.create(&admin, draft("Lamp", "lighting")).await.unwrap();
        let mut changed = draft("Lamp", "lighting");
        changed.price = Money::from_cents(1200);
        assert_eq!(products.update(&admin, lamp.id, changed).await.unwrap().price, Money::from_cents(1200));
        products.delete(&admin, lamp.id).await.unwrap();
        assert!(matches!(products.get(lamp.id).await, Err(EcommerceError::NotFound("Product"))));
        assert!(matches!(products.delete(&admin, lamp.id).await, Err(EcommerceError::NotFound(_))));
    }
}
