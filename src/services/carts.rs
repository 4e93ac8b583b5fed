//! The per-user server cart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::{ensure_access, ensure_staff};
use crate::auth::Identity;
use crate::domain::aggregates::{Cart, CartItem, ProductSnapshot};
use crate::domain::value_objects::{Money, Quantity};
use crate::pricing;
use crate::store::{CartRepository, ProductRepository, StoreError};
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AddCartItem {
    pub product_id: Uuid,
    /// Defaults to one.
    pub quantity: Option<u32>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CartItemInput {
    pub product_id: Uuid,
    pub quantity: u32,
}

/// A cart line with the live catalog data it points at. `product` is `None`
/// when the product has since been deleted.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CartLineView {
    pub product_id: Uuid,
    pub quantity: u32,
    pub product: Option<ProductSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CartView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartLineView>,
    pub item_count: u64,
    /// Live catalog prices; lines whose product is gone are skipped.
    pub subtotal: Money,
    pub updated_at: DateTime<Utc>,
}

pub struct CartService {
    carts: Arc<dyn CartRepository>,
    products: Arc<dyn ProductRepository>,
}

fn quantity(value: u32) -> Result<Quantity> {
    Quantity::new(value).ok_or_else(|| EcommerceError::Validation("quantity must be at least 1".into()))
}

impl CartService {
    pub fn new(carts: Arc<dyn CartRepository>, products: Arc<dyn ProductRepository>) -> Self {
        Self { carts, products }
    }

    /// Find-or-create the caller's own cart.
    pub async fn create(&self, identity: &Identity) -> Result<CartView> {
        let cart = self.find_or_create(identity.user_id).await?;
        self.view(&cart).await
    }

    pub async fn list(&self, identity: &Identity) -> Result<Vec<CartView>> {
        ensure_staff(identity)?;
        let mut views = Vec::new();
        for cart in self.carts.list_carts().await? {
            views.push(self.view(&cart).await?);
        }
        Ok(views)
    }

    pub async fn get(&self, identity: &Identity, id: Uuid) -> Result<CartView> {
        let cart = self.owned(identity, id).await?;
        self.view(&cart).await
    }

    pub async fn get_for_user(&self, identity: &Identity, user_id: Uuid) -> Result<CartView> {
        ensure_access(identity, user_id)?;
        let cart = self.find_or_create(user_id).await?;
        self.view(&cart).await
    }

    /// Like [`CartService::get_for_user`] but never creates a cart.
    pub async fn find_for_user(&self, identity: &Identity, user_id: Uuid) -> Result<Option<CartView>> {
        ensure_access(identity, user_id)?;
        match self.carts.find_cart_by_user(user_id).await? {
            Some(cart) => Ok(Some(self.view(&cart).await?)),
            None => Ok(None),
        }
    }

    pub async fn add_item(&self, identity: &Identity, user_id: Uuid, request: AddCartItem) -> Result<CartView> {
        ensure_access(identity, user_id)?;
        let quantity = quantity(request.quantity.unwrap_or(1))?;
        if self.products.find_product(request.product_id).await?.is_none() {
            return Err(EcommerceError::NotFound("Product"));
        }
        let mut cart = self.find_or_create(user_id).await?;
        cart.add_item(request.product_id, quantity);
        self.save(&cart).await?;
        debug!(cart_id = %cart.id(), product_id = %request.product_id, "cart item added");
        self.view(&cart).await
    }

    /// Removing a product that is not in the cart still succeeds. A user
    /// without a cart gets an empty one back, which is not persisted.
    pub async fn remove_item(&self, identity: &Identity, user_id: Uuid, product_id: Uuid) -> Result<CartView> {
        ensure_access(identity, user_id)?;
        let Some(mut cart) = self.carts.find_cart_by_user(user_id).await? else {
            return self.view(&Cart::for_user(user_id)).await;
        };
        if cart.remove_item(product_id) {
            self.save(&cart).await?;
        }
        self.view(&cart).await
    }

    pub async fn replace(&self, identity: &Identity, id: Uuid, items: Vec<CartItemInput>) -> Result<CartView> {
        let mut cart = self.owned(identity, id).await?;
        let items = items
            .into_iter()
            .map(|i| quantity(i.quantity).map(|quantity| CartItem { product_id: i.product_id, quantity }))
            .collect::<Result<Vec<_>>>()?;
        cart.replace_items(items);
        self.save(&cart).await?;
        self.view(&cart).await
    }

    pub async fn delete(&self, identity: &Identity, id: Uuid) -> Result<()> {
        let cart = self.owned(identity, id).await?;
        if !self.carts.delete_cart(cart.id()).await? {
            return Err(EcommerceError::NotFound("Cart"));
        }
        info!(cart_id = %id, "cart deleted");
        Ok(())
    }

    async fn owned(&self, identity: &Identity, id: Uuid) -> Result<Cart> {
        let cart = self.carts.find_cart(id).await?.ok_or(EcommerceError::NotFound("Cart"))?;
        ensure_access(identity, cart.user_id())?;
        Ok(cart)
    }

    async fn find_or_create(&self, user_id: Uuid) -> Result<Cart> {
        if let Some(cart) = self.carts.find_cart_by_user(user_id).await? {
            return Ok(cart);
        }
        let cart = Cart::for_user(user_id);
        match self.carts.insert_cart(&cart).await {
            Ok(()) => Ok(cart),
            // Lost a create race; the winner's cart is the user's cart.
            Err(StoreError::Conflict(_)) => {
                self.carts.find_cart_by_user(user_id).await?.ok_or(EcommerceError::NotFound("Cart"))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, cart: &Cart) -> Result<()> {
        if self.carts.update_cart(cart).await? { Ok(()) } else { Err(EcommerceError::NotFound("Cart")) }
    }

    async fn view(&self, cart: &Cart) -> Result<CartView> {
        let mut items = Vec::with_capacity(cart.items().len());
        for item in cart.items() {
            let product = self.products.find_product(item.product_id).await?.map(|p| p.snapshot());
            items.push(CartLineView { product_id: item.product_id, quantity: item.quantity.value(), product });
        }
        let subtotal = pricing::subtotal(
            items.iter().filter_map(|line| line.product.as_ref().map(|p| (p.price, line.quantity))),
        )
        .ok_or_else(|| EcommerceError::Validation("cart subtotal is too large".into()))?;
        Ok(CartView {
            id: cart.id(),
            user_id: cart.user_id(),
            items,
            item_count: cart.item_count(),
            subtotal,
            updated_at: cart.updated_at(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Product, ProductDraft, Role};
    use crate::store::MemoryStore;

    struct Fixture {
        carts: CartService,
        store: Arc<MemoryStore>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        Fixture { carts: CartService::new(store.clone(), store.clone()), store }
    }

    async fn product(store: &MemoryStore, cents: u32) -> Product {
        let (product, _) = Product::create(ProductDraft {
            name: "Mug".into(),
            description: String::new(),
            price: Money::from_cents(cents),
            category: "kitchen".into(),
            image: String::new(),
            images: vec![],
            stock: 10,
        });
        store.insert_product(&product).await.unwrap();
        product
    }

    fn customer() -> Identity { Identity { user_id: Uuid::new_v4(), role: Role::User } }

    #[tokio::test]
    async fn test_sequential_adds_sum_into_one_line() {
        let f = fixture();
        let mug = product(&f.store, 1250).await;
        let me = customer();
        f.carts.add_item(&me, me.user_id, AddCartItem { product_id: mug.id, quantity: Some(2) }).await.unwrap();
        let view = f.carts.add_item(&me, me.user_id, AddCartItem { product_id: mug.id, quantity: Some(3) }).await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 5);
        assert_eq!(view.item_count, 5);
        assert_eq!(view.subtotal, Money::from_cents(6250));
    }

    #[tokio::test]
    async fn test_add_defaults_to_one_and_rejects_zero() {
        let f = fixture();
        let mug = product(&f.store, 100).await;
        let me = customer();
        let view = f.carts.add_item(&me, me.user_id, AddCartItem { product_id: mug.id, quantity: None }).await.unwrap();
        assert_eq!(view.items[0].quantity, 1);
        let zero = f.carts.add_item(&me, me.user_id, AddCartItem { product_id: mug.id, quantity: Some(0) }).await;
        assert!(matches!(zero, Err(EcommerceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_add_unknown_product_is_not_found() {
        let f = fixture();
        let me = customer();
        let result = f.carts.add_item(&me, me.user_id, AddCartItem { product_id: Uuid::new_v4(), quantity: None }).await;
        assert!(matches!(result, Err(EcommerceError::NotFound("Product"))));
    }

    #[tokio::test]
    async fn test_remove_absent_line_leaves_others() {
        let f = fixture();
        let mug = product(&f.store, 100).await;
        let me = customer();
        f.carts.add_item(&me, me.user_id, AddCartItem { product_id: mug.id, quantity: Some(2) }).await.unwrap();
        let view = f.carts.remove_item(&me, me.user_id, Uuid::new_v4()).await.unwrap();
        assert_eq!(view.items.len(), 1);
        let view = f.carts.remove_item(&me, me.user_id, mug.id).await.unwrap();
        assert!(view.items.is_empty());
    }

    #[tokio::test]
    async fn test_remove_without_cart_does_not_create_one() {
        let f = fixture();
        let me = customer();
        let view = f.carts.remove_item(&me, me.user_id, Uuid::new_v4()).await.unwrap();
        assert!(view.items.is_empty());
        assert!(f.store.find_cart_by_user(me.user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_other_users_cart_is_forbidden() {
        let f = fixture();
        let me = customer();
        let someone = customer();
        assert!(matches!(f.carts.get_for_user(&me, someone.user_id).await, Err(EcommerceError::Forbidden)));
        let staff = Identity { user_id: Uuid::new_v4(), role: Role::Moderator };
        assert_eq!(f.carts.get_for_user(&staff, someone.user_id).await.unwrap().user_id, someone.user_id);
    }

    #[tokio::test]
    async fn test_find_for_user_does_not_create() {
        let f = fixture();
        let me = customer();
        assert!(f.carts.find_for_user(&me, me.user_id).await.unwrap().is_none());
        assert!(f.store.find_cart_by_user(me.user_id).await.unwrap().is_none());
        let created = f.carts.create(&me).await.unwrap();
        assert_eq!(f.carts.find_for_user(&me, me.user_id).await.unwrap().map(|c| c.id), Some(created.id));
        let someone = customer();
        assert!(matches!(f.carts.find_for_user(&someone, me.user_id).await, Err(EcommerceError::Forbidden)));
    }

    #[tokio::test]
    async fn test_find_or_create_is_stable() {
        let f = fixture();
        let me = customer();
        let first = f.carts.create(&me).await.unwrap();
        let second = f.carts.get_for_user(&me, me.user_id).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_deleted_product_drops_out_of_subtotal() {
        let f = fixture();
        let (mug, bowl) = (product(&f.store, 500).await, product(&f.store, 700).await);
        let me = customer();
        let cart = f.carts.create(&me).await.unwrap();
        f.carts
            .replace(&me, cart.id, vec![
                CartItemInput { product_id: mug.id, quantity: 1 },
                CartItemInput { product_id: bowl.id, quantity: 1 },
            ])
            .await
            .unwrap();
        f.store.delete_product(bowl.id).await.unwrap();
        let view = f.carts.get(&me, cart.id).await.unwrap();
        assert_eq!(view.items.len(), 2);
        assert!(view.items.iter().any(|l| l.product.is_none()));
        assert_eq!(view.subtotal, Money::from_cents(500));
    }

    #[tokio::test]
    async fn test_delete_cart() {
        let f = fixture();
        let me = customer();
        let cart = f.carts.create(&me).await.unwrap();
        f.carts.delete(&me, cart.id).await.unwrap();
        assert!(matches!(f.carts.get(&me, cart.id).await, Err(EcommerceError::NotFound("Cart"))));
    }
}
