//! Drives a real server on an ephemeral port through the client module.

use std::sync::Arc;

use storefront::domain::aggregates::{OrderStatus, PaymentMethod, Product, ProductDraft};
use storefront::domain::value_objects::Money;
use storefront::http::{router, AppState};
use storefront::publisher::EventPublisher;
use storefront::services::{AddCartItem, LoginRequest, RegisterUser};
use storefront::storefront::{
    login, logout, place_order, ApiClient, CheckoutError, CheckoutForm, ClientError, MemoryStorage, Session, CartStore,
};
use storefront::store::MemoryStore;

struct Harness {
    api: ApiClient,
    state: AppState,
}

async fn spawn_server() -> Harness {
    let state = AppState::new(Arc::new(MemoryStore::new()), EventPublisher::disabled(), chrono::Duration::hours(1));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Harness { api: ApiClient::new(format!("http://{addr}")), state }
}

impl Harness {
    async fn product(&self, name: &str, cents: u32) -> Product {
        let admin = self.state.users.ensure_admin("admin@shop.test", "admin123").await.unwrap();
        let identity = storefront::auth::Identity { user_id: admin.id, role: admin.role };
        let draft = ProductDraft {
            name: name.into(),
            description: String::new(),
            price: Money::from_cents(cents),
            category: "garden".into(),
            image: format!("{name}.png"),
            images: vec![],
            stock: 25,
        };
        self.state.products.create(&identity, draft).await.unwrap()
    }
}

fn checkout_form() -> CheckoutForm {
    CheckoutForm {
        first_name: "Rui".into(),
        last_name: "Costa".into(),
        email: "rui@shop.test".into(),
        phone: "555-0144".into(),
        address: "7 Orchard Ln".into(),
        city: "Boise".into(),
        state: "ID".into(),
        zip_code: "83702".into(),
        country: "USA".into(),
        payment_method: PaymentMethod::CashOnDelivery,
        ..Default::default()
    }
}

fn register_request() -> RegisterUser {
    RegisterUser { first_name: "Rui".into(), last_name: "Costa".into(), email: "rui@shop.test".into(), password: "trowel!".into() }
}

#[tokio::test]
async fn checkout_places_order_and_clears_cart() {
    let h = spawn_server().await;
    let shovel = h.product("shovel", 1500).await;
    let seeds = h.product("seeds", 500).await;

    let device = Arc::new(MemoryStorage::new());
    let cart = CartStore::new(device.clone());
    let mut session = Session::restore(device.clone());

    // Shopping works signed out.
    assert!(cart.add(&shovel.snapshot(), 2));
    assert!(cart.add(&seeds.snapshot(), 2));
    assert!(matches!(
        place_order(&h.api, &mut session, &cart, &checkout_form()).await,
        Err(CheckoutError::NotAuthenticated)
    ));

    let auth = h.api.register(&register_request()).await.unwrap();
    session.sign_in(auth);

    let order = place_order(&h.api, &mut session, &cart, &checkout_form()).await.unwrap();
    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(order.totals().subtotal, Money::from_cents(4000));
    assert_eq!(order.total(), Money::from_cents(5319));
    assert!(cart.get().is_empty());

    let token = session.token().unwrap().to_string();
    let user_id = session.user().unwrap().id;
    let history = h.api.user_orders(&token, user_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id(), order.id());
    assert_eq!(h.api.get_order(&token, order.id()).await.unwrap().items().len(), 2);
}

#[tokio::test]
async fn failed_checkout_keeps_cart() {
    let h = spawn_server().await;
    let shovel = h.product("shovel", 1500).await;
    let device = Arc::new(MemoryStorage::new());
    let cart = CartStore::new(device.clone());
    let mut session = Session::restore(device.clone());
    session.sign_in(h.api.register(&register_request()).await.unwrap());

    let mut form = checkout_form();
    form.zip_code.clear();
    cart.add(&shovel.snapshot(), 1);
    assert!(matches!(
        place_order(&h.api, &mut session, &cart, &form).await,
        Err(CheckoutError::MissingField("zip code"))
    ));
    assert_eq!(cart.item_count(), 1);

    // The server revoked the token behind the client's back.
    h.api.logout(session.token().unwrap()).await.unwrap();
    let result = place_order(&h.api, &mut session, &cart, &checkout_form()).await;
    assert!(matches!(result, Err(CheckoutError::Client(ClientError::Unauthorized(_)))));
    assert!(!session.is_authenticated());
    assert_eq!(cart.item_count(), 1);
}

#[tokio::test]
async fn login_merges_server_cart_once() {
    let h = spawn_server().await;
    let shovel = h.product("shovel", 1500).await;
    let seeds = h.product("seeds", 500).await;

    let registered = h.api.register(&register_request()).await.unwrap();
    let item = AddCartItem { product_id: shovel.id, quantity: Some(1) };
    h.api.add_cart_item(&registered.token, registered.user.id, &item).await.unwrap();
    let item = AddCartItem { product_id: seeds.id, quantity: Some(3) };
    h.api.add_cart_item(&registered.token, registered.user.id, &item).await.unwrap();
    let server = h.api.user_cart(&registered.token, registered.user.id).await.unwrap();
    assert_eq!(server.item_count, 4);
    assert_eq!(server.subtotal, Money::from_cents(3000));

    let device = Arc::new(MemoryStorage::new());
    let cart = CartStore::new(device.clone());
    let mut session = Session::restore(device.clone());
    cart.add(&shovel.snapshot(), 2);

    let credentials = LoginRequest { email: "rui@shop.test".into(), password: "trowel!".into() };
    login(&h.api, &mut session, &cart, &credentials).await.unwrap();
    assert_eq!(cart.quantity_of(shovel.id), 3);
    assert_eq!(cart.quantity_of(seeds.id), 3);

    // The server cart was consumed, so a second login adds nothing.
    let token = session.token().unwrap().to_string();
    assert!(h.api.find_user_cart(&token, registered.user.id).await.unwrap().is_none());
    login(&h.api, &mut session, &cart, &credentials).await.unwrap();
    assert_eq!(cart.quantity_of(shovel.id), 3);
    // Logging in without a server cart does not create one.
    let token = session.token().unwrap().to_string();
    assert!(h.api.find_user_cart(&token, registered.user.id).await.unwrap().is_none());

    logout(&h.api, &mut session, &cart).await;
    assert!(cart.get().is_empty());
    assert!(!Session::restore(device).is_authenticated());
}

#[tokio::test]
async fn client_errors_are_typed() {
    let h = spawn_server().await;
    let missing = h.api.get_product(uuid::Uuid::new_v4()).await;
    assert!(matches!(missing, Err(ClientError::NotFound(message)) if message == "Product not found"));

    let bad = LoginRequest { email: "nobody@shop.test".into(), password: "x".into() };
    assert!(matches!(h.api.login(&bad).await, Err(ClientError::Unauthorized(_))));

    h.api.register(&register_request()).await.unwrap();
    match h.api.register(&register_request()).await {
        Err(ClientError::Api { status, .. }) => assert_eq!(status.as_u16(), 409),
        other => panic!("unexpected: {other:?}"),
    }
}
