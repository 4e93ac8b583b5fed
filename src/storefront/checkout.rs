//! Turning the local cart and the checkout form into a placed order.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::api::{ApiClient, ClientError};
use super::cart_store::{CartLine, CartStore};
use super::session::Session;
use crate::domain::aggregates::{Address, CustomerContact, LineItem, Order, PaymentMethod};
use crate::pricing::OrderTotals;
use crate::services::CreateOrder;

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("sign in to place an order")]
    NotAuthenticated,
    #[error("your cart is empty")]
    EmptyCart,
    #[error("please fill in the {0}")]
    MissingField(&'static str),
    #[error("the order total is too large")]
    TotalTooLarge,
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Card fields are only checked for card payments and never leave the device.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetails {
    pub card_number: String,
    pub expiry_date: String,
    pub cvv: String,
    pub card_name: String,
}

/// The checkout form as the shopper fills it in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    /// `None` bills the shipping address.
    pub billing: Option<Address>,
    pub payment_method: PaymentMethod,
    pub card: CardDetails,
    pub notes: String,
}

impl CheckoutForm {
    /// Reports the first blank required field, in form order.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        let mut fields = vec![
            ("first name", &self.first_name),
            ("last name", &self.last_name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("zip code", &self.zip_code),
            ("country", &self.country),
        ];
        if let Some(billing) = &self.billing {
            fields.extend([
                ("billing first name", &billing.first_name),
                ("billing last name", &billing.last_name),
                ("billing address", &billing.address),
                ("billing city", &billing.city),
                ("billing state", &billing.state),
                ("billing zip code", &billing.zip_code),
                ("billing country", &billing.country),
            ]);
        }
        if self.payment_method.requires_card() {
            fields.extend([
                ("card number", &self.card.card_number),
                ("expiry date", &self.card.expiry_date),
                ("cvv", &self.card.cvv),
                ("card name", &self.card.card_name),
            ]);
        }
        match fields.into_iter().find(|(_, value)| value.trim().is_empty()) {
            Some((name, _)) => Err(CheckoutError::MissingField(name)),
            None => Ok(()),
        }
    }

    fn shipping_address(&self) -> Address {
        Address {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            address: self.address.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            zip_code: self.zip_code.clone(),
            country: self.country.clone(),
        }
    }
}

/// An order ready to submit, with the totals shown to the shopper.
#[derive(Clone, Debug)]
pub struct OrderDraft {
    pub request: CreateOrder,
    pub totals: OrderTotals,
}

impl OrderDraft {
    pub fn build(form: &CheckoutForm, lines: &[CartLine]) -> Result<Self, CheckoutError> {
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        form.validate()?;
        let items: Vec<LineItem> = lines
            .iter()
            .map(|line| LineItem {
                product_id: line.product.id,
                name: line.product.name.clone(),
                unit_price: line.product.price,
                quantity: line.quantity,
                image: line.product.image.clone(),
            })
            .collect();
        let totals = OrderTotals::for_lines(items.iter().map(|i| (i.unit_price, i.quantity.value())))
            .ok_or(CheckoutError::TotalTooLarge)?;
        let shipping_address = form.shipping_address();
        let request = CreateOrder {
            customer: CustomerContact {
                first_name: form.first_name.trim().to_string(),
                last_name: form.last_name.trim().to_string(),
                email: form.email.trim().to_string(),
                phone: form.phone.trim().to_string(),
            },
            billing_address: Some(form.billing.clone().unwrap_or_else(|| shipping_address.clone())),
            shipping_address,
            items,
            payment_method: form.payment_method,
            notes: Some(form.notes.trim().to_string()).filter(|n| !n.is_empty()),
        };
        Ok(Self { request, totals })
    }
}

/// Places an order for everything in the local cart.
///
/// The cart is cleared only after the server accepted the order. A rejected
/// token signs the session out but keeps the cart.
pub async fn place_order(
    api: &ApiClient,
    session: &mut Session,
    cart: &CartStore,
    form: &CheckoutForm,
) -> Result<Order, CheckoutError> {
    let token = session.token().ok_or(CheckoutError::NotAuthenticated)?.to_string();
    let draft = OrderDraft::build(form, &cart.get())?;
    let order = match api.create_order(&token, &draft.request).await {
        Ok(order) => order,
        Err(ClientError::Unauthorized(message)) => {
            session.invalidate();
            return Err(ClientError::Unauthorized(message).into());
        }
        Err(e) => return Err(e.into()),
    };
    info!(order_id = %order.id(), total = %order.total(), "order placed");
    if !cart.clear() {
        warn!(order_id = %order.id(), "order placed but the local cart could not be cleared");
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::ProductSnapshot;
    use crate::domain::value_objects::{Money, Quantity};
    use uuid::Uuid;

    fn form(payment_method: PaymentMethod) -> CheckoutForm {
        CheckoutForm {
            first_name: "Sam".into(),
            last_name: "Park".into(),
            email: "sam@example.com".into(),
            phone: "555-0123".into(),
            address: "9 Harbor Rd".into(),
            city: "Seattle".into(),
            state: "WA".into(),
            zip_code: "98101".into(),
            country: "USA".into(),
            payment_method,
            ..Default::default()
        }
    }

    fn line(cents: u32, qty: u32) -> CartLine {
        CartLine {
            product: ProductSnapshot { id: Uuid::new_v4(), name: "Rope".into(), price: Money::from_cents(cents), image: String::new(), stock: 9 },
            quantity: Quantity::new(qty).unwrap(),
        }
    }

    #[test]
    fn test_card_fields_only_for_card_payments() {
        assert!(form(PaymentMethod::Paypal).validate().is_ok());
        assert!(matches!(form(PaymentMethod::CreditCard).validate(), Err(CheckoutError::MissingField("card number"))));
        let mut card = form(PaymentMethod::DebitCard);
        card.card = CardDetails { card_number: "4111".into(), expiry_date: "12/30".into(), cvv: "123".into(), card_name: "Sam Park".into() };
        assert!(card.validate().is_ok());
    }

    #[test]
    fn test_first_missing_field_is_named() {
        let mut f = form(PaymentMethod::CashOnDelivery);
        f.city = " ".into();
        f.country.clear();
        assert!(matches!(f.validate(), Err(CheckoutError::MissingField("city"))));

        let mut f = form(PaymentMethod::CashOnDelivery);
        f.billing = Some(Address { first_name: "Sam".into(), ..Default::default() });
        assert!(matches!(f.validate(), Err(CheckoutError::MissingField("billing last name"))));
    }

    #[test]
    fn test_draft_totals_and_billing() {
        let draft = OrderDraft::build(&form(PaymentMethod::Paypal), &[line(1000, 3), line(1000, 1)]).unwrap();
        assert_eq!(draft.totals.subtotal, Money::from_cents(4000));
        assert_eq!(draft.totals.total, Money::from_cents(5319));
        assert_eq!(draft.request.items.len(), 2);
        assert_eq!(draft.request.billing_address.as_ref(), Some(&draft.request.shipping_address));
        assert_eq!(draft.request.notes, None);
    }

    #[test]
    fn test_empty_cart_checked_first() {
        assert!(matches!(OrderDraft::build(&CheckoutForm::default(), &[]), Err(CheckoutError::EmptyCart)));
    }
}
