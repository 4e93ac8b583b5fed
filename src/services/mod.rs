//! Business operations behind the HTTP controllers.
//!
//! Every operation that needs a caller takes the resolved [`Identity`]; the
//! services never look at tokens themselves except in
//! [`UserService::authenticate`].

use validator::ValidationErrors;

use crate::auth::Identity;
use crate::{EcommerceError, Result};

pub mod carts;
pub mod orders;
pub mod products;
pub mod users;

pub use carts::{AddCartItem, CartItemInput, CartLineView, CartService, CartView};
pub use orders::{CreateOrder, OrderService, OrderStats, StatusStats};
pub use products::{ProductQuery, ProductService};
pub use users::{AuthResponse, LoginRequest, RegisterUser, UpdateUser, UserService};

pub(crate) fn ensure_staff(identity: &Identity) -> Result<()> {
    if identity.is_staff() { Ok(()) } else { Err(EcommerceError::Forbidden) }
}

pub(crate) fn ensure_admin(identity: &Identity) -> Result<()> {
    if identity.is_admin() { Ok(()) } else { Err(EcommerceError::Forbidden) }
}

pub(crate) fn ensure_access(identity: &Identity, owner: uuid::Uuid) -> Result<()> {
    if identity.can_access(owner) { Ok(()) } else { Err(EcommerceError::Forbidden) }
}

/// Names every failing field, sorted so the message is stable.
pub(crate) fn invalid(errors: ValidationErrors) -> EcommerceError {
    let mut fields: Vec<&str> = errors.field_errors().into_keys().collect();
    fields.sort_unstable();
    EcommerceError::Validation(format!("invalid or missing field(s): {}", fields.join(", ")))
}
