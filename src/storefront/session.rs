//! The signed-in user on this device.
//!
//! One `Session` is built at startup with [`Session::restore`] and passed to
//! whatever needs the current user. The profile and expiry live under
//! [`USER_KEY`], the bearer token under [`TOKEN_KEY`]; both are written and
//! cleared together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::api::{ApiClient, ClientError};
use super::cart_store::{CartLine, CartStore};
use super::storage::LocalStorage;
use crate::domain::aggregates::UserProfile;
use crate::domain::value_objects::Quantity;
use crate::services::{AuthResponse, LoginRequest};

pub const USER_KEY: &str = "user";
pub const TOKEN_KEY: &str = "token";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct StoredUser {
    user: UserProfile,
    expires_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
struct SignedIn {
    user: UserProfile,
    token: String,
    expires_at: DateTime<Utc>,
}

pub struct Session {
    storage: Arc<dyn LocalStorage>,
    current: Option<SignedIn>,
}

impl Session {
    /// Loads a previously stored session. Missing, corrupt or expired data
    /// yields a signed-out session and is removed from storage.
    pub fn restore(storage: Arc<dyn LocalStorage>) -> Self {
        let mut session = Self { storage, current: None };
        match session.load() {
            Some(signed_in) if signed_in.expires_at > Utc::now() => session.current = Some(signed_in),
            Some(_) => {
                info!("stored session expired");
                session.forget();
            }
            None => session.forget(),
        }
        session
    }

    fn load(&self) -> Option<SignedIn> {
        let token = self.storage.get_item(TOKEN_KEY).ok().flatten()?;
        let raw = self.storage.get_item(USER_KEY).ok().flatten()?;
        match serde_json::from_str::<StoredUser>(&raw) {
            Ok(stored) => Some(SignedIn { user: stored.user, token, expires_at: stored.expires_at }),
            Err(e) => {
                warn!(error = %e, "discarding corrupt session");
                None
            }
        }
    }

    /// Stores the credentials from a login or registration. Returns `false`
    /// when storage refused them; the session is still signed in for the
    /// lifetime of this object.
    pub fn sign_in(&mut self, auth: AuthResponse) -> bool {
        let stored = StoredUser { user: auth.user.clone(), expires_at: auth.expires_at };
        let persisted = match serde_json::to_string(&stored) {
            Ok(raw) => {
                let result = self.storage.set_item(USER_KEY, &raw).and_then(|_| self.storage.set_item(TOKEN_KEY, &auth.token));
                if let Err(e) = &result {
                    warn!(error = %e, "failed to persist session");
                }
                result.is_ok()
            }
            Err(e) => {
                warn!(error = %e, "failed to encode session");
                false
            }
        };
        self.current = Some(SignedIn { user: auth.user, token: auth.token, expires_at: auth.expires_at });
        persisted
    }

    pub fn is_authenticated(&self) -> bool { self.active().is_some() }

    pub fn user(&self) -> Option<&UserProfile> { self.active().map(|s| &s.user) }

    pub fn token(&self) -> Option<&str> { self.active().map(|s| s.token.as_str()) }

    fn active(&self) -> Option<&SignedIn> { self.current.as_ref().filter(|s| s.expires_at > Utc::now()) }

    /// Drops the credentials but keeps the cart. Used when the server rejects
    /// the token.
    pub fn invalidate(&mut self) { self.forget(); }

    /// Ends the session on this device: credentials and the local cart are
    /// cleared together.
    pub fn sign_out(&mut self, cart: &CartStore) {
        self.forget();
        cart.clear();
    }

    fn forget(&mut self) {
        self.current = None;
        for key in [USER_KEY, TOKEN_KEY] {
            if let Err(e) = self.storage.remove_item(key) {
                warn!(key, error = %e, "failed to clear session key");
            }
        }
    }
}

/// Logs in and folds the user's server cart into the local cart.
///
/// The local cart is authoritative. Server lines whose product still exists
/// are merged in (quantities summed, server snapshot preferred) and the
/// server cart is then deleted so it is not merged again. A failed merge
/// leaves the server cart in place and does not fail the login.
pub async fn login(
    api: &ApiClient,
    session: &mut Session,
    cart: &CartStore,
    credentials: &LoginRequest,
) -> Result<UserProfile, ClientError> {
    let auth = api.login(credentials).await?;
    let (token, user) = (auth.token.clone(), auth.user.clone());
    session.sign_in(auth);
    if let Err(e) = merge_server_cart(api, &token, &user, cart).await {
        warn!(user_id = %user.id, error = %e, "failed to merge server cart");
    }
    Ok(user)
}

async fn merge_server_cart(api: &ApiClient, token: &str, user: &UserProfile, cart: &CartStore) -> Result<(), ClientError> {
    let Some(server) = api.find_user_cart(token, user.id).await? else {
        return Ok(());
    };
    if server.items.is_empty() {
        return Ok(());
    }
    let lines: Vec<CartLine> = server
        .items
        .into_iter()
        .filter_map(|line| Some(CartLine { product: line.product?, quantity: Quantity::new(line.quantity)? }))
        .collect();
    if !cart.merge(lines) {
        warn!(user_id = %user.id, "local cart rejected merged lines; keeping server cart");
        return Ok(());
    }
    api.delete_cart(token, server.id).await?;
    info!(user_id = %user.id, "merged server cart into local cart");
    Ok(())
}

/// Revokes the token on the server when possible, then signs out locally.
pub async fn logout(api: &ApiClient, session: &mut Session, cart: &CartStore) {
    if let Some(token) = session.token() {
        if let Err(e) = api.logout(token).await {
            warn!(error = %e, "server logout failed");
        }
    }
    session.sign_out(cart);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{ProductSnapshot, Role};
    use crate::domain::value_objects::{Email, Money};
    use crate::storefront::storage::MemoryStorage;
    use uuid::Uuid;

    fn auth(expires_in: chrono::Duration) -> AuthResponse {
        let now = Utc::now();
        AuthResponse {
            user: UserProfile {
                id: Uuid::new_v4(),
                first_name: "Ola".into(),
                last_name: "Nordmann".into(),
                email: Email::parse("ola@example.com").unwrap(),
                role: Role::User,
                is_active: true,
                created_at: now,
                updated_at: now,
            },
            token: "feedface".into(),
            expires_at: now + expires_in,
        }
    }

    #[test]
    fn test_sign_in_survives_restore() {
        let storage = Arc::new(MemoryStorage::new());
        let mut session = Session::restore(storage.clone());
        assert!(!session.is_authenticated());
        assert!(session.sign_in(auth(chrono::Duration::hours(1))));

        let restored = Session::restore(storage);
        assert!(restored.is_authenticated());
        assert_eq!(restored.token(), Some("feedface"));
        assert_eq!(restored.user().unwrap().first_name, "Ola");
    }

    #[test]
    fn test_expired_session_is_dropped() {
        let storage = Arc::new(MemoryStorage::new());
        Session::restore(storage.clone()).sign_in(auth(chrono::Duration::seconds(-5)));
        let restored = Session::restore(storage.clone());
        assert!(!restored.is_authenticated());
        assert_eq!(storage.get_item(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_corrupt_user_data_signs_out() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item(TOKEN_KEY, "feedface").unwrap();
        storage.set_item(USER_KEY, "not json").unwrap();
        assert!(!Session::restore(storage.clone()).is_authenticated());
        assert_eq!(storage.get_item(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_sign_out_clears_keys_and_cart() {
        let storage = Arc::new(MemoryStorage::new());
        let cart = CartStore::new(storage.clone());
        let snapshot = ProductSnapshot { id: Uuid::new_v4(), name: "Lamp".into(), price: Money::from_cents(100), image: String::new(), stock: 1 };
        cart.add(&snapshot, 1);
        let mut session = Session::restore(storage.clone());
        session.sign_in(auth(chrono::Duration::hours(1)));

        session.sign_out(&cart);
        assert!(!session.is_authenticated());
        assert!(cart.get().is_empty());
        assert_eq!(storage.get_item(USER_KEY).unwrap(), None);
        assert_eq!(storage.get_item(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_invalidate_keeps_cart() {
        let storage = Arc::new(MemoryStorage::new());
        let cart = CartStore::new(storage.clone());
        let snapshot = ProductSnapshot { id: Uuid::new_v4(), name: "Lamp".into(), price: Money::from_cents(100), image: String::new(), stock: 1 };
        cart.add(&snapshot, 1);
        let mut session = Session::restore(storage);
        session.sign_in(auth(chrono::Duration::hours(1)));
        session.invalidate();
        assert!(!session.is_authenticated());
        assert_eq!(cart.item_count(), 1);
    }
}
