//! Accounts, login and bearer sessions.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use super::{ensure_access, ensure_admin, invalid};
use crate::auth::{self, Identity, SessionRecord};
use crate::domain::aggregates::{Role, User, UserProfile};
use crate::domain::value_objects::{not_blank, Email};
use crate::store::{SessionRepository, UserRepository};
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
pub struct RegisterUser {
    #[validate(custom = "not_blank")]
    pub first_name: String,
    #[validate(custom = "not_blank")]
    pub last_name: String,
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, Validate)]
pub struct UpdateUser {
    #[validate(custom = "not_blank")]
    pub first_name: Option<String>,
    #[validate(custom = "not_blank")]
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[validate(length(min = 6))]
    pub password: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub token: String,
    pub expires_at: chrono::DateTime<Utc>,
}

pub struct UserService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    session_ttl: chrono::Duration,
}

fn parse_email(raw: &str) -> Result<Email> {
    Email::parse(raw).map_err(|e| EcommerceError::Validation(e.to_string()))
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, sessions: Arc<dyn SessionRepository>, session_ttl: chrono::Duration) -> Self {
        Self { users, sessions, session_ttl }
    }

    pub async fn register(&self, request: RegisterUser) -> Result<AuthResponse> {
        request.validate().map_err(invalid)?;
        let email = parse_email(&request.email)?;
        let user = User::new(request.first_name, request.last_name, email, auth::hash_password(&request.password), Role::User);
        self.users.insert_user(&user).await?;
        info!(user_id = %user.id, "user registered");
        self.start_session(&user).await
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse> {
        let email = Email::parse(&request.email).map_err(|_| EcommerceError::InvalidCredentials)?;
        let user = self.users.find_user_by_email(&email).await?.ok_or(EcommerceError::InvalidCredentials)?;
        if !user.is_active || !auth::verify_password(&request.password, &user.password_hash) {
            warn!(user_id = %user.id, "rejected login");
            return Err(EcommerceError::InvalidCredentials);
        }
        self.start_session(&user).await
    }

    /// Revokes the presented token. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) -> Result<()> {
        self.sessions.delete_session(&auth::token_digest(token)).await?;
        Ok(())
    }

    /// Resolves a bearer token to the identity behind it.
    pub async fn authenticate(&self, token: &str) -> Result<Identity> {
        let digest = auth::token_digest(token);
        let session = self.sessions.find_session(&digest).await?.ok_or(EcommerceError::NotAuthenticated)?;
        if session.is_expired(Utc::now()) {
            self.sessions.delete_session(&digest).await?;
            return Err(EcommerceError::NotAuthenticated);
        }
        match self.users.find_user(session.user_id).await? {
            Some(user) if user.is_active => Ok(Identity { user_id: user.id, role: user.role }),
            _ => Err(EcommerceError::NotAuthenticated),
        }
    }

    pub async fn profile(&self, identity: &Identity) -> Result<UserProfile> {
        self.get(identity, identity.user_id).await
    }

    pub async fn list(&self, identity: &Identity) -> Result<Vec<UserProfile>> {
        ensure_admin(identity)?;
        Ok(self.users.list_users().await?.iter().map(User::profile).collect())
    }

    pub async fn get(&self, identity: &Identity, id: Uuid) -> Result<UserProfile> {
        ensure_access(identity, id)?;
        let user = self.users.find_user(id).await?.ok_or(EcommerceError::NotFound("User"))?;
        Ok(user.profile())
    }

    pub async fn update(&self, identity: &Identity, id: Uuid, update: UpdateUser) -> Result<UserProfile> {
        if identity.user_id != id { ensure_admin(identity)?; }
        if update.role.is_some() || update.is_active.is_some() { ensure_admin(identity)?; }
        update.validate().map_err(invalid)?;

        let mut user = self.users.find_user(id).await?.ok_or(EcommerceError::NotFound("User"))?;
        if let Some(first_name) = update.first_name { user.first_name = first_name.trim().to_string(); }
        if let Some(last_name) = update.last_name { user.last_name = last_name.trim().to_string(); }
        if let Some(email) = update.email { user.email = parse_email(&email)?; }
        if let Some(password) = update.password { user.password_hash = auth::hash_password(&password); }
        if let Some(role) = update.role { user.role = role; }
        if let Some(is_active) = update.is_active { user.is_active = is_active; }
        user.touch();

        if !self.users.update_user(&user).await? {
            return Err(EcommerceError::NotFound("User"));
        }
        if !user.is_active {
            self.sessions.delete_sessions_for_user(user.id).await?;
        }
        Ok(user.profile())
    }

    pub async fn delete(&self, identity: &Identity, id: Uuid) -> Result<()> {
        if identity.user_id != id { ensure_admin(identity)?; }
        if !self.users.delete_user(id).await? {
            return Err(EcommerceError::NotFound("User"));
        }
        let revoked = self.sessions.delete_sessions_for_user(id).await?;
        info!(user_id = %id, revoked, "user deleted");
        Ok(())
    }

    /// Creates the admin account, or promotes an existing account with that
    /// email. Safe to call on every start.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<UserProfile> {
        let email = parse_email(email)?;
        if let Some(mut user) = self.users.find_user_by_email(&email).await? {
            if user.role != Role::Admin || !user.is_active {
                user.role = Role::Admin;
                user.is_active = true;
                user.touch();
                self.users.update_user(&user).await?;
                info!(user_id = %user.id, "promoted existing account to admin");
            }
            return Ok(user.profile());
        }
        let user = User::new("Admin".into(), "User".into(), email, auth::hash_password(password), Role::Admin);
        self.users.insert_user(&user).await?;
        info!(user_id = %user.id, "admin account created");
        Ok(user.profile())
    }

    async fn start_session(&self, user: &User) -> Result<AuthResponse> {
        let (token, token_hash) = auth::generate_token();
        let now = Utc::now();
        let purged = self.sessions.delete_expired_sessions(now).await?;
        if purged > 0 { debug!(purged, "expired sessions removed"); }
        let record = SessionRecord { token_hash, user_id: user.id, expires_at: now + self.session_ttl, created_at: now };
        self.sessions.insert_session(&record).await?;
        Ok(AuthResponse { user: user.profile(), token, expires_at: record.expires_at })
    }
}
