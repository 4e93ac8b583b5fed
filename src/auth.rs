//! Credentials and bearer sessions.
//!
//! Passwords are stored as `sha256$<rounds>$<salt hex>$<digest hex>`. Session
//! tokens are 32 random bytes, hex encoded; only their SHA-256 digest is
//! persisted, so a leaked sessions table does not leak usable tokens.

use chrono::{DateTime, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::aggregates::Role;

const HASH_SCHEME: &str = "sha256";
const HASH_ROUNDS: u32 = 10_000;
const SALT_LEN: usize = 16;
const TOKEN_LEN: usize = 32;

/// The caller behind a verified bearer token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn is_staff(&self) -> bool { self.role.is_staff() }
    pub fn is_admin(&self) -> bool { self.role.is_admin() }

    /// Owners act on their own resources; staff act on anyone's.
    pub fn can_access(&self, owner: Uuid) -> bool { self.user_id == owner || self.is_staff() }
}

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct SessionRecord {
    pub token_hash: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool { self.expires_at <= now }
}

pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let digest = stretch(password.as_bytes(), &salt, HASH_ROUNDS);
    format!("{HASH_SCHEME}${HASH_ROUNDS}${}${}", hex::encode(salt), hex::encode(digest))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(HASH_SCHEME), Some(rounds), Some(salt), Some(expected), None) =
        (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let (Ok(rounds), Ok(salt), Ok(expected)) = (rounds.parse::<u32>(), hex::decode(salt), hex::decode(expected)) else {
        return false;
    };
    constant_time_eq(&stretch(password.as_bytes(), &salt, rounds), &expected)
}

fn stretch(password: &[u8], salt: &[u8], rounds: u32) -> [u8; 32] {
    let mut digest: [u8; 32] = Sha256::new().chain_update(salt).chain_update(password).finalize().into();
    for _ in 1..rounds {
        digest = Sha256::new().chain_update(digest).chain_update(salt).chain_update(password).finalize().into();
    }
    digest
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Returns the plain token and the digest to persist.
pub fn generate_token() -> (String, String) {
    let mut bytes = [0u8; TOKEN_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    let digest = token_digest(&token);
    (token, digest)
}

pub fn token_digest(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }
