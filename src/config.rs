use std::{env, fmt::Display, str::FromStr};

use anyhow::{anyhow, Context};
use tracing::info;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub nats_url: Option<String>,
    pub event_subject_prefix: String,
    pub session_ttl_hours: i64,
    pub admin: Option<AdminBootstrap>,
}

/// Admin account ensured at startup.
#[derive(Clone, Debug)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let admin = match (optional("ADMIN_EMAIL"), optional("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap { email, password }),
            (None, None) => None,
            _ => return Err(anyhow!("ADMIN_EMAIL and ADMIN_PASSWORD must be set together")),
        };

        let session_ttl_hours: i64 = try_load("SESSION_TTL_HOURS", "24")?;
        if session_ttl_hours <= 0 {
            return Err(anyhow!("SESSION_TTL_HOURS must be positive"));
        }

        Ok(Self {
            port: try_load("PORT", "8083")?,
            database_url: optional("DATABASE_URL"),
            database_max_connections: try_load("DATABASE_MAX_CONNECTIONS", "10")?,
            nats_url: optional("NATS_URL"),
            event_subject_prefix: try_load("EVENT_SUBJECT_PREFIX", "storefront")?,
            session_ttl_hours,
            admin,
        })
    }

    pub fn session_ttl(&self) -> chrono::Duration { chrono::Duration::hours(self.session_ttl_hours) }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = optional(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse().map_err(|e| anyhow!("{e}")).with_context(|| format!("invalid {key} value '{raw}'"))
}
