//! Persistence interface for user records and rate-limit counters.
//!
//! The core only depends on the traits below. One backend is selected
//! explicitly at startup via [`StoreBackend`]; there is no probing and no
//! silent fallback between backends, since that would change durability
//! guarantees without anyone noticing.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::auth::catalog::Role;

pub mod memory;
pub mod postgres;

pub use memory::{MemoryCounterStore, MemoryUserStore};
pub use postgres::PgUserStore;

/// A persisted account. Accounts are never hard-deleted; `is_active` is the
/// soft-delete flag and inactive accounts are invisible to lookups.
#[derive(Clone, Debug)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Read access to user records.
///
/// All operations must be atomic and durable for the backend in use; the
/// callers treat any `Err` as fail-closed for authentication decisions.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up an active user by username, optionally scoped to a role
    /// (role-scoped login forms pass the role the user claimed).
    async fn find_active_by_username(
        &self,
        username: &str,
        role: Option<Role>,
    ) -> Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Stamp a successful login. Best-effort: callers log failures and move on.
    async fn record_login(&self, user_id: Uuid) -> Result<()>;
}

/// Windowed counter storage for the rate limiter.
///
/// Counters are ephemeral; losing them on restart is acceptable. The
/// increment must be atomic per key.
pub trait CounterStore: Send + Sync {
    /// Increment the counter for `key`, starting a fresh window when the
    /// previous one is older than `window`. Returns the count within the
    /// current window, including this increment.
    fn increment(&self, key: &str, window: Duration) -> Result<u64>;
}

/// Which persistence backend to run against, chosen once at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Postgres => write!(f, "postgres"),
            Self::Memory => write!(f, "memory"),
        }
    }
}
