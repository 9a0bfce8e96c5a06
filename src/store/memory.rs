//! In-memory stores for development and tests.
//!
//! The user store holds accounts in a map guarded by a mutex; the counter
//! store is the default backing for the rate limiter in every deployment
//! (counters are ephemeral by contract, so process-local state is enough).

use anyhow::{Context, Result, anyhow};
use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CounterStore, User, UserStore};
use crate::auth::catalog::Role;

// Keep the counter map from growing without bound under key churn.
const COUNTER_PRUNE_THRESHOLD: usize = 4096;

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a prepared user record.
    pub async fn insert(&self, user: User) {
        let mut users = self.users.lock().await;
        users.insert(user.id, user);
    }

    /// Create an active account with a freshly hashed password.
    ///
    /// # Errors
    /// Returns an error if password hashing fails.
    pub async fn seed(
        &self,
        username: &str,
        password: &str,
        role: Role,
        full_name: &str,
        email: &str,
    ) -> Result<Uuid> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| anyhow!("failed to hash password: {err}"))?
            .to_string();

        let id = Uuid::new_v4();
        self.insert(User {
            id,
            username: username.to_string(),
            password_hash,
            full_name: full_name.to_string(),
            email: email.to_string(),
            role,
            is_active: true,
            created_at: Utc::now(),
            last_login_at: None,
        })
        .await;
        Ok(id)
    }

    /// Flip the soft-delete flag on an account.
    pub async fn set_active(&self, id: Uuid, is_active: bool) {
        let mut users = self.users.lock().await;
        if let Some(user) = users.get_mut(&id) {
            user.is_active = is_active;
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_active_by_username(
        &self,
        username: &str,
        role: Option<Role>,
    ) -> Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users
            .values()
            .find(|user| {
                user.is_active
                    && user.username == username
                    && role.is_none_or(|role| user.role == role)
            })
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.get(&id).cloned())
    }

    async fn record_login(&self, user_id: Uuid) -> Result<()> {
        let mut users = self.users.lock().await;
        let user = users
            .get_mut(&user_id)
            .context("no such user for login stamp")?;
        user.last_login_at = Some(Utc::now());
        Ok(())
    }
}

#[derive(Debug)]
struct Counter {
    count: u64,
    window_start: Instant,
}

/// Process-local counter store with per-key atomic increments.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: StdMutex<HashMap<String, Counter>>,
}

impl MemoryCounterStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for MemoryCounterStore {
    fn increment(&self, key: &str, window: Duration) -> Result<u64> {
        let now = Instant::now();
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| anyhow!("counter store lock poisoned"))?;

        if counters.len() > COUNTER_PRUNE_THRESHOLD {
            counters.retain(|_, counter| now.duration_since(counter.window_start) <= window);
        }

        let counter = counters.entry(key.to_string()).or_insert(Counter {
            count: 0,
            window_start: now,
        });
        if now.duration_since(counter.window_start) > window {
            counter.count = 0;
            counter.window_start = now;
        }
        counter.count += 1;
        Ok(counter.count)
    }
}
