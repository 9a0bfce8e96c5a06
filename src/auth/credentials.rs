//! Credential verification against the user store.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use regex::Regex;
use std::sync::Arc;
use tracing::{error, warn};

use super::catalog::Role;
use crate::store::{User, UserStore};

// Verified against when the username resolves to nothing, so a lookup miss
// burns roughly the same time as a wrong password.
const DUMMY_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$VE0e3g7DalWHgDwou3nuRA$uC6TER156UQpk0lNQ5+jHM0l5poVjPA1he/Tyn9J4Zw";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    #[error("unknown or inactive account")]
    NotFound,
    #[error("invalid credentials")]
    BadPassword,
    #[error("credential backend unavailable")]
    Unavailable,
}

pub struct CredentialStore {
    users: Arc<dyn UserStore>,
}

impl CredentialStore {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Verify a username/password pair, optionally scoped to the role the
    /// login form claimed.
    ///
    /// A store error is reported as [`AuthFailure::Unavailable`] and denies
    /// the login; authentication never fails open on a backend fault.
    ///
    /// # Errors
    /// Returns the matching [`AuthFailure`] when verification does not
    /// produce an active, matching user.
    pub async fn verify(
        &self,
        username: &str,
        password: &str,
        role: Option<Role>,
    ) -> Result<User, AuthFailure> {
        let username = normalize_username(username);
        if !valid_username(&username) {
            let _ = password_matches(password, DUMMY_PASSWORD_HASH);
            return Err(AuthFailure::NotFound);
        }

        let user = self
            .users
            .find_active_by_username(&username, role)
            .await
            .map_err(|err| {
                error!("credential lookup failed: {err:#}");
                AuthFailure::Unavailable
            })?;

        let Some(user) = user else {
            let _ = password_matches(password, DUMMY_PASSWORD_HASH);
            return Err(AuthFailure::NotFound);
        };

        if !password_matches(password, &user.password_hash) {
            return Err(AuthFailure::BadPassword);
        }

        // Best-effort login stamp; a failed update must not block the login.
        if let Err(err) = self.users.record_login(user.id).await {
            warn!(user_id = %user.id, "failed to record login timestamp: {err:#}");
        }

        Ok(user)
    }
}

/// Normalize a username for lookup the same way registration stores it.
pub(crate) fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Basic shape check on an already-normalized username.
pub(crate) fn valid_username(username: &str) -> bool {
    Regex::new(r"^[a-z0-9][a-z0-9._-]{2,31}$").is_ok_and(|regex| regex.is_match(username))
}

fn password_matches(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryUserStore;
    use anyhow::Result;
    use async_trait::async_trait;
    use uuid::Uuid;

    struct BrokenUserStore;

    #[async_trait]
    impl UserStore for BrokenUserStore {
        async fn find_active_by_username(
            &self,
            _username: &str,
            _role: Option<Role>,
        ) -> Result<Option<User>> {
            anyhow::bail!("backend down")
        }

        async fn find_by_id(&self, _id: Uuid) -> Result<Option<User>> {
            anyhow::bail!("backend down")
        }

        async fn record_login(&self, _user_id: Uuid) -> Result<()> {
            anyhow::bail!("backend down")
        }
    }

    async fn store_with_student() -> Arc<MemoryUserStore> {
        let store = Arc::new(MemoryUserStore::new());
        store
            .seed("wira", "hunter42", Role::Student, "Wira Putra", "wira@example.sch.id")
            .await
            .expect("seed user");
        store
    }

    #[test]
    fn username_normalization_and_shape() {
        assert_eq!(normalize_username("  Wira "), "wira");
        assert!(valid_username("wira.putra"));
        assert!(!valid_username("w"));
        assert!(!valid_username("name with spaces"));
    }

    #[test]
    fn dummy_hash_parses() {
        assert!(PasswordHash::new(DUMMY_PASSWORD_HASH).is_ok());
    }

    #[tokio::test]
    async fn verify_accepts_correct_credentials() {
        let store = store_with_student().await;
        let credentials = CredentialStore::new(store.clone());

        let user = credentials
            .verify("wira", "hunter42", Some(Role::Student))
            .await
            .expect("login succeeds");
        assert_eq!(user.username, "wira");

        // Best-effort login stamp landed.
        let stamped = store
            .find_by_id(user.id)
            .await
            .expect("lookup")
            .expect("user");
        assert!(stamped.last_login_at.is_some());
    }

    #[tokio::test]
    async fn verify_rejects_wrong_password() {
        let store = store_with_student().await;
        let credentials = CredentialStore::new(store);

        let result = credentials.verify("wira", "wrong", None).await;
        assert_eq!(result.unwrap_err(), AuthFailure::BadPassword);
    }

    #[tokio::test]
    async fn verify_rejects_unknown_user() {
        let store = store_with_student().await;
        let credentials = CredentialStore::new(store);

        let result = credentials.verify("nobody", "hunter42", None).await;
        assert_eq!(result.unwrap_err(), AuthFailure::NotFound);
    }

    #[tokio::test]
    async fn verify_rejects_wrong_role_scope() {
        let store = store_with_student().await;
        let credentials = CredentialStore::new(store);

        // Right password, wrong claimed role: indistinguishable from an
        // unknown account.
        let result = credentials
            .verify("wira", "hunter42", Some(Role::Admin))
            .await;
        assert_eq!(result.unwrap_err(), AuthFailure::NotFound);
    }

    #[tokio::test]
    async fn store_error_fails_closed() {
        let credentials = CredentialStore::new(Arc::new(BrokenUserStore));
        let result = credentials.verify("wira", "hunter42", None).await;
        assert_eq!(result.unwrap_err(), AuthFailure::Unavailable);
    }
}
