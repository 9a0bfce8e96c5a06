//! Server-side session lifecycle.
//!
//! Sessions live in-process, keyed by the SHA-256 hash of an opaque cookie
//! token; raw tokens never touch the store. Expiry is sliding and
//! cooperative: every authorized request refreshes the clock, and an idle
//! session is destroyed on its next access attempt rather than by a sweeper.
//! A session without a user is an anonymous/guest session and still carries
//! a CSRF token, a flash slot, and the post-login destination.

use anyhow::{Context, Result};
use axum::http::{HeaderMap, HeaderValue, header::InvalidHeaderValue};
use base64::Engine;
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::catalog::Role;
use super::flash::Flash;
use super::state::AppConfig;

pub const SESSION_COOKIE_NAME: &str = "pustaka_session";

/// The subject a session was issued to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

/// Read-only snapshot handed to the chain and to handlers.
#[derive(Clone, Debug)]
pub struct SessionView {
    pub user: Option<SessionUser>,
    pub csrf_token: String,
}

/// Request extension inserted by the authorization chain once a request has
/// cleared every check. Handlers read session data from here instead of an
/// ambient global.
#[derive(Clone, Debug)]
pub struct CurrentSession {
    pub token: String,
    pub user: Option<SessionUser>,
    pub csrf_token: String,
}

struct SessionState {
    user: Option<SessionUser>,
    login_time: Instant,
    last_activity: Instant,
    csrf_token: String,
    flash: Option<Flash>,
    return_to: Option<String>,
}

pub struct SessionManager {
    timeout: Duration,
    sessions: Mutex<HashMap<Vec<u8>, SessionState>>,
}

impl SessionManager {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a fresh session and return the raw cookie token.
    ///
    /// # Errors
    /// Returns an error if token generation fails.
    pub async fn create(&self, user: Option<SessionUser>) -> Result<String> {
        let token = generate_session_token()?;
        let csrf_token = generate_csrf_token()?;
        let now = Instant::now();

        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, state| !expired(state.login_time, now, self.timeout));
        sessions.insert(
            hash_session_token(&token),
            SessionState {
                user,
                login_time: now,
                last_activity: now,
                csrf_token,
                flash: None,
                return_to: None,
            },
        );
        Ok(token)
    }

    /// Issue an anonymous/guest session (no subject attached).
    ///
    /// # Errors
    /// Returns an error if token generation fails.
    pub async fn create_anonymous(&self) -> Result<String> {
        self.create(None).await
    }

    /// Rotate the session on successful login: the previous (anonymous)
    /// session is destroyed and a fresh token is issued, so a pre-login
    /// token can never name an authenticated session.
    ///
    /// # Errors
    /// Returns an error if token generation fails.
    pub async fn login(&self, previous: Option<&str>, user: SessionUser) -> Result<String> {
        if let Some(previous) = previous {
            self.destroy(previous).await;
        }
        self.create(Some(user)).await
    }

    /// Resolve a token to a session snapshot. A timed-out session is
    /// destroyed as a side effect, not merely reported as missing.
    pub async fn resolve(&self, token: &str) -> Option<SessionView> {
        let key = hash_session_token(token);
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        let state = sessions.get(&key)?;
        if expired(state.login_time, now, self.timeout) {
            sessions.remove(&key);
            return None;
        }
        Some(SessionView {
            user: state.user.clone(),
            csrf_token: state.csrf_token.clone(),
        })
    }

    /// Whether the token names an authenticated, unexpired session.
    pub async fn is_active(&self, token: &str) -> bool {
        self.resolve(token)
            .await
            .is_some_and(|view| view.user.is_some())
    }

    /// Refresh the sliding-expiry clock; called on every authorized request.
    pub async fn touch(&self, token: &str) {
        let key = hash_session_token(token);
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        if let Some(state) = sessions.get_mut(&key) {
            if expired(state.login_time, now, self.timeout) {
                sessions.remove(&key);
            } else {
                state.login_time = now;
                state.last_activity = now;
            }
        }
    }

    /// Remove the session outright; the token is dead afterwards.
    pub async fn destroy(&self, token: &str) {
        let key = hash_session_token(token);
        let mut sessions = self.sessions.lock().await;
        sessions.remove(&key);
    }

    pub async fn set_flash(&self, token: &str, flash: Flash) {
        let key = hash_session_token(token);
        let mut sessions = self.sessions.lock().await;
        if let Some(state) = sessions.get_mut(&key) {
            state.flash = Some(flash);
        }
    }

    /// Consume the one-shot flash message, if any.
    pub async fn take_flash(&self, token: &str) -> Option<Flash> {
        let key = hash_session_token(token);
        let mut sessions = self.sessions.lock().await;
        sessions.get_mut(&key).and_then(|state| state.flash.take())
    }

    pub async fn set_return_to(&self, token: &str, path: impl Into<String>) {
        let key = hash_session_token(token);
        let mut sessions = self.sessions.lock().await;
        if let Some(state) = sessions.get_mut(&key) {
            state.return_to = Some(path.into());
        }
    }

    /// Consume the stored post-login destination, if any.
    pub async fn take_return_to(&self, token: &str) -> Option<String> {
        let key = hash_session_token(token);
        let mut sessions = self.sessions.lock().await;
        sessions
            .get_mut(&key)
            .and_then(|state| state.return_to.take())
    }
}

/// A session is expired strictly after `timeout`; a session exactly at the
/// boundary is still active.
fn expired(login_time: Instant, now: Instant, timeout: Duration) -> bool {
    now.saturating_duration_since(login_time) > timeout
}

/// Create a new session token for the auth cookie.
/// The raw value is only returned to set the cookie; the store keys by hash.
pub(crate) fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Create the per-session CSRF token embedded in state-changing forms.
pub(crate) fn generate_csrf_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate csrf token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a session token so raw values never sit in the session map.
pub(crate) fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Constant-time CSRF comparison. Both sides are hashed first so the
/// comparison length never depends on what the client submitted.
#[must_use]
pub fn csrf_tokens_match(submitted: &str, expected: &str) -> bool {
    let submitted = Sha256::digest(submitted.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    submitted.as_slice().ct_eq(expected.as_slice()).into()
}

/// Pull the session token out of the request cookies, if present.
#[must_use]
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

/// Build the `HttpOnly` session cookie for a token.
///
/// # Errors
/// Returns an error if the token produces an invalid header value.
pub fn session_cookie(
    config: &AppConfig,
    token: &str,
) -> std::result::Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    // Only mark cookies secure when the site is served over HTTPS.
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::catalog::Role;

    fn student() -> SessionUser {
        SessionUser {
            id: Uuid::new_v4(),
            username: "wira".to_string(),
            role: Role::Student,
        }
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let timeout = Duration::from_secs(1800);
        let login = Instant::now();
        // Exactly at the timeout the session is still active.
        assert!(!expired(login, login + timeout, timeout));
        assert!(expired(login, login + timeout + Duration::from_millis(1), timeout));
    }

    #[test]
    fn csrf_comparison_accepts_equal_rejects_other() {
        assert!(csrf_tokens_match("token-a", "token-a"));
        assert!(!csrf_tokens_match("token-a", "token-b"));
        assert!(!csrf_tokens_match("", "token-b"));
    }

    #[test]
    fn token_from_headers_finds_session_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("theme=dark; pustaka_session=abc123; lang=id"),
        );
        assert_eq!(token_from_headers(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn token_from_headers_none_when_missing() {
        let headers = HeaderMap::new();
        assert_eq!(token_from_headers(&headers), None);
    }

    #[tokio::test]
    async fn anonymous_session_is_not_active() {
        let manager = SessionManager::new(Duration::from_secs(1800));
        let token = manager.create_anonymous().await.expect("create");
        let view = manager.resolve(&token).await.expect("resolve");
        assert!(view.user.is_none());
        assert!(!view.csrf_token.is_empty());
        assert!(!manager.is_active(&token).await);
    }

    #[tokio::test]
    async fn login_rotates_the_token() {
        let manager = SessionManager::new(Duration::from_secs(1800));
        let anonymous = manager.create_anonymous().await.expect("create");
        let token = manager
            .login(Some(&anonymous), student())
            .await
            .expect("login");

        assert_ne!(anonymous, token);
        assert!(manager.resolve(&anonymous).await.is_none());
        assert!(manager.is_active(&token).await);
    }

    #[tokio::test]
    async fn timed_out_session_is_destroyed_on_access() {
        let manager = SessionManager::new(Duration::ZERO);
        let token = manager
            .login(None, student())
            .await
            .expect("login");
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert!(!manager.is_active(&token).await);
        // The check destroyed it, not just reported it.
        assert!(manager.resolve(&token).await.is_none());
    }

    #[tokio::test]
    async fn touch_extends_the_session() {
        let manager = SessionManager::new(Duration::from_millis(60));
        let token = manager.login(None, student()).await.expect("login");

        for _ in 0..3 {
            tokio::time::sleep(Duration::from_millis(40)).await;
            manager.touch(&token).await;
        }
        // Well past the original deadline, still active thanks to touch.
        assert!(manager.is_active(&token).await);
    }

    #[tokio::test]
    async fn flash_is_consumed_once() {
        let manager = SessionManager::new(Duration::from_secs(1800));
        let token = manager.create_anonymous().await.expect("create");

        manager.set_flash(&token, Flash::info("logged out")).await;
        let flash = manager.take_flash(&token).await.expect("flash present");
        assert_eq!(flash.message, "logged out");
        assert!(manager.take_flash(&token).await.is_none());
    }

    #[tokio::test]
    async fn return_to_round_trips_once() {
        let manager = SessionManager::new(Duration::from_secs(1800));
        let token = manager.create_anonymous().await.expect("create");

        manager.set_return_to(&token, "/admin/books").await;
        assert_eq!(
            manager.take_return_to(&token).await.as_deref(),
            Some("/admin/books")
        );
        assert!(manager.take_return_to(&token).await.is_none());
    }

    #[tokio::test]
    async fn destroyed_token_cannot_be_reused() {
        let manager = SessionManager::new(Duration::from_secs(1800));
        let token = manager.login(None, student()).await.expect("login");
        manager.destroy(&token).await;
        assert!(manager.resolve(&token).await.is_none());
    }
}
