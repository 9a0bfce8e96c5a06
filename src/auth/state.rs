//! Application state and configuration shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use super::credentials::CredentialStore;
use super::rate_limit::RateLimiter;
use super::session::SessionManager;
use crate::store::UserStore;

const DEFAULT_SESSION_TTL_SECONDS: u64 = 30 * 60;
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u64 = 60;
const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: u64 = 60;
const DEFAULT_LOGIN_ROUTE: &str = "/login";
const DEFAULT_DENIED_ROUTE: &str = "/";

#[derive(Clone, Debug)]
pub struct AppConfig {
    base_url: String,
    session_ttl_seconds: u64,
    rate_limit_max_requests: u64,
    rate_limit_window_seconds: u64,
    login_route: String,
    denied_route: String,
}

impl AppConfig {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            rate_limit_max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            rate_limit_window_seconds: DEFAULT_RATE_LIMIT_WINDOW_SECONDS,
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            denied_route: DEFAULT_DENIED_ROUTE.to_string(),
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_rate_limit_max_requests(mut self, max_requests: u64) -> Self {
        self.rate_limit_max_requests = max_requests;
        self
    }

    #[must_use]
    pub fn with_rate_limit_window_seconds(mut self, seconds: u64) -> Self {
        self.rate_limit_window_seconds = seconds;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> u64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    #[must_use]
    pub fn rate_limit_max_requests(&self) -> u64 {
        self.rate_limit_max_requests
    }

    #[must_use]
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_seconds)
    }

    #[must_use]
    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    #[must_use]
    pub fn denied_route(&self) -> &str {
        &self.denied_route
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

/// Everything a request handler can reach. Session state is explicit and
/// travels through this struct; there is no ambient global session.
#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    sessions: Arc<SessionManager>,
    credentials: Arc<CredentialStore>,
    limiter: Arc<dyn RateLimiter>,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, users: Arc<dyn UserStore>, limiter: Arc<dyn RateLimiter>) -> Self {
        let sessions = Arc::new(SessionManager::new(config.session_timeout()));
        Self {
            config: Arc::new(config),
            sessions,
            credentials: Arc::new(CredentialStore::new(users)),
            limiter,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    #[must_use]
    pub fn limiter(&self) -> &dyn RateLimiter {
        self.limiter.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_and_overrides() {
        let config = AppConfig::new("https://library.example.sch.id".to_string());

        assert_eq!(config.session_ttl_seconds(), DEFAULT_SESSION_TTL_SECONDS);
        assert_eq!(
            config.rate_limit_max_requests(),
            DEFAULT_RATE_LIMIT_MAX_REQUESTS
        );
        assert_eq!(config.login_route(), "/login");
        assert!(config.cookie_secure());

        let config = config
            .with_session_ttl_seconds(60)
            .with_rate_limit_max_requests(5)
            .with_rate_limit_window_seconds(10);

        assert_eq!(config.session_ttl_seconds(), 60);
        assert_eq!(config.rate_limit_max_requests(), 5);
        assert_eq!(config.rate_limit_window(), Duration::from_secs(10));
    }

    #[test]
    fn plain_http_base_url_keeps_cookie_insecure() {
        let config = AppConfig::new("http://localhost:8080".to_string());
        assert!(!config.cookie_secure());
    }
}
