//! Authentication and authorization core.
//!
//! This module coordinates credential verification, session lifecycle, the
//! static permission catalog, and the per-request authorization chain.
//!
//! ## Ordering
//!
//! The chain stages run in a fixed order: security headers, authentication,
//! role, permission, CSRF, rate limit. Authentication always precedes role
//! and permission (a role is meaningless without a subject), and CSRF only
//! applies to state-changing requests of an established session.
//!
//! ## Enforcement vs rendering
//!
//! The permission catalog feeds both the navigation menu and the chain.
//! Hiding a link is a courtesy; the chain is the enforcement point and every
//! protected route is checked server-side regardless of what the UI showed.

pub mod catalog;
pub mod chain;
pub mod credentials;
pub mod flash;
pub mod rate_limit;
pub mod routes;
pub mod session;
pub mod state;

pub use chain::CheckKind;
pub use credentials::{AuthFailure, CredentialStore};
pub use flash::{Flash, FlashKind};
pub use rate_limit::{NoopRateLimiter, RateLimitDecision, RateLimiter, SlidingWindowRateLimiter};
pub use session::{CurrentSession, SessionManager, SessionUser};
pub use state::{AppConfig, AppState};
