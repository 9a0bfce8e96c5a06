//! # Pustaka (School Library Authorization Core)
//!
//! `pustaka` is the authentication and authorization core of a school library
//! service. It verifies credentials, manages server-side sessions, and guards
//! every page behind an ordered authorization chain.
//!
//! ## Authorization Chain
//!
//! Each request passes through a fixed pipeline before its handler runs:
//! security headers, authentication, role, permission, CSRF, and rate limit.
//! The first failing stage terminates the request with a redirect (or 429),
//! so a denied request never reaches later stages or the handler.
//!
//! - **Roles:** `admin`, `teacher`, `student`. Role levels are advisory
//!   display metadata; permission grants are always explicit, an admin does
//!   not implicitly inherit teacher or student permissions.
//! - **Sessions:** server-side records keyed by the hash of an opaque cookie
//!   token. Expiry is sliding (every authorized request refreshes it) and
//!   cooperative: an idle session is destroyed on its next access attempt.
//! - **Default-allow:** routes absent from the protection table are served
//!   unprotected. This preserves the historical behavior of the system and
//!   is pinned by tests; new protected pages must be added to the table.
//!
//! ## Failure Policy
//!
//! Authentication and authorization fail closed on any backend error. The
//! rate limiter is the single deliberate exception: losing its counters only
//! weakens a secondary protection, so it fails open toward availability.

pub mod api;
pub mod auth;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
