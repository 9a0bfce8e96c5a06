//! Static route protection table.
//!
//! Maps normalized paths to the ordered list of checks the authorization
//! chain runs for that route. Routes not listed here are served
//! **unprotected**, the historical default of this system. The default is
//! security-relevant: every new protected page must be added here, and the
//! default-allow behavior is pinned by tests so a change to it is a
//! deliberate act.

use super::catalog::{Permission, Role};
use super::chain::CheckKind;

pub struct RouteProtection {
    pub route: &'static str,
    pub checks: &'static [CheckKind],
}

pub const PROTECTED_ROUTES: &[RouteProtection] = &[
    RouteProtection {
        route: "/login",
        checks: &[CheckKind::Csrf, CheckKind::RateLimit],
    },
    RouteProtection {
        route: "/logout",
        checks: &[CheckKind::Auth, CheckKind::Csrf],
    },
    RouteProtection {
        route: "/admin/books",
        checks: &[
            CheckKind::Auth,
            CheckKind::Role(Role::Admin),
            CheckKind::Permission(&[Permission::BookManage]),
        ],
    },
    RouteProtection {
        route: "/admin/books/create",
        checks: &[
            CheckKind::Auth,
            CheckKind::Role(Role::Admin),
            CheckKind::Permission(&[Permission::BookManage]),
            CheckKind::Csrf,
        ],
    },
    RouteProtection {
        route: "/admin/borrowings",
        checks: &[
            CheckKind::Auth,
            CheckKind::Role(Role::Admin),
            CheckKind::Permission(&[Permission::BorrowingManage]),
        ],
    },
    RouteProtection {
        route: "/admin/borrowings/return",
        checks: &[
            CheckKind::Auth,
            CheckKind::Role(Role::Admin),
            CheckKind::Permission(&[Permission::BorrowingManage]),
            CheckKind::Csrf,
        ],
    },
    RouteProtection {
        route: "/admin/visitors",
        checks: &[
            CheckKind::Auth,
            CheckKind::Role(Role::Admin),
            CheckKind::Permission(&[Permission::VisitorManage]),
        ],
    },
    RouteProtection {
        route: "/teacher/grades",
        checks: &[
            CheckKind::Auth,
            CheckKind::Role(Role::Teacher),
            CheckKind::Permission(&[Permission::GradeManage]),
        ],
    },
    RouteProtection {
        route: "/teacher/grades/save",
        checks: &[
            CheckKind::Auth,
            CheckKind::Role(Role::Teacher),
            CheckKind::Permission(&[Permission::GradeManage]),
            CheckKind::Csrf,
            CheckKind::RateLimit,
        ],
    },
    RouteProtection {
        route: "/student/grades",
        checks: &[
            CheckKind::Auth,
            CheckKind::Role(Role::Student),
            CheckKind::Permission(&[Permission::GradeView]),
        ],
    },
    RouteProtection {
        route: "/student/borrowings",
        checks: &[
            CheckKind::Auth,
            CheckKind::Role(Role::Student),
            CheckKind::Permission(&[Permission::BorrowingView]),
        ],
    },
    RouteProtection {
        route: "/student/profile",
        checks: &[
            CheckKind::Auth,
            CheckKind::Role(Role::Student),
            CheckKind::Permission(&[Permission::ProfileEdit]),
        ],
    },
    RouteProtection {
        route: "/student/profile/update",
        checks: &[
            CheckKind::Auth,
            CheckKind::Role(Role::Student),
            CheckKind::Permission(&[Permission::ProfileEdit]),
            CheckKind::Csrf,
        ],
    },
];

/// Normalize a request path for table lookup: leading slash guaranteed,
/// trailing slash stripped (except for the root itself).
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let path = path.trim();
    let mut normalized = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

/// Look up the protection entry for a normalized path. `None` means the
/// route is served unprotected (default-allow).
#[must_use]
pub fn protection_for(path: &str) -> Option<&'static RouteProtection> {
    let normalized = normalize_path(path);
    PROTECTED_ROUTES
        .iter()
        .find(|protection| protection.route == normalized)
}

/// Landing page after login for each role.
#[must_use]
pub fn home_for(role: Role) -> &'static str {
    match role {
        Role::Admin => "/admin/books",
        Role::Teacher => "/teacher/grades",
        Role::Student => "/student/grades",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_path_handles_slashes() {
        assert_eq!(normalize_path("/admin/books/"), "/admin/books");
        assert_eq!(normalize_path("admin/books"), "/admin/books");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn protection_lookup_is_exact_after_normalization() {
        assert!(protection_for("/admin/books").is_some());
        assert!(protection_for("/admin/books/").is_some());
        assert!(protection_for("/admin/books/123").is_none());
    }

    #[test]
    fn unlisted_routes_are_unprotected() {
        // Security-relevant default: anything not in the table is open.
        assert!(protection_for("/").is_none());
        assert!(protection_for("/health").is_none());
        assert!(protection_for("/admin/settings").is_none());
    }

    #[test]
    fn table_checks_follow_chain_order() {
        for protection in PROTECTED_ROUTES {
            let stages: Vec<u8> = protection
                .checks
                .iter()
                .map(CheckKind::stage)
                .collect();
            let mut sorted = stages.clone();
            sorted.sort_unstable();
            assert_eq!(stages, sorted, "out-of-order checks for {}", protection.route);
        }
    }

    #[test]
    fn state_changing_routes_require_csrf() {
        for route in [
            "/login",
            "/logout",
            "/admin/books/create",
            "/admin/borrowings/return",
            "/teacher/grades/save",
            "/student/profile/update",
        ] {
            let protection = protection_for(route).expect("route listed");
            assert!(
                protection
                    .checks
                    .iter()
                    .any(|check| matches!(check, CheckKind::Csrf)),
                "{route} is missing a CSRF check"
            );
        }
    }

    #[test]
    fn protected_pages_authenticate_before_authorizing() {
        for protection in PROTECTED_ROUTES {
            let needs_subject = protection.checks.iter().any(|check| {
                matches!(check, CheckKind::Role(_) | CheckKind::Permission(_))
            });
            if needs_subject {
                assert!(
                    matches!(protection.checks.first(), Some(CheckKind::Auth)),
                    "{} must authenticate first",
                    protection.route
                );
            }
        }
    }

    #[test]
    fn home_for_matches_protected_roots() {
        for role in Role::ALL {
            assert!(protection_for(home_for(*role)).is_some());
        }
    }
}
