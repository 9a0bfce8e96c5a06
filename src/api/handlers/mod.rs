//! HTTP handlers.
//!
//! Pages are intentionally thin: the interesting work happened in the
//! authorization chain before a handler runs. Each page consumes the
//! session flash and embeds the session CSRF token in any form it renders.

pub mod admin;
pub mod health;
pub mod home;
pub mod login;
pub mod student;
pub mod teacher;

use axum::response::Html;

use crate::auth::catalog;
use crate::auth::chain::CheckKind;
use crate::auth::flash::Flash;
use crate::auth::routes;
use crate::auth::session::{CurrentSession, SessionUser};

// Navigation candidates; a link is only shown when the protection table
// would let the session through. Hiding is a courtesy, the chain enforces.
const NAV_LINKS: &[(&str, &str)] = &[
    ("/admin/books", "Books"),
    ("/admin/borrowings", "Borrowings"),
    ("/admin/visitors", "Visitors"),
    ("/teacher/grades", "Class grades"),
    ("/student/grades", "My grades"),
    ("/student/borrowings", "My borrowings"),
    ("/student/profile", "My profile"),
];

pub(crate) fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Whether the protection table would admit this session to `route`.
/// CSRF and rate-limit checks are request-shaped, not identity-shaped, so
/// they do not affect menu visibility.
pub(crate) fn table_admits(user: Option<&SessionUser>, route: &str) -> bool {
    let Some(protection) = routes::protection_for(route) else {
        return true;
    };
    protection.checks.iter().all(|check| match check {
        CheckKind::Auth => user.is_some(),
        CheckKind::Role(required) => user.is_some_and(|user| user.role == *required),
        CheckKind::Permission(required) => user.is_some_and(|user| {
            required
                .iter()
                .all(|permission| catalog::role_has(user.role, *permission))
        }),
        CheckKind::Csrf | CheckKind::RateLimit => true,
    })
}

fn nav(session: &CurrentSession) -> String {
    let mut items = vec!["<a href=\"/\">Home</a>".to_string()];
    for (route, label) in NAV_LINKS {
        if table_admits(session.user.as_ref(), route) {
            items.push(format!("<a href=\"{route}\">{label}</a>"));
        }
    }
    match session.user.as_ref() {
        Some(user) => items.push(format!(
            "<form method=\"post\" action=\"/logout\">\
             <input type=\"hidden\" name=\"csrf_token\" value=\"{}\">\
             <button type=\"submit\">Sign out ({})</button></form>",
            escape_html(&session.csrf_token),
            escape_html(&user.username),
        )),
        None => items.push("<a href=\"/login\">Sign in</a>".to_string()),
    }
    items.join("\n")
}

fn render_flash(flash: Option<&Flash>) -> String {
    flash.map_or_else(String::new, |flash| {
        format!(
            "<p class=\"flash flash-{}\">{}</p>",
            flash.kind.as_str(),
            escape_html(&flash.message)
        )
    })
}

/// Shared page shell.
pub(crate) fn page(
    title: &str,
    session: &CurrentSession,
    flash: Option<&Flash>,
    body: &str,
) -> Html<String> {
    Html(format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{} - Pustaka</title>\n</head>\n<body>\n\
         <header><h1>Pustaka</h1>\n<nav>\n{}\n</nav></header>\n\
         {}\n<main>\n{}\n</main>\n</body>\n</html>\n",
        escape_html(title),
        nav(session),
        render_flash(flash),
        body,
    ))
}

/// Hidden CSRF input for state-changing forms.
pub(crate) fn csrf_field(session: &CurrentSession) -> String {
    format!(
        "<input type=\"hidden\" name=\"csrf_token\" value=\"{}\">",
        escape_html(&session.csrf_token)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::catalog::Role;
    use uuid::Uuid;

    fn user(role: Role) -> SessionUser {
        SessionUser {
            id: Uuid::new_v4(),
            username: "someone".to_string(),
            role,
        }
    }

    #[test]
    fn escape_html_covers_special_characters() {
        assert_eq!(
            escape_html("<b>\"Tom & Jerry's\"</b>"),
            "&lt;b&gt;&quot;Tom &amp; Jerry&#39;s&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn table_admits_follows_protection_table() {
        assert!(table_admits(Some(&user(Role::Admin)), "/admin/books"));
        assert!(!table_admits(Some(&user(Role::Student)), "/admin/books"));
        assert!(!table_admits(None, "/admin/books"));
        // Unlisted routes admit everyone (default-allow).
        assert!(table_admits(None, "/health"));
    }

    #[test]
    fn nav_hides_links_the_chain_would_deny() {
        let session = CurrentSession {
            token: "token".to_string(),
            user: Some(user(Role::Student)),
            csrf_token: "csrf".to_string(),
        };
        let nav = nav(&session);
        assert!(nav.contains("/student/grades"));
        assert!(!nav.contains("/admin/books"));
        assert!(nav.contains("Sign out"));
    }

    #[test]
    fn nav_offers_sign_in_to_guests() {
        let session = CurrentSession {
            token: "token".to_string(),
            user: None,
            csrf_token: "csrf".to_string(),
        };
        let nav = nav(&session);
        assert!(nav.contains("/login"));
        assert!(!nav.contains("/student/grades"));
    }
}
