//! Per-request authorization chain.
//!
//! Flow Overview:
//! 1) Resolve (or issue) the session for the request cookie.
//! 2) Look up the route's protection entry and run its checks in order.
//! 3) The first failing check terminates the request with a redirect or 429;
//!    a passing request reaches the handler with its session attached.
//! 4) Security headers go on every response, allowed or denied.
//!
//! A check either passes or terminates the request; no check partially
//! executes work and then fails. Authentication always precedes role and
//! permission checks, and CSRF only applies to state-changing methods.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, error, warn};
use url::Url;

use super::catalog::{self, Permission, Role};
use super::flash::Flash;
use super::rate_limit::RateLimitDecision;
use super::routes;
use super::session::{self, CurrentSession, SessionView};
use super::state::AppState;

// Enough for any of the small forms this service serves.
const CSRF_BODY_LIMIT: usize = 64 * 1024;

const CSRF_HEADER: &str = "x-csrf-token";
const CSRF_FIELD: &str = "csrf_token";

/// One stage of the chain, as configured per route. The tag carries its own
/// parameters; nothing is parsed from strings at dispatch time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckKind {
    Auth,
    Role(Role),
    Permission(&'static [Permission]),
    Csrf,
    RateLimit,
}

impl CheckKind {
    /// Canonical pipeline position, used to keep the route table honest.
    pub(crate) const fn stage(&self) -> u8 {
        match self {
            Self::Auth => 1,
            Self::Role(_) => 2,
            Self::Permission(_) => 3,
            Self::Csrf => 4,
            Self::RateLimit => 5,
        }
    }
}

/// Response headers set on every response, allowed or denied.
pub const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    (
        "content-security-policy",
        "default-src 'self'; frame-ancestors 'none'",
    ),
    ("referrer-policy", "strict-origin-when-cross-origin"),
];

pub(crate) fn apply_security_headers(headers: &mut HeaderMap) {
    for &(name, value) in SECURITY_HEADERS {
        headers.insert(
            header::HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
}

/// Axum middleware wrapping every route with the authorization chain.
pub async fn guard(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let path = routes::normalize_path(request.uri().path());
    let method = request.method().clone();
    let client_ip = client_ip(request.headers());
    let referer = request.headers().get(header::REFERER).cloned();

    // Resolve the presented cookie, or issue a fresh anonymous session. A
    // token that names an expired session was already destroyed by resolve,
    // so it gets a fresh session like any first-time visitor.
    let presented = session::token_from_headers(request.headers());
    let mut issued = false;
    let (token, view) = match presented {
        Some(token) => match state.sessions().resolve(&token).await {
            Some(view) => (token, view),
            None => match fresh_session(&state).await {
                Ok(pair) => {
                    issued = true;
                    pair
                }
                Err(response) => return response,
            },
        },
        None => match fresh_session(&state).await {
            Ok(pair) => {
                issued = true;
                pair
            }
            Err(response) => return response,
        },
    };

    let mut denial = None;
    if let Some(protection) = routes::protection_for(&path) {
        for check in protection.checks {
            let result = match check {
                CheckKind::Auth => check_auth(&state, &token, &view, &path).await,
                CheckKind::Role(required) => {
                    check_role(&state, &token, &view, &path, *required).await
                }
                CheckKind::Permission(required) => {
                    check_permission(&state, &token, &view, &path, required).await
                }
                CheckKind::Csrf => {
                    check_csrf(&state, &token, &view, &path, &method, referer.as_ref(), &mut request)
                        .await
                }
                CheckKind::RateLimit => check_rate_limit(&state, client_ip.as_deref(), &view),
            };
            if let Err(response) = result {
                denial = Some(response);
                break;
            }
        }
    } else {
        debug!(%path, "route not in protection table, serving unprotected");
    }

    let mut response = match denial {
        Some(response) => response,
        None => {
            // Sliding expiry: every request that cleared the chain refreshes
            // the session clock.
            state.sessions().touch(&token).await;
            request.extensions_mut().insert(CurrentSession {
                token: token.clone(),
                user: view.user.clone(),
                csrf_token: view.csrf_token.clone(),
            });
            next.run(request).await
        }
    };

    apply_security_headers(response.headers_mut());

    // Attach the cookie for a session issued here, unless a handler already
    // rotated it (login/logout set their own cookie).
    if issued && !response.headers().contains_key(header::SET_COOKIE) {
        match session::session_cookie(state.config(), &token) {
            Ok(cookie) => {
                response.headers_mut().append(header::SET_COOKIE, cookie);
            }
            Err(err) => error!("failed to build session cookie: {err}"),
        }
    }

    response
}

async fn fresh_session(state: &AppState) -> Result<(String, SessionView), Response> {
    let token = state.sessions().create_anonymous().await.map_err(|err| {
        error!("failed to create session: {err:#}");
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        apply_security_headers(response.headers_mut());
        response
    })?;
    let view = state.sessions().resolve(&token).await.ok_or_else(|| {
        error!("freshly created session did not resolve");
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        apply_security_headers(response.headers_mut());
        response
    })?;
    Ok((token, view))
}

async fn check_auth(
    state: &AppState,
    token: &str,
    view: &SessionView,
    path: &str,
) -> Result<(), Response> {
    if view.user.is_some() {
        return Ok(());
    }
    // Remember where the visitor was headed so login can resume there.
    state.sessions().set_return_to(token, path).await;
    state
        .sessions()
        .set_flash(token, Flash::warning("Please sign in to continue."))
        .await;
    Err(Redirect::to(state.config().login_route()).into_response())
}

async fn check_role(
    state: &AppState,
    token: &str,
    view: &SessionView,
    path: &str,
    required: Role,
) -> Result<(), Response> {
    let Some(user) = view.user.as_ref() else {
        // Table order guarantees Auth ran first; still fail closed.
        return check_auth(state, token, view, path).await;
    };
    if user.role == required {
        return Ok(());
    }
    warn!(
        subject = %user.id,
        %path,
        required = %required,
        actual = %user.role,
        "role check denied request"
    );
    Err(deny(state, token, "You do not have permission to access this page.").await)
}

async fn check_permission(
    state: &AppState,
    token: &str,
    view: &SessionView,
    path: &str,
    required: &'static [Permission],
) -> Result<(), Response> {
    let Some(user) = view.user.as_ref() else {
        return check_auth(state, token, view, path).await;
    };
    let missing = required
        .iter()
        .find(|permission| !catalog::role_has(user.role, **permission));
    let Some(missing) = missing else {
        return Ok(());
    };
    warn!(
        subject = %user.id,
        %path,
        role = %user.role,
        permission = catalog::permission_def(*missing).name,
        "permission check denied request"
    );
    Err(deny(state, token, "You do not have permission to access this page.").await)
}

async fn check_csrf(
    state: &AppState,
    token: &str,
    view: &SessionView,
    path: &str,
    method: &Method,
    referer: Option<&HeaderValue>,
    request: &mut Request,
) -> Result<(), Response> {
    if !is_state_changing(method) {
        return Ok(());
    }
    let submitted = submitted_csrf_token(request).await;
    if submitted
        .as_deref()
        .is_some_and(|submitted| session::csrf_tokens_match(submitted, &view.csrf_token))
    {
        return Ok(());
    }
    // Deliberately silent on whether the token was missing, stale, or wrong.
    warn!(%path, "csrf check denied request");
    state
        .sessions()
        .set_flash(
            token,
            Flash::error("Security token invalid or expired. Please try again."),
        )
        .await;
    let back = referer_path(referer).unwrap_or_else(|| state.config().denied_route().to_string());
    Err(Redirect::to(&back).into_response())
}

fn check_rate_limit(
    state: &AppState,
    client_ip: Option<&str>,
    view: &SessionView,
) -> Result<(), Response> {
    let subject = view
        .user
        .as_ref()
        .map_or_else(|| "anonymous".to_string(), |user| user.id.to_string());
    let key = format!("{}|{}", client_ip.unwrap_or("unknown"), subject);
    match state.limiter().check(&key) {
        RateLimitDecision::Allowed => Ok(()),
        RateLimitDecision::Limited => {
            warn!(%key, "rate limit exceeded");
            let retry_after = state
                .config()
                .rate_limit_window()
                .as_secs()
                .to_string();
            Err((
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after)],
                "Too many requests. Try again later.\n",
            )
                .into_response())
        }
    }
}

async fn deny(state: &AppState, token: &str, message: &str) -> Response {
    state
        .sessions()
        .set_flash(token, Flash::error(message))
        .await;
    Redirect::to(state.config().denied_route()).into_response()
}

fn is_state_changing(method: &Method) -> bool {
    matches!(method.as_str(), "POST" | "PUT" | "PATCH" | "DELETE")
}

/// Token from the `x-csrf-token` header, or the `csrf_token` field of a
/// urlencoded body. The body is buffered and put back so the handler's own
/// extractor still sees it.
async fn submitted_csrf_token(request: &mut Request) -> Option<String> {
    if let Some(value) = request.headers().get(CSRF_HEADER) {
        return value.to_str().ok().map(str::to_string);
    }
    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));
    if !is_form {
        return None;
    }
    let body = std::mem::replace(request.body_mut(), Body::empty());
    let bytes = axum::body::to_bytes(body, CSRF_BODY_LIMIT).await.ok()?;
    let token = url::form_urlencoded::parse(&bytes)
        .find(|(key, _)| key == CSRF_FIELD)
        .map(|(_, value)| value.into_owned());
    *request.body_mut() = Body::from(bytes);
    token
}

/// Referer reduced to its path, so a denial never redirects off-site.
fn referer_path(referer: Option<&HeaderValue>) -> Option<String> {
    let value = referer?.to_str().ok()?;
    let url = Url::parse(value).ok()?;
    Some(url.path().to_string())
}

/// Extract a client IP for rate limiting from common proxy headers.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
