//! Login, logout, and the session cookie they manage.

use axum::{
    Extension, Form,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{error, info, warn};

use super::{csrf_field, page};
use crate::auth::catalog::Role;
use crate::auth::credentials::AuthFailure;
use crate::auth::flash::Flash;
use crate::auth::routes;
use crate::auth::session::{self, CurrentSession, SessionUser};
use crate::auth::state::AppState;

#[derive(Deserialize, Debug)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// GET /login
pub async fn form(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Response {
    // Already signed in: straight to the role's landing page.
    if let Some(user) = session.user.as_ref() {
        return Redirect::to(routes::home_for(user.role)).into_response();
    }

    let flash = state.sessions().take_flash(&session.token).await;
    let body = format!(
        "<h2>Sign in</h2>\n\
         <form method=\"post\" action=\"/login\">\n{}\n\
         <label>Username <input type=\"text\" name=\"username\" required></label>\n\
         <label>Password <input type=\"password\" name=\"password\" required></label>\n\
         <label>Role <select name=\"role\">\n\
         <option value=\"\">Any</option>\n\
         <option value=\"admin\">Administrator</option>\n\
         <option value=\"teacher\">Teacher</option>\n\
         <option value=\"student\">Student</option>\n\
         </select></label>\n\
         <button type=\"submit\">Sign in</button>\n</form>",
        csrf_field(&session),
    );
    page("Sign in", &session, flash.as_ref(), &body).into_response()
}

/// POST /login
pub async fn submit(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Form(form): Form<LoginForm>,
) -> Response {
    let login_route = state.config().login_route().to_string();

    let role = match form.role.as_deref().filter(|role| !role.is_empty()) {
        Some(value) => match value.parse::<Role>() {
            Ok(role) => Some(role),
            Err(_) => {
                state
                    .sessions()
                    .set_flash(&session.token, Flash::error("Invalid username or password."))
                    .await;
                return Redirect::to(&login_route).into_response();
            }
        },
        None => None,
    };

    match state
        .credentials()
        .verify(&form.username, &form.password, role)
        .await
    {
        Ok(user) => {
            // Pick up the saved destination before the old session is gone.
            let return_to = state.sessions().take_return_to(&session.token).await;
            let rotated = state
                .sessions()
                .login(
                    Some(&session.token),
                    SessionUser {
                        id: user.id,
                        username: user.username.clone(),
                        role: user.role,
                    },
                )
                .await;
            let token = match rotated {
                Ok(token) => token,
                Err(err) => {
                    error!("failed to create session: {err:#}");
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            };

            info!(user = %user.username, role = %user.role, "login succeeded");
            state
                .sessions()
                .set_flash(
                    &token,
                    Flash::success(format!("Welcome back, {}.", user.full_name)),
                )
                .await;

            let destination =
                return_to.unwrap_or_else(|| routes::home_for(user.role).to_string());
            with_session_cookie(&state, &token, &destination)
        }
        Err(AuthFailure::Unavailable) => {
            state
                .sessions()
                .set_flash(
                    &session.token,
                    Flash::error("Sign-in is temporarily unavailable. Please try again shortly."),
                )
                .await;
            Redirect::to(&login_route).into_response()
        }
        Err(failure) => {
            // One generic message for unknown accounts and bad passwords.
            warn!(username = %form.username, %failure, "login rejected");
            state
                .sessions()
                .set_flash(&session.token, Flash::error("Invalid username or password."))
                .await;
            Redirect::to(&login_route).into_response()
        }
    }
}

/// POST /logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Response {
    state.sessions().destroy(&session.token).await;

    // A fresh anonymous session carries the one-shot goodbye message.
    match state.sessions().create_anonymous().await {
        Ok(token) => {
            state
                .sessions()
                .set_flash(&token, Flash::info("You have been signed out."))
                .await;
            with_session_cookie(&state, &token, state.config().login_route())
        }
        Err(err) => {
            error!("failed to create post-logout session: {err:#}");
            Redirect::to(state.config().login_route()).into_response()
        }
    }
}

fn with_session_cookie(state: &AppState, token: &str, destination: &str) -> Response {
    match session::session_cookie(state.config(), token) {
        Ok(cookie) => {
            let mut headers = HeaderMap::new();
            headers.insert(SET_COOKIE, cookie);
            (headers, Redirect::to(destination)).into_response()
        }
        Err(err) => {
            error!("failed to build session cookie: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
