use axum::{extract::State, response::Html, Extension};

use super::page;
use crate::auth::session::CurrentSession;
use crate::auth::state::AppState;

pub async fn home(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Html<String> {
    let flash = state.sessions().take_flash(&session.token).await;
    let body = match session.user.as_ref() {
        Some(user) => format!(
            "<h2>Welcome</h2><p>You are signed in as <strong>{}</strong>.</p>",
            super::escape_html(&user.username)
        ),
        None => "<h2>Welcome</h2><p>The school library, catalog, and \
                 borrowing desk. Sign in to continue.</p>"
            .to_string(),
    };
    page("Home", &session, flash.as_ref(), &body)
}
