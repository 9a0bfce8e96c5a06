//! Student self-service pages.

use axum::{
    Extension, Form,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use super::{csrf_field, page};
use crate::auth::flash::Flash;
use crate::auth::session::CurrentSession;
use crate::auth::state::AppState;

#[derive(Deserialize, Debug)]
pub struct ProfileForm {
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

pub async fn grades(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Html<String> {
    let flash = state.sessions().take_flash(&session.token).await;
    page(
        "My grades",
        &session,
        flash.as_ref(),
        "<h2>My grades</h2>\n<p>Your grade transcript.</p>",
    )
}

pub async fn borrowings(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Html<String> {
    let flash = state.sessions().take_flash(&session.token).await;
    page(
        "My borrowings",
        &session,
        flash.as_ref(),
        "<h2>My borrowings</h2>\n<p>Your current and past borrowings.</p>",
    )
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Html<String> {
    let flash = state.sessions().take_flash(&session.token).await;
    let body = format!(
        "<h2>My profile</h2>\n\
         <form method=\"post\" action=\"/student/profile/update\">\n{}\n\
         <label>Email <input type=\"email\" name=\"email\" required></label>\n\
         <label>Phone <input type=\"text\" name=\"phone\"></label>\n\
         <button type=\"submit\">Save</button>\n</form>",
        csrf_field(&session),
    );
    page("My profile", &session, flash.as_ref(), &body)
}

pub async fn profile_update(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Form(form): Form<ProfileForm>,
) -> Response {
    if form.email.trim().is_empty() {
        state
            .sessions()
            .set_flash(&session.token, Flash::error("An email address is required."))
            .await;
    } else {
        state
            .sessions()
            .set_flash(&session.token, Flash::success("Profile updated."))
            .await;
    }
    Redirect::to("/student/profile").into_response()
}
