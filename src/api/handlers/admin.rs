//! Administrator pages: catalog, borrowing desk, visitor log.

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
pub struct BookForm {
    pub title: String,
    #[serde(default)]
    pub author: String,
}

#[derive(Deserialize, Debug)]
pub struct ReturnForm {
    pub borrowing_code: String,
}

pub async fn books(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Html<String> {
    let flash = state.sessions().take_flash(&session.token).await;
    let body = format!(
        "<h2>Books</h2>\n<p>Catalog management.</p>\n\
         <form method=\"post\" action=\"/admin/books/create\">\n{}\n\
         <label>Title <input type=\"text\" name=\"title\" required></label>\n\
         <label>Author <input type=\"text\" name=\"author\"></label>\n\
         <button type=\"submit\">Add book</button>\n</form>",
        csrf_field(&session),
    );
    page("Books", &session, flash.as_ref(), &body)
}

pub async fn books_create(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Form(form): Form<BookForm>,
) -> Response {
    let title = form.title.trim();
    if title.is_empty() {
        state
            .sessions()
            .set_flash(&session.token, Flash::error("A book needs a title."))
            .await;
    } else {
        state
            .sessions()
            .set_flash(
                &session.token,
                // Rendered through the page shell, which escapes it.
                Flash::success(format!("Book \"{title}\" added to the catalog.")),
            )
            .await;
    }
    Redirect::to("/admin/books").into_response()
}

pub async fn borrowings(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Html<String> {
    let flash = state.sessions().take_flash(&session.token).await;
    let body = format!(
        "<h2>Borrowings</h2>\n<p>Open borrowings and the return desk.</p>\n\
         <form method=\"post\" action=\"/admin/borrowings/return\">\n{}\n\
         <label>Borrowing code <input type=\"text\" name=\"borrowing_code\" required></label>\n\
         <button type=\"submit\">Record return</button>\n</form>",
        csrf_field(&session),
    );
    page("Borrowings", &session, flash.as_ref(), &body)
}

pub async fn borrowings_return(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Form(form): Form<ReturnForm>,
) -> Response {
    let code = form.borrowing_code.trim();
    if code.is_empty() {
        state
            .sessions()
            .set_flash(&session.token, Flash::error("A borrowing code is required."))
            .await;
    } else {
        state
            .sessions()
            .set_flash(
                &session.token,
                Flash::success(format!("Return recorded for {code}.")),
            )
            .await;
    }
    Redirect::to("/admin/borrowings").into_response()
}

pub async fn visitors(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Html<String> {
    let flash = state.sessions().take_flash(&session.token).await;
    page(
        "Visitors",
        &session,
        flash.as_ref(),
        "<h2>Visitors</h2>\n<p>Library visit log.</p>",
    )
}
