//! Teacher pages: grade entry for taught classes.

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
pub struct GradeForm {
    pub student_username: String,
    pub subject: String,
    pub grade: String,
}

pub async fn grades(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Html<String> {
    let flash = state.sessions().take_flash(&session.token).await;
    let body = format!(
        "<h2>Class grades</h2>\n<p>Grade entry for your classes.</p>\n\
         <form method=\"post\" action=\"/teacher/grades/save\">\n{}\n\
         <label>Student <input type=\"text\" name=\"student_username\" required></label>\n\
         <label>Subject <input type=\"text\" name=\"subject\" required></label>\n\
         <label>Grade <input type=\"text\" name=\"grade\" required></label>\n\
         <button type=\"submit\">Save grade</button>\n</form>",
        csrf_field(&session),
    );
    page("Class grades", &session, flash.as_ref(), &body)
}

pub async fn grades_save(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Form(form): Form<GradeForm>,
) -> Response {
    let student = form.student_username.trim();
    let subject = form.subject.trim();
    if student.is_empty() || subject.is_empty() || form.grade.trim().is_empty() {
        state
            .sessions()
            .set_flash(&session.token, Flash::error("Student, subject, and grade are required."))
            .await;
    } else {
        state
            .sessions()
            .set_flash(
                &session.token,
                Flash::success(format!("Grade saved for {student} in {subject}.")),
            )
            .await;
    }
    Redirect::to("/teacher/grades").into_response()
}
