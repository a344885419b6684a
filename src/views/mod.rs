pub mod admin;
pub mod auth;
pub mod debug;
pub mod flash;
pub mod history;
pub mod machines;
pub mod reports;

use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::CookieJar;

use crate::state::SharedState;

/// Pages that need a session. Unauthenticated requests are redirected to the
/// login form by the layer `build_app` puts around this router.
pub fn view_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(machines::index))
        .route("/history", get(history::index))
        .route("/debug", get(debug::index))
        // User administration
        .route("/user_admin", get(admin::users_page))
        .route("/add_user", post(admin::add_user))
        // Reports
        .route("/reports", get(reports::list_page))
        .route("/edit_report/{id}", get(reports::edit_page))
        .route("/save_report", post(reports::save))
        .route("/view_report/{id}", get(reports::view_page))
        .route("/report_summary", get(reports::summary_page))
}

/// Login and logout work without a session.
pub fn public_routes() -> Router<SharedState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login_submit))
        .route("/logout", get(auth::logout))
}

/// Option in a `<select>`.
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>, current: &str) -> Self {
        let value = value.into();
        let selected = value == current;
        Self {
            value,
            label: label.into(),
            selected,
        }
    }
}

/// Flash `message` and send the browser to `to`.
pub fn redirect_with_flash(jar: CookieJar, kind: &str, message: &str, to: &str) -> Response {
    (flash::set(jar, kind, message), Redirect::to(to)).into_response()
}

#[derive(Template)]
#[template(path = "404.html")]
struct NotFoundTemplate;

pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(NotFoundTemplate.render().unwrap_or_default()),
    )
        .into_response()
}
