use askama::Template;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use axum_extra::extract::CookieJar;

use crate::auth::extractor::SessionUser;
use crate::credentials::Persistence;
use crate::models::NewUser;
use crate::state::SharedState;
use crate::views::flash::{self, Flash};
use crate::views::redirect_with_flash;

#[derive(Template)]
#[template(path = "user_admin.html")]
#[allow(dead_code)]
struct UsersTemplate {
    username: String,
    is_admin: bool,
    flash: Option<Flash>,
    users: Vec<UserRow>,
}

#[allow(dead_code)]
struct UserRow {
    username: String,
    full_name: String,
    email: String,
    role: String,
    privileges: String,
    created_at: String,
    last_login: String,
    is_self: bool,
}

pub async fn users_page(
    auth: SessionUser,
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Response {
    if auth.require_admin().is_err() {
        return redirect_with_flash(jar, "error", "Access denied. Admin privileges required.", "/");
    }

    tracing::info!("Admin {} accessed user administration", auth.username);

    let mut users = Vec::new();
    for u in state.users.list_users().await {
        let last_login = match state.registry.last_login(&u.username).await {
            Ok(Some(audit)) => audit.login_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            Ok(None) => "never".to_string(),
            Err(e) => {
                tracing::error!("Error reading login audit for {}: {e}", u.username);
                "unknown".to_string()
            }
        };
        users.push(UserRow {
            is_self: u.username == auth.username,
            full_name: u.full_name(),
            privileges: u.privileges.iter().collect::<Vec<_>>().join(", "),
            created_at: u.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            last_login,
            username: u.username,
            email: u.email,
            role: u.role,
        });
    }

    let (jar, flash) = flash::take(jar);
    let template = UsersTemplate {
        username: auth.username,
        is_admin: true,
        flash,
        users,
    };
    (jar, Html(template.render().unwrap_or_default())).into_response()
}

pub async fn add_user(
    auth: SessionUser,
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<NewUser>,
) -> Response {
    if auth.require_admin().is_err() {
        return redirect_with_flash(
            jar,
            "error",
            "Access denied. Admin privileges required.",
            "/user_admin",
        );
    }

    tracing::info!(
        "Admin {} adding new user: {}",
        auth.username,
        form.username.trim()
    );

    let (kind, message) = match state.users.add_user(form).await {
        Ok((user, Persistence::Saved)) => {
            tracing::info!(
                "Successfully added user: {} ({})",
                user.full_name(),
                user.username
            );
            ("success", format!("User {} added successfully!", user.full_name()))
        }
        Ok((user, Persistence::Unsaved(_))) => {
            tracing::warn!("User {} added in memory only", user.username);
            ("warning", "User added but could not save to file.".to_string())
        }
        Err(e) => {
            tracing::warn!("Admin {} could not add user: {e}", auth.username);
            ("error", e.to_string())
        }
    };

    redirect_with_flash(jar, kind, &message, "/user_admin")
}
