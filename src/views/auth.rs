use askama::Template;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::auth::session::{self, Claims, COOKIE_NAME};
use crate::middleware::audit;
use crate::state::SharedState;
use crate::views::flash::{self, Flash};

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    error: Option<String>,
    flash: Option<Flash>,
    username: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn render_login(jar: CookieJar, error: Option<String>, username: String) -> Response {
    let (jar, flash) = flash::take(jar);
    let template = LoginTemplate {
        error,
        flash,
        username,
    };
    (jar, Html(template.render().unwrap_or_default())).into_response()
}

pub async fn login_page(State(state): State<SharedState>, jar: CookieJar) -> Response {
    // Already logged in: go straight to the machines page.
    if let Some(cookie) = jar.get(COOKIE_NAME) {
        if let Ok(claims) = session::decode_token(cookie.value(), &state.config.session_secret) {
            if state.users.contains(&claims.sub).await {
                return Redirect::to("/").into_response();
            }
        }
    }

    render_login(jar, None, String::new())
}

pub async fn login_submit(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let username = form.username.trim().to_string();

    if let Err(retry_after) = state.login_limiter.check(&username) {
        tracing::warn!("Login for {username} refused: locked out for {retry_after}s");
        return render_login(
            jar,
            Some("Too many login attempts. Please try again later.".to_string()),
            username,
        );
    }

    if !state.users.authenticate(&username, &form.password).await {
        state.login_limiter.record_failure(&username);
        tracing::warn!("Failed login attempt for {username}");
        return render_login(
            jar,
            Some("Invalid username or password".to_string()),
            username,
        );
    }
    state.login_limiter.reset(&username);

    let claims = Claims::new(&username, state.config.session_ttl);
    let token = match session::encode_token(&claims, &state.config.session_secret) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Could not issue session for {username}: {e}");
            return render_login(
                jar,
                Some("Login is temporarily unavailable.".to_string()),
                username,
            );
        }
    };

    audit::log_login(state.registry.pool(), claims.sid, &username).await;
    tracing::info!("User {username} logged in successfully");

    let cookie = session::session_cookie(
        token,
        state.config.session_ttl,
        state.config.secure_cookies,
    );
    (jar.add(cookie), Redirect::to("/")).into_response()
}

pub async fn logout(State(state): State<SharedState>, jar: CookieJar) -> Response {
    let claims = jar
        .get(COOKIE_NAME)
        .and_then(|c| session::decode_token(c.value(), &state.config.session_secret).ok());

    match claims {
        Some(claims) => {
            audit::log_logout(state.registry.pool(), claims.sid, &claims.sub).await;
            tracing::info!("User {} logged out", claims.sub);
        }
        None => tracing::info!("User Unknown logged out"),
    }

    let jar = jar.add(session::clear_session_cookie());
    let jar = flash::set(jar, "info", "You have been logged out");
    (jar, Redirect::to("/login")).into_response()
}
