use askama::Template;
use axum::response::{Html, IntoResponse};

use crate::auth::extractor::SessionUser;
use crate::routes::{RouteInfo, ROUTE_CATALOG};

#[derive(Template)]
#[template(path = "debug.html")]
#[allow(dead_code)]
struct DebugTemplate {
    username: String,
    is_admin: bool,
    routes: Vec<&'static RouteInfo>,
}

pub async fn index(auth: SessionUser) -> impl IntoResponse {
    tracing::info!("User {} accessed debug endpoint", auth.username);

    let template = DebugTemplate {
        username: auth.username,
        is_admin: auth.privileges.is_admin(),
        routes: ROUTE_CATALOG.iter().collect(),
    };
    Html(template.render().unwrap_or_default())
}
