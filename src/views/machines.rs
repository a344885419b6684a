use askama::Template;
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum_extra::extract::CookieJar;

use crate::auth::extractor::SessionUser;
use crate::error::AppError;
use crate::state::SharedState;
use crate::views::flash::{self, Flash};

#[derive(Template)]
#[template(path = "index.html")]
#[allow(dead_code)]
struct IndexTemplate {
    username: String,
    is_admin: bool,
    flash: Option<Flash>,
    machines: Vec<MachineRow>,
    tests_recorded: i64,
}

#[allow(dead_code)]
struct MachineRow {
    id: i64,
    name: String,
    location: String,
}

pub async fn index(
    auth: SessionUser,
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let machines = state.registry.list_machines().await?;
    let tests_recorded = state.registry.count_tests().await?;
    tracing::info!("User {} accessed main page", auth.username);

    let (jar, flash) = flash::take(jar);
    let template = IndexTemplate {
        username: auth.username,
        is_admin: auth.privileges.is_admin(),
        flash,
        machines: machines
            .into_iter()
            .map(|m| MachineRow {
                id: m.id,
                name: m.name,
                location: m.location.unwrap_or_default(),
            })
            .collect(),
        tests_recorded,
    };
    Ok((jar, Html(template.render().unwrap_or_default())))
}
