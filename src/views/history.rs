use askama::Template;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse};
use serde::Deserialize;

use crate::auth::extractor::SessionUser;
use crate::error::AppError;
use crate::models::{HistorySort, TestFilter};
use crate::state::SharedState;
use crate::views::SelectOption;

#[derive(Template)]
#[template(path = "history.html")]
#[allow(dead_code)]
struct HistoryTemplate {
    username: String,
    is_admin: bool,
    search: String,
    machines: Vec<SelectOption>,
    users: Vec<SelectOption>,
    sorts: Vec<SelectOption>,
    rows: Vec<HistoryRow>,
}

#[allow(dead_code)]
struct HistoryRow {
    id: i64,
    machine_name: String,
    device_name: String,
    username: String,
    test_result: String,
    test_date: String,
    days_since_test: i64,
    notes: String,
}

#[derive(Deserialize)]
pub struct HistoryParams {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub machine: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub sort: String,
}

pub async fn index(
    auth: SessionUser,
    State(state): State<SharedState>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let sort = HistorySort::parse(&params.sort);
    let filter = TestFilter {
        search: params.search.clone(),
        machine: params.machine.clone(),
        user: params.user.clone(),
    };

    let tests = state.registry.query_tests(&filter, sort).await?;
    let machines = state.registry.list_machines().await?;
    let users = state.users.usernames().await;

    tracing::info!(
        "User {} viewed history page with {} results",
        auth.username,
        tests.len()
    );

    let mut machine_options = vec![SelectOption::new("", "All machines", &params.machine)];
    machine_options.extend(
        machines
            .into_iter()
            .map(|m| SelectOption::new(m.name.clone(), m.name, &params.machine)),
    );

    let mut user_options = vec![SelectOption::new("", "All users", &params.user)];
    user_options.extend(
        users
            .into_iter()
            .map(|u| SelectOption::new(u.clone(), u, &params.user)),
    );

    let sorts = [
        (HistorySort::Newest, "Newest first"),
        (HistorySort::Age, "Oldest test first"),
        (HistorySort::Machine, "Machine"),
        (HistorySort::Device, "Device"),
    ]
    .into_iter()
    .map(|(s, label)| SelectOption::new(s.as_str(), label, sort.as_str()))
    .collect();

    let template = HistoryTemplate {
        username: auth.username,
        is_admin: auth.privileges.is_admin(),
        search: params.search,
        machines: machine_options,
        users: user_options,
        sorts,
        rows: tests
            .into_iter()
            .map(|t| HistoryRow {
                id: t.id,
                machine_name: t.machine_name,
                device_name: t.device_name,
                username: t.username,
                test_result: t.test_result,
                test_date: t.test_date.format("%Y-%m-%d %H:%M").to_string(),
                days_since_test: t.days_since_test,
                notes: t.notes.unwrap_or_default(),
            })
            .collect(),
    };
    Ok(Html(template.render().unwrap_or_default()))
}
