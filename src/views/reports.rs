use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use axum_extra::extract::CookieJar;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::auth::extractor::SessionUser;
use crate::models::report::{SEVERITIES, STATUSES};
use crate::models::{Report, ReportDraft, ReportFilter};
use crate::state::SharedState;
use crate::views::flash::{self, Flash};
use crate::views::{redirect_with_flash, SelectOption};

const DENIED: &str = "Access denied. Only supervisors and admins can edit reports.";

#[derive(Template)]
#[template(path = "reports.html")]
#[allow(dead_code)]
struct ReportsTemplate {
    username: String,
    is_admin: bool,
    flash: Option<Flash>,
    can_edit: bool,
    statuses: Vec<SelectOption>,
    severities: Vec<SelectOption>,
    date_from: String,
    date_to: String,
    reports: Vec<ReportRow>,
}

#[derive(Template)]
#[template(path = "edit_report.html")]
#[allow(dead_code)]
struct EditReportTemplate {
    username: String,
    is_admin: bool,
    report_id: String,
    form: ReportRow,
    statuses: Vec<SelectOption>,
    severities: Vec<SelectOption>,
    reporters: Vec<SelectOption>,
    assignees: Vec<SelectOption>,
}

#[derive(Template)]
#[template(path = "view_report.html")]
#[allow(dead_code)]
struct ViewReportTemplate {
    username: String,
    is_admin: bool,
    can_edit: bool,
    report: ReportRow,
}

#[derive(Template)]
#[template(path = "report_summary.html")]
#[allow(dead_code)]
struct SummaryTemplate {
    username: String,
    is_admin: bool,
    total: usize,
    open: usize,
    critical: usize,
    resolved: usize,
    reports: Vec<ReportRow>,
}

/// Display strings for one report.
#[derive(Default)]
#[allow(dead_code)]
struct ReportRow {
    id: i64,
    title: String,
    description: String,
    location: String,
    severity: String,
    status: String,
    incident_date: String,
    incident_date_input: String,
    reported_by: String,
    reporter_name: String,
    assigned_to: String,
    assignee_name: String,
    corrective_actions: String,
    equipment_involved: String,
    witnesses: String,
    created: String,
    modified: String,
}

#[derive(Deserialize, Default)]
pub struct ListParams {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub date_from: String,
    #[serde(default)]
    pub date_to: String,
}

#[derive(Deserialize, Default)]
pub struct ReportForm {
    #[serde(default)]
    pub report_id: String,
    #[serde(default)]
    pub incident_date: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub reported_by: String,
    #[serde(default)]
    pub assigned_to: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub corrective_actions: String,
    #[serde(default)]
    pub equipment_involved: String,
    #[serde(default)]
    pub witnesses: String,
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Accepts `datetime-local` input values and the document timestamp format.
fn parse_incident_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

fn parse_day(raw: &str, end_of_day: bool) -> Option<NaiveDateTime> {
    let day = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()?;
    if end_of_day {
        day.and_hms_opt(23, 59, 59)
    } else {
        day.and_hms_opt(0, 0, 0)
    }
}

async fn display_name(state: &SharedState, username: &str) -> String {
    match state.users.get(username).await {
        Some(user) if !user.full_name().is_empty() => user.full_name(),
        _ => username.to_string(),
    }
}

async fn to_row(state: &SharedState, report: Report) -> ReportRow {
    let reporter_name = display_name(state, &report.reported_by).await;
    let assignee_name = match &report.assigned_to {
        Some(username) => display_name(state, username).await,
        None => String::new(),
    };

    ReportRow {
        id: report.id,
        incident_date: report
            .incident_date
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default(),
        incident_date_input: report
            .incident_date
            .map(|d| d.format("%Y-%m-%dT%H:%M").to_string())
            .unwrap_or_default(),
        reporter_name,
        assignee_name,
        created: format!(
            "{} by {}",
            report.created_at.format("%Y-%m-%d %H:%M"),
            report.created_by
        ),
        modified: format!(
            "{} by {}",
            report.modified_at.format("%Y-%m-%d %H:%M"),
            report.modified_by
        ),
        title: report.title,
        description: report.description,
        location: report.location,
        severity: report.severity,
        status: report.status,
        reported_by: report.reported_by,
        assigned_to: report.assigned_to.unwrap_or_default(),
        corrective_actions: report.corrective_actions,
        equipment_involved: report.equipment_involved,
        witnesses: report.witnesses,
    }
}

fn options(values: &[&str], current: &str, any_label: Option<&str>) -> Vec<SelectOption> {
    any_label
        .map(|label| SelectOption::new("", label, current))
        .into_iter()
        .chain(values.iter().map(|v| SelectOption::new(*v, v.replace('_', " "), current)))
        .collect()
}

pub async fn list_page(
    auth: SessionUser,
    State(state): State<SharedState>,
    jar: CookieJar,
    Query(params): Query<ListParams>,
) -> Response {
    tracing::info!("User {} accessed reports page", auth.username);

    let filter = ReportFilter {
        status: non_empty(&params.status),
        severity: non_empty(&params.severity),
        date_from: parse_day(&params.date_from, false),
        date_to: parse_day(&params.date_to, true),
    };

    let mut reports = Vec::new();
    for report in state.reports.list(&filter) {
        reports.push(to_row(&state, report).await);
    }

    let (jar, flash) = flash::take(jar);
    let template = ReportsTemplate {
        is_admin: auth.privileges.is_admin(),
        can_edit: auth.privileges.can_edit_reports(),
        username: auth.username,
        flash,
        statuses: options(STATUSES, &params.status, Some("Any status")),
        severities: options(SEVERITIES, &params.severity, Some("Any severity")),
        date_from: params.date_from,
        date_to: params.date_to,
        reports,
    };
    (jar, Html(template.render().unwrap_or_default())).into_response()
}

/// Edit form for report `id`; `0` opens an empty form for a new report.
pub async fn edit_page(
    auth: SessionUser,
    State(state): State<SharedState>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Response {
    if auth.require_report_editor().is_err() {
        return redirect_with_flash(jar, "error", DENIED, "/reports");
    }

    tracing::info!("User {} accessing edit report {id}", auth.username);

    let form = if id > 0 {
        match state.reports.get(id) {
            Some(report) => to_row(&state, report).await,
            None => return redirect_with_flash(jar, "error", "Report not found.", "/reports"),
        }
    } else {
        ReportRow {
            severity: "low".to_string(),
            status: "open".to_string(),
            reported_by: auth.username.clone(),
            ..ReportRow::default()
        }
    };

    let usernames = state.users.usernames().await;
    let reporters = usernames
        .iter()
        .map(|u| SelectOption::new(u.clone(), u.clone(), &form.reported_by))
        .collect();
    let assignees = std::iter::once(SelectOption::new("", "Unassigned", &form.assigned_to))
        .chain(
            usernames
                .iter()
                .map(|u| SelectOption::new(u.clone(), u.clone(), &form.assigned_to)),
        )
        .collect();

    let template = EditReportTemplate {
        is_admin: auth.privileges.is_admin(),
        username: auth.username,
        report_id: if id > 0 { id.to_string() } else { String::new() },
        statuses: options(STATUSES, &form.status, None),
        severities: options(SEVERITIES, &form.severity, None),
        reporters,
        assignees,
        form,
    };
    Html(template.render().unwrap_or_default()).into_response()
}

pub async fn save(
    auth: SessionUser,
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<ReportForm>,
) -> Response {
    if auth.require_report_editor().is_err() {
        return redirect_with_flash(jar, "error", DENIED, "/reports");
    }

    tracing::info!("User {} saving report changes", auth.username);

    // Only a blank field clears the incident date.
    let incident_date = match non_empty(&form.incident_date) {
        Some(raw) => match parse_incident_date(&raw) {
            Some(date) => Some(date),
            None => {
                tracing::warn!("Rejected incident date {raw:?} from {}", auth.username);
                return redirect_with_flash(jar, "error", "Invalid incident date.", "/reports");
            }
        },
        None => None,
    };

    let draft = ReportDraft {
        title: form.title.trim().to_string(),
        description: form.description,
        location: form.location.trim().to_string(),
        severity: form.severity.trim().to_string(),
        status: form.status.trim().to_string(),
        incident_date,
        reported_by: non_empty(&form.reported_by).unwrap_or_else(|| auth.username.clone()),
        assigned_to: non_empty(&form.assigned_to),
        corrective_actions: form.corrective_actions,
        equipment_involved: form.equipment_involved,
        witnesses: form.witnesses,
    };

    let outcome = match non_empty(&form.report_id) {
        Some(raw_id) => match raw_id.parse::<i64>() {
            Ok(id) => state
                .reports
                .update(id, draft, &auth.username)
                .and_then(|r| r.ok_or_else(|| "Report not found.".to_string()))
                .map(|_| "Report updated successfully!"),
            Err(_) => Err("Report not found.".to_string()),
        },
        None => state
            .reports
            .create(draft, &auth.username)
            .map(|_| "Report created successfully!"),
    };

    match outcome {
        Ok(message) => redirect_with_flash(jar, "success", message, "/reports"),
        Err(e) => {
            tracing::warn!("Error saving report for {}: {e}", auth.username);
            redirect_with_flash(jar, "error", &e, "/reports")
        }
    }
}

pub async fn view_page(
    auth: SessionUser,
    State(state): State<SharedState>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Response {
    let Some(report) = state.reports.get(id) else {
        return redirect_with_flash(jar, "error", "Report not found.", "/reports");
    };

    tracing::info!("User {} viewing report {id}", auth.username);

    let template = ViewReportTemplate {
        is_admin: auth.privileges.is_admin(),
        can_edit: auth.privileges.can_edit_reports(),
        username: auth.username,
        report: to_row(&state, report).await,
    };
    Html(template.render().unwrap_or_default()).into_response()
}

pub async fn summary_page(
    auth: SessionUser,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    tracing::info!("User {} accessed report summary", auth.username);

    let summary = state.reports.summary();
    let mut reports = Vec::new();
    for report in state.reports.list(&ReportFilter::default()) {
        reports.push(to_row(&state, report).await);
    }

    let template = SummaryTemplate {
        is_admin: auth.privileges.is_admin(),
        username: auth.username,
        total: summary.total,
        open: summary.open,
        critical: summary.critical,
        resolved: summary.resolved,
        reports,
    };
    Html(template.render().unwrap_or_default())
}
