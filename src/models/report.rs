use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SEVERITIES: &[&str] = &["low", "medium", "high", "critical"];
pub const STATUSES: &[&str] = &["open", "in_progress", "resolved", "closed"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub location: String,
    pub severity: String,
    pub status: String,
    pub incident_date: Option<NaiveDateTime>,
    pub reported_by: String,
    pub assigned_to: Option<String>,
    pub corrective_actions: String,
    pub equipment_involved: String,
    pub witnesses: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub modified_at: DateTime<Utc>,
    pub modified_by: String,
}

/// Editable report fields, as submitted from the edit form.
#[derive(Debug, Clone, Default)]
pub struct ReportDraft {
    pub title: String,
    pub description: String,
    pub location: String,
    pub severity: String,
    pub status: String,
    pub incident_date: Option<NaiveDateTime>,
    pub reported_by: String,
    pub assigned_to: Option<String>,
    pub corrective_actions: String,
    pub equipment_involved: String,
    pub witnesses: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportFilter {
    pub status: Option<String>,
    pub severity: Option<String>,
    pub date_from: Option<NaiveDateTime>,
    pub date_to: Option<NaiveDateTime>,
}

impl ReportFilter {
    pub fn matches(&self, report: &Report) -> bool {
        if let Some(status) = &self.status {
            if &report.status != status {
                return false;
            }
        }
        if let Some(severity) = &self.severity {
            if &report.severity != severity {
                return false;
            }
        }
        if self.date_from.is_some() || self.date_to.is_some() {
            let Some(date) = report.incident_date else {
                return false;
            };
            if self.date_from.is_some_and(|from| date < from) {
                return false;
            }
            if self.date_to.is_some_and(|to| date > to) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub open: usize,
    pub critical: usize,
    pub resolved: usize,
}
