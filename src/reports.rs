use std::sync::RwLock;

use chrono::Utc;

use crate::models::report::{SEVERITIES, STATUSES};
use crate::models::{Report, ReportDraft, ReportFilter, ReportSummary};

/// In-memory incident reports. Contents are lost on restart.
pub struct ReportStore {
    book: RwLock<ReportBook>,
}

struct ReportBook {
    reports: Vec<Report>,
    next_id: i64,
}

impl Default for ReportStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportStore {
    pub fn new() -> Self {
        Self {
            book: RwLock::new(ReportBook {
                reports: Vec::new(),
                next_id: 1,
            }),
        }
    }

    /// Reports matching `filter`, most recently created first.
    pub fn list(&self, filter: &ReportFilter) -> Vec<Report> {
        let book = self.book.read().unwrap_or_else(|e| e.into_inner());
        book.reports
            .iter()
            .rev()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: i64) -> Option<Report> {
        let book = self.book.read().unwrap_or_else(|e| e.into_inner());
        book.reports.iter().find(|r| r.id == id).cloned()
    }

    pub fn create(&self, draft: ReportDraft, by: &str) -> Result<Report, String> {
        validate(&draft)?;
        let now = Utc::now();

        let mut book = self.book.write().unwrap_or_else(|e| e.into_inner());
        let report = Report {
            id: book.next_id,
            title: draft.title,
            description: draft.description,
            location: draft.location,
            severity: draft.severity,
            status: draft.status,
            incident_date: draft.incident_date,
            reported_by: draft.reported_by,
            assigned_to: draft.assigned_to,
            corrective_actions: draft.corrective_actions,
            equipment_involved: draft.equipment_involved,
            witnesses: draft.witnesses,
            created_at: now,
            created_by: by.to_string(),
            modified_at: now,
            modified_by: by.to_string(),
        };
        book.next_id += 1;
        book.reports.push(report.clone());

        tracing::info!("Created report {} by user {by}", report.id);
        Ok(report)
    }

    /// Replace the editable fields of report `id`. Creation metadata is kept.
    /// Returns `Ok(None)` when no such report exists.
    pub fn update(&self, id: i64, draft: ReportDraft, by: &str) -> Result<Option<Report>, String> {
        validate(&draft)?;

        let mut book = self.book.write().unwrap_or_else(|e| e.into_inner());
        let Some(report) = book.reports.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };

        report.title = draft.title;
        report.description = draft.description;
        report.location = draft.location;
        report.severity = draft.severity;
        report.status = draft.status;
        report.incident_date = draft.incident_date;
        report.reported_by = draft.reported_by;
        report.assigned_to = draft.assigned_to;
        report.corrective_actions = draft.corrective_actions;
        report.equipment_involved = draft.equipment_involved;
        report.witnesses = draft.witnesses;
        report.modified_at = Utc::now();
        report.modified_by = by.to_string();

        tracing::info!("Updated report {id} by user {by}");
        Ok(Some(report.clone()))
    }

    pub fn summary(&self) -> ReportSummary {
        let book = self.book.read().unwrap_or_else(|e| e.into_inner());
        book.reports
            .iter()
            .fold(ReportSummary::default(), |mut s, r| {
                s.total += 1;
                match r.status.as_str() {
                    "open" => s.open += 1,
                    "resolved" => s.resolved += 1,
                    _ => {}
                }
                if r.severity == "critical" {
                    s.critical += 1;
                }
                s
            })
    }
}

fn validate(draft: &ReportDraft) -> Result<(), String> {
    if draft.title.trim().is_empty() {
        return Err("Title is required.".to_string());
    }
    if !SEVERITIES.contains(&draft.severity.as_str()) {
        return Err(format!("Unknown severity '{}'.", draft.severity));
    }
    if !STATUSES.contains(&draft.status.as_str()) {
        return Err(format!("Unknown status '{}'.", draft.status));
    }
    Ok(())
}
