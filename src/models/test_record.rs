use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One inspection outcome for one safety device. Never updated after insert.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct TestRecord {
    pub id: i64,
    pub machine_id: i64,
    pub device_id: i64,
    pub username: String,
    pub test_result: String,
    pub test_date: DateTime<Utc>,
    pub notes: Option<String>,
}

/// A test record joined with its machine and device names.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct TestRecordView {
    pub id: i64,
    pub machine_id: i64,
    pub machine_name: String,
    pub device_id: i64,
    pub device_name: String,
    pub device_type: Option<String>,
    pub username: String,
    pub test_result: String,
    pub test_date: DateTime<Utc>,
    pub notes: Option<String>,
    #[sqlx(skip)]
    pub days_since_test: i64,
}

impl TestRecordView {
    /// Fill `days_since_test` relative to `now`.
    pub fn with_age(mut self, now: DateTime<Utc>) -> Self {
        self.days_since_test = days_between(self.test_date, now);
        self
    }
}

/// Calendar-day boundaries crossed between two instants (UTC dates), so a test
/// taken yesterday at 23:59 is one day old a minute after midnight.
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to.date_naive() - from.date_naive()).num_days()
}

/// History filters. Empty strings mean "no filter".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestFilter {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub machine: String,
    #[serde(default)]
    pub user: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistorySort {
    #[default]
    Newest,
    Age,
    Machine,
    Device,
}

impl HistorySort {
    pub fn parse(key: &str) -> Self {
        match key {
            "age" => HistorySort::Age,
            "machine" => HistorySort::Machine,
            "device" => HistorySort::Device,
            _ => HistorySort::Newest,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HistorySort::Newest => "date",
            HistorySort::Age => "age",
            HistorySort::Machine => "machine",
            HistorySort::Device => "device",
        }
    }

    /// Re-sort rows already in newest-first order. Sorts are stable, so ties
    /// keep the newest-first order.
    pub fn apply(&self, rows: &mut [TestRecordView]) {
        match self {
            HistorySort::Newest => {}
            HistorySort::Age => rows.sort_by_key(|r| Reverse(r.days_since_test)),
            HistorySort::Machine => rows.sort_by(|a, b| a.machine_name.cmp(&b.machine_name)),
            HistorySort::Device => rows.sort_by(|a, b| a.device_name.cmp(&b.device_name)),
        }
    }
}
