use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct SafetyDevice {
    pub id: i64,
    pub machine_id: i64,
    pub name: String,
    pub device_type: Option<String>,
    pub created_at: DateTime<Utc>,
}
