use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::extractor::SessionUser;
use crate::error::AppError;
use crate::registry::NewTest;
use crate::state::SharedState;

/// Fields are optional so a missing one is reported as a 400 with a message
/// rather than a deserialization rejection.
#[derive(Deserialize)]
pub struct RecordTestRequest {
    pub machine_id: Option<i64>,
    pub device_id: Option<i64>,
    pub test_result: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct RecordTestResponse {
    pub success: bool,
    pub message: String,
    pub record_id: i64,
}

pub async fn record(
    auth: SessionUser,
    State(state): State<SharedState>,
    payload: Result<Json<RecordTestRequest>, JsonRejection>,
) -> Result<Json<RecordTestResponse>, AppError> {
    let Json(req) = payload?;
    let (Some(machine_id), Some(device_id), Some(test_result)) =
        (req.machine_id, req.device_id, req.test_result.as_deref())
    else {
        return Err(AppError::BadRequest(
            "machine_id, device_id and test_result are required".to_string(),
        ));
    };

    let record = state
        .registry
        .record_test(NewTest {
            machine_id,
            device_id,
            username: &auth.username,
            test_result,
            notes: req.notes.as_deref().unwrap_or_default(),
        })
        .await
        .inspect_err(|e| tracing::warn!("Error recording test for {}: {e}", auth.username))?;

    Ok(Json(RecordTestResponse {
        success: true,
        message: "Test recorded successfully".to_string(),
        record_id: record.id,
    }))
}
