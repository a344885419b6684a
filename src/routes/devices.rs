use axum::extract::{Path, State};
use axum::Json;

use crate::auth::extractor::SessionUser;
use crate::error::AppError;
use crate::models::SafetyDevice;
use crate::state::SharedState;

pub async fn list_by_machine(
    auth: SessionUser,
    State(state): State<SharedState>,
    Path(machine_id): Path<i64>,
) -> Result<Json<Vec<SafetyDevice>>, AppError> {
    let devices = state.registry.list_devices(machine_id).await?;
    tracing::info!(
        "Retrieved {} devices for machine {machine_id} for {}",
        devices.len(),
        auth.username
    );
    Ok(Json(devices))
}
