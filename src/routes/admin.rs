use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::auth::extractor::SessionUser;
use crate::credentials::Persistence;
use crate::error::AppError;
use crate::state::SharedState;

#[derive(Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

pub async fn delete_user(
    auth: SessionUser,
    State(state): State<SharedState>,
    Path(username): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    auth.require_admin()?;

    let (removed, persistence) = state
        .users
        .delete_user(&auth.username, &username)
        .await
        .inspect_err(|e| tracing::warn!("Admin {} could not delete {username}: {e}", auth.username))?;

    if removed.is_none() {
        tracing::info!("Admin {} dropped unusable record {username}", auth.username);
    }

    let message = match persistence {
        Persistence::Saved => {
            tracing::info!("Admin {} deleted user: {username}", auth.username);
            "User deleted successfully.".to_string()
        }
        Persistence::Unsaved(_) => {
            tracing::warn!("User {username} deleted in memory only");
            "User deleted but could not save to file.".to_string()
        }
    };

    Ok(Json(ActionResponse {
        success: true,
        message,
    }))
}
