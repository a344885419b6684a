use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Record a session start. Failures are logged and never block the login.
pub async fn log_login(pool: &SqlitePool, session_id: Uuid, username: &str) {
    if let Err(e) = crate::db::audit::record_login(pool, session_id, username, Utc::now()).await {
        tracing::error!("Failed to record login audit for {username}: {e}");
    }
}

/// Close a session's audit row. Failures are logged and never block logout.
pub async fn log_logout(pool: &SqlitePool, session_id: Uuid, username: &str) {
    match crate::db::audit::record_logout(pool, session_id, Utc::now()).await {
        Ok(true) => {}
        Ok(false) => tracing::debug!("No open audit row for session {session_id} ({username})"),
        Err(e) => tracing::error!("Failed to record logout audit for {username}: {e}"),
    }
}
