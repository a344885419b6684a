use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::LoginAudit;

pub async fn record_login(
    pool: &SqlitePool,
    session_id: Uuid,
    username: &str,
    at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO login_audit (session_id, username, login_time, session_active)
         VALUES (?1, ?2, ?3, 1)",
    )
    .bind(session_id)
    .bind(username)
    .bind(at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Close the audit row for a session. Returns false when no open row matched.
pub async fn record_logout(
    pool: &SqlitePool,
    session_id: Uuid,
    at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE login_audit SET logout_time = ?2, session_active = 0
         WHERE session_id = ?1 AND session_active = 1",
    )
    .bind(session_id)
    .bind(at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_for_user(
    pool: &SqlitePool,
    username: &str,
) -> Result<Vec<LoginAudit>, sqlx::Error> {
    sqlx::query_as::<_, LoginAudit>(
        "SELECT * FROM login_audit WHERE username = ?1 ORDER BY login_time DESC, id DESC",
    )
    .bind(username)
    .fetch_all(pool)
    .await
}
