use sqlx::SqlitePool;

use crate::models::SafetyDevice;

pub async fn list_by_machine(
    pool: &SqlitePool,
    machine_id: i64,
) -> Result<Vec<SafetyDevice>, sqlx::Error> {
    sqlx::query_as::<_, SafetyDevice>(
        "SELECT * FROM safety_devices WHERE machine_id = ?1 ORDER BY name COLLATE NOCASE, id",
    )
    .bind(machine_id)
    .fetch_all(pool)
    .await
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<SafetyDevice>, sqlx::Error> {
    sqlx::query_as::<_, SafetyDevice>("SELECT * FROM safety_devices WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Insert a device on a machine unless the (name, machine) pair is already
/// present. Returns whether a row was inserted.
pub async fn ensure<'e, E: sqlx::SqliteExecutor<'e>>(
    executor: E,
    machine_id: i64,
    name: &str,
    device_type: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO safety_devices (machine_id, name, device_type)
         SELECT ?1, ?2, ?3
         WHERE NOT EXISTS (SELECT 1 FROM safety_devices WHERE name = ?2 AND machine_id = ?1)",
    )
    .bind(machine_id)
    .bind(name)
    .bind(device_type)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}
