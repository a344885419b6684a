use sqlx::SqlitePool;

use crate::models::Machine;

pub async fn list(pool: &SqlitePool) -> Result<Vec<Machine>, sqlx::Error> {
    sqlx::query_as::<_, Machine>("SELECT * FROM machines ORDER BY name COLLATE NOCASE, id")
        .fetch_all(pool)
        .await
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Machine>, sqlx::Error> {
    sqlx::query_as::<_, Machine>("SELECT * FROM machines WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Insert a machine unless one with the same name exists. Returns the id of
/// the new or existing row.
pub async fn ensure(pool: &SqlitePool, name: &str, location: &str) -> Result<i64, sqlx::Error> {
    sqlx::query(
        "INSERT INTO machines (name, location)
         SELECT ?1, ?2 WHERE NOT EXISTS (SELECT 1 FROM machines WHERE name = ?1)",
    )
    .bind(name)
    .bind(location)
    .execute(pool)
    .await?;

    let row: (i64,) = sqlx::query_as("SELECT id FROM machines WHERE name = ?1")
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}
