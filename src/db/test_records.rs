use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::db::like_pattern;
use crate::models::{TestFilter, TestRecord, TestRecordView};

pub async fn create(
    pool: &SqlitePool,
    machine_id: i64,
    device_id: i64,
    username: &str,
    test_result: &str,
    notes: &str,
    test_date: DateTime<Utc>,
) -> Result<TestRecord, sqlx::Error> {
    sqlx::query_as::<_, TestRecord>(
        "INSERT INTO test_records (machine_id, device_id, username, test_result, test_date, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING *",
    )
    .bind(machine_id)
    .bind(device_id)
    .bind(username)
    .bind(test_result)
    .bind(test_date)
    .bind(notes)
    .fetch_one(pool)
    .await
}

/// Joined history rows matching `filter`, newest first, with
/// `days_since_test` computed against the current time.
pub async fn search(
    pool: &SqlitePool,
    filter: &TestFilter,
) -> Result<Vec<TestRecordView>, sqlx::Error> {
    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT tr.id, tr.machine_id, m.name AS machine_name,
                tr.device_id, sd.name AS device_name, sd.device_type,
                tr.username, tr.test_result, tr.test_date, tr.notes
         FROM test_records tr
         JOIN machines m ON tr.machine_id = m.id
         JOIN safety_devices sd ON tr.device_id = sd.id
         WHERE 1 = 1",
    );

    if !filter.search.is_empty() {
        let pattern = like_pattern(&filter.search);
        query
            .push(" AND (sd.name LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR m.name LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }

    if !filter.machine.is_empty() {
        query.push(" AND m.name = ").push_bind(filter.machine.clone());
    }

    if !filter.user.is_empty() {
        query.push(" AND tr.username = ").push_bind(filter.user.clone());
    }

    query.push(" ORDER BY tr.test_date DESC, tr.id DESC");

    let rows = query
        .build_query_as::<TestRecordView>()
        .fetch_all(pool)
        .await?;

    let now = Utc::now();
    Ok(rows.into_iter().map(|row| row.with_age(now)).collect())
}

pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM test_records")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}
