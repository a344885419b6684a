//! Machines, their safety devices, and the test records taken against them.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::db;
use crate::models::{HistorySort, LoginAudit, Machine, SafetyDevice, TestFilter, TestRecord, TestRecordView};

pub const MAX_RESULT_LEN: usize = 10;
pub const MAX_NOTES_LEN: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Machine {0} not found")]
    UnknownMachine(i64),
    #[error("Safety device {0} not found")]
    UnknownDevice(i64),
    #[error("Safety device {device_id} does not belong to machine {machine_id}")]
    DeviceMismatch { machine_id: i64, device_id: i64 },
    #[error("{0}")]
    InvalidField(String),
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// A test result as submitted by a tester.
#[derive(Debug, Clone)]
pub struct NewTest<'a> {
    pub machine_id: i64,
    pub device_id: i64,
    pub username: &'a str,
    pub test_result: &'a str,
    pub notes: &'a str,
}

#[derive(Clone)]
pub struct TestRegistry {
    pool: SqlitePool,
}

impl TestRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn list_machines(&self) -> Result<Vec<Machine>, RegistryError> {
        Ok(db::machines::list(&self.pool).await?)
    }

    pub async fn list_devices(&self, machine_id: i64) -> Result<Vec<SafetyDevice>, RegistryError> {
        Ok(db::safety_devices::list_by_machine(&self.pool, machine_id).await?)
    }

    pub async fn find_machine(&self, id: i64) -> Result<Option<Machine>, RegistryError> {
        Ok(db::machines::find_by_id(&self.pool, id).await?)
    }

    /// The device `device_id`, provided it is mounted on `machine_id`.
    pub async fn find_device_for_machine(
        &self,
        machine_id: i64,
        device_id: i64,
    ) -> Result<SafetyDevice, RegistryError> {
        let device = db::safety_devices::find_by_id(&self.pool, device_id)
            .await?
            .ok_or(RegistryError::UnknownDevice(device_id))?;

        if device.machine_id != machine_id {
            return Err(RegistryError::DeviceMismatch {
                machine_id,
                device_id,
            });
        }
        Ok(device)
    }

    /// Insert a test record stamped with the current time. The machine and
    /// device must exist and the device must be mounted on that machine.
    pub async fn record_test(&self, test: NewTest<'_>) -> Result<TestRecord, RegistryError> {
        let result = test.test_result.trim();
        if result.is_empty() {
            return Err(RegistryError::InvalidField(
                "test_result is required".to_string(),
            ));
        }
        if result.chars().count() > MAX_RESULT_LEN {
            return Err(RegistryError::InvalidField(format!(
                "test_result must be at most {MAX_RESULT_LEN} characters"
            )));
        }
        if test.notes.chars().count() > MAX_NOTES_LEN {
            return Err(RegistryError::InvalidField(format!(
                "notes must be at most {MAX_NOTES_LEN} characters"
            )));
        }

        self.find_machine(test.machine_id)
            .await?
            .ok_or(RegistryError::UnknownMachine(test.machine_id))?;
        self.find_device_for_machine(test.machine_id, test.device_id).await?;

        let record = db::test_records::create(
            &self.pool,
            test.machine_id,
            test.device_id,
            test.username,
            result,
            test.notes,
            Utc::now(),
        )
        .await?;

        tracing::info!(
            record_id = record.id,
            machine_id = record.machine_id,
            device_id = record.device_id,
            result = %record.test_result,
            "Test recorded by {}",
            record.username
        );

        Ok(record)
    }

    /// Filtered history, newest first, then re-sorted by `sort`.
    pub async fn query_tests(
        &self,
        filter: &TestFilter,
        sort: HistorySort,
    ) -> Result<Vec<TestRecordView>, RegistryError> {
        let mut rows = db::test_records::search(&self.pool, filter).await?;
        sort.apply(&mut rows);
        Ok(rows)
    }

    pub async fn count_tests(&self) -> Result<i64, RegistryError> {
        Ok(db::test_records::count(&self.pool).await?)
    }

    /// Most recent login recorded for `username`.
    pub async fn last_login(&self, username: &str) -> Result<Option<LoginAudit>, RegistryError> {
        let sessions = db::audit::list_for_user(&self.pool, username).await?;
        Ok(sessions.into_iter().next())
    }
}
