// Record store: persisted jobs and their analysis records.
// Every method is a single atomic update; callers never read-modify-write.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::job::{AnalysisJob, AnalysisRecord, JobStatus, JobSummary, NewJob};

pub use memory::InMemoryRecordStore;
pub use postgres::PgRecordStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Job {0} not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Persistence for analysis jobs.
///
/// Carried as `Arc<dyn RecordStore>` by the batch controller and `AppState`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create_job(&self, new_job: NewJob) -> Result<Uuid, StoreError>;

    async fn get_job(&self, id: Uuid) -> Result<Option<AnalysisJob>, StoreError>;

    /// Newest first, without records.
    async fn list_jobs(&self) -> Result<Vec<JobSummary>, StoreError>;

    /// Sets `totalRecords` and resets `poolRecords` to the same value.
    async fn set_total_records(&self, id: Uuid, total: u32) -> Result<(), StoreError>;

    async fn append_record(&self, id: Uuid, record: AnalysisRecord) -> Result<(), StoreError>;

    /// `processedRecords + 1`, `poolRecords - 1` clamped at zero.
    async fn increment_processed(&self, id: Uuid) -> Result<(), StoreError>;

    async fn update_status(&self, id: Uuid, status: JobStatus) -> Result<(), StoreError>;

    /// Moves the job from `from` to `to`. Returns false, changing nothing,
    /// when the job is in any other status.
    async fn transition_status(
        &self,
        id: Uuid,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<bool, StoreError>;

    /// Returns false when there was nothing to delete.
    async fn delete_job(&self, id: Uuid) -> Result<bool, StoreError>;
}
