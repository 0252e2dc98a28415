use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::job::{AnalysisJob, AnalysisRecord, JobStatus, JobSummary, NewJob};
use crate::store::{RecordStore, StoreError};

/// Process-local store. Used when no database is configured and in tests.
#[derive(Default)]
pub struct InMemoryRecordStore {
    jobs: RwLock<HashMap<Uuid, AnalysisJob>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn modify<F, T>(&self, id: Uuid, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut AnalysisJob) -> T,
    {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        let out = f(job);
        job.updated_at = Utc::now();
        Ok(out)
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn create_job(&self, new_job: NewJob) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        self.jobs
            .write()
            .await
            .insert(id, AnalysisJob::from_new(id, new_job));
        Ok(id)
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<AnalysisJob>, StoreError> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn list_jobs(&self) -> Result<Vec<JobSummary>, StoreError> {
        let jobs = self.jobs.read().await;
        let mut summaries: Vec<JobSummary> = jobs.values().map(JobSummary::from).collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    async fn set_total_records(&self, id: Uuid, total: u32) -> Result<(), StoreError> {
        self.modify(id, |job| {
            job.total_records = total;
            job.pool_records = total;
        })
        .await
    }

    async fn append_record(&self, id: Uuid, record: AnalysisRecord) -> Result<(), StoreError> {
        self.modify(id, |job| job.records.push(record)).await
    }

    async fn increment_processed(&self, id: Uuid) -> Result<(), StoreError> {
        self.modify(id, |job| {
            job.processed_records += 1;
            job.pool_records = job.pool_records.saturating_sub(1);
        })
        .await
    }

    async fn update_status(&self, id: Uuid, status: JobStatus) -> Result<(), StoreError> {
        self.modify(id, |job| job.status = status).await
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<bool, StoreError> {
        self.modify(id, |job| {
            if job.status != from {
                return false;
            }
            job.status = to;
            true
        })
        .await
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.jobs.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::selection::JobDetails;
    use serde_json::Map;

    fn new_job(title: &str) -> NewJob {
        NewJob {
            title: title.to_string(),
            job_details: JobDetails::new(title),
            output_fields: Default::default(),
            resume_fields: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_create_and_progress_job() {
        let store = InMemoryRecordStore::new();
        let id = store.create_job(new_job("Backend Engineer")).await.unwrap();

        store.set_total_records(id, 2).await.unwrap();
        store
            .append_record(id, AnalysisRecord::completed(Map::new()))
            .await
            .unwrap();
        store.increment_processed(id).await.unwrap();

        let job = store.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.total_records, 2);
        assert_eq!(job.processed_records, 1);
        assert_eq!(job.pool_records, 1);
        assert_eq!(job.records.len(), 1);
    }

    #[tokio::test]
    async fn test_pool_records_clamped_at_zero() {
        let store = InMemoryRecordStore::new();
        let id = store.create_job(new_job("QA")).await.unwrap();
        store.set_total_records(id, 1).await.unwrap();
        store.increment_processed(id).await.unwrap();
        store.increment_processed(id).await.unwrap();

        let job = store.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.processed_records, 2);
        assert_eq!(job.pool_records, 0);
    }

    #[tokio::test]
    async fn test_transition_only_from_expected_status() {
        let store = InMemoryRecordStore::new();
        let id = store.create_job(new_job("SRE")).await.unwrap();

        assert!(store
            .transition_status(id, JobStatus::Processing, JobStatus::Completed)
            .await
            .unwrap());
        assert!(!store
            .transition_status(id, JobStatus::Processing, JobStatus::Stopped)
            .await
            .unwrap());
        let job = store.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_missing_job_errors_and_delete() {
        let store = InMemoryRecordStore::new();
        let missing = Uuid::new_v4();
        assert!(matches!(
            store.increment_processed(missing).await,
            Err(StoreError::NotFound(id)) if id == missing
        ));
        assert!(store.get_job(missing).await.unwrap().is_none());

        let id = store.create_job(new_job("Data")).await.unwrap();
        assert_eq!(store.list_jobs().await.unwrap().len(), 1);
        assert!(store.delete_job(id).await.unwrap());
        assert!(!store.delete_job(id).await.unwrap());
        assert!(store.list_jobs().await.unwrap().is_empty());
    }
}
