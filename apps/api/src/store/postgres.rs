use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::models::job::{AnalysisJob, AnalysisRecord, JobStatus, JobSummary, NewJob};
use crate::models::selection::{JobDetails, OutputFieldsSelection, ResumeFieldsSelection};
use crate::store::{RecordStore, StoreError};

/// Postgres-backed store over the `analysis_jobs` table.
/// Records live in a JSONB array and are appended in place.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AnalysisJobRow {
    id: Uuid,
    title: String,
    job_details: Json<JobDetails>,
    output_fields: Json<OutputFieldsSelection>,
    resume_fields: Json<ResumeFieldsSelection>,
    total_records: i32,
    processed_records: i32,
    pool_records: i32,
    status: String,
    records: Json<Vec<AnalysisRecord>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct JobSummaryRow {
    id: Uuid,
    title: String,
    total_records: i32,
    processed_records: i32,
    pool_records: i32,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn count(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn parse_status(status: &str) -> Result<JobStatus, StoreError> {
    status.parse().map_err(StoreError::Serialization)
}

impl TryFrom<AnalysisJobRow> for AnalysisJob {
    type Error = StoreError;

    fn try_from(row: AnalysisJobRow) -> Result<Self, Self::Error> {
        Ok(AnalysisJob {
            id: row.id,
            title: row.title,
            job_details: row.job_details.0,
            output_fields: row.output_fields.0,
            resume_fields: row.resume_fields.0,
            total_records: count(row.total_records),
            processed_records: count(row.processed_records),
            pool_records: count(row.pool_records),
            status: parse_status(&row.status)?,
            records: row.records.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<JobSummaryRow> for JobSummary {
    type Error = StoreError;

    fn try_from(row: JobSummaryRow) -> Result<Self, Self::Error> {
        Ok(JobSummary {
            id: row.id,
            title: row.title,
            total_records: count(row.total_records),
            processed_records: count(row.processed_records),
            pool_records: count(row.pool_records),
            status: parse_status(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Maps "no row touched" to `NotFound`.
fn expect_row(id: Uuid, rows_affected: u64) -> Result<(), StoreError> {
    if rows_affected == 0 {
        Err(StoreError::NotFound(id))
    } else {
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn create_job(&self, new_job: NewJob) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO analysis_jobs
                (id, title, job_details, output_fields, resume_fields, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(&new_job.title)
        .bind(Json(&new_job.job_details))
        .bind(Json(&new_job.output_fields))
        .bind(Json(&new_job.resume_fields))
        .bind(JobStatus::Processing.as_str())
        .execute(&self.pool)
        .await?;

        debug!("Created analysis job {id}");
        Ok(id)
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<AnalysisJob>, StoreError> {
        let row: Option<AnalysisJobRow> =
            sqlx::query_as("SELECT * FROM analysis_jobs WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(AnalysisJob::try_from).transpose()
    }

    async fn list_jobs(&self) -> Result<Vec<JobSummary>, StoreError> {
        let rows: Vec<JobSummaryRow> = sqlx::query_as(
            r#"
            SELECT id, title, total_records, processed_records, pool_records,
                   status, created_at, updated_at
            FROM analysis_jobs
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(JobSummary::try_from).collect()
    }

    async fn set_total_records(&self, id: Uuid, total: u32) -> Result<(), StoreError> {
        let total = i32::try_from(total)
            .map_err(|_| StoreError::Serialization(format!("total {total} out of range")))?;
        let result = sqlx::query(
            r#"
            UPDATE analysis_jobs
            SET total_records = $2, pool_records = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(total)
        .execute(&self.pool)
        .await?;
        expect_row(id, result.rows_affected())
    }

    async fn append_record(&self, id: Uuid, record: AnalysisRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE analysis_jobs
            SET records = records || $2::jsonb, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(Json(vec![record]))
        .execute(&self.pool)
        .await?;
        expect_row(id, result.rows_affected())
    }

    async fn increment_processed(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE analysis_jobs
            SET processed_records = processed_records + 1,
                pool_records = GREATEST(pool_records - 1, 0),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        expect_row(id, result.rows_affected())
    }

    async fn update_status(&self, id: Uuid, status: JobStatus) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE analysis_jobs SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        expect_row(id, result.rows_affected())
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE analysis_jobs
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }
        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM analysis_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        exists.map(|_| false).ok_or(StoreError::NotFound(id))
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM analysis_jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn row(status: &str, pool_records: i32) -> AnalysisJobRow {
        AnalysisJobRow {
            id: Uuid::new_v4(),
            title: "Backend Engineer".into(),
            job_details: Json(JobDetails::new("Backend Engineer")),
            output_fields: Json(OutputFieldsSelection::default()),
            resume_fields: Json(ResumeFieldsSelection::default()),
            total_records: 3,
            processed_records: 1,
            pool_records,
            status: status.into(),
            records: Json(vec![AnalysisRecord::completed(Map::new())]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_converts_to_job() {
        let job = AnalysisJob::try_from(row("stopped", 2)).unwrap();
        assert_eq!(job.status, JobStatus::Stopped);
        assert_eq!(job.pool_records, 2);
        assert_eq!(job.records.len(), 1);
    }

    #[test]
    fn test_negative_counts_read_as_zero() {
        let job = AnalysisJob::try_from(row("processing", -1)).unwrap();
        assert_eq!(job.pool_records, 0);
    }

    #[test]
    fn test_unknown_status_is_a_serialization_error() {
        assert!(matches!(
            AnalysisJob::try_from(row("paused", 0)),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn test_expect_row() {
        let id = Uuid::new_v4();
        assert!(expect_row(id, 1).is_ok());
        assert!(matches!(expect_row(id, 0), Err(StoreError::NotFound(x)) if x == id));
    }
}
