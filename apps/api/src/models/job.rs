use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::models::selection::{JobDetails, OutputFieldsSelection, ResumeFieldsSelection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
    Stopped,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Stopped => "stopped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "stopped" => Ok(JobStatus::Stopped),
            other => Err(format!("unknown job status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Completed,
    Failed,
}

/// Keys owned by the record envelope; section data may not shadow them.
const RESERVED_KEYS: [&str; 3] = ["status", "error", "analyzedAt"];

/// One output row per resume: every extracted field and verdict field
/// flattened into a single object, plus the outcome envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn completed(fields: Map<String, Value>) -> Self {
        Self::new(fields, RecordStatus::Completed, None)
    }

    pub fn failed(fields: Map<String, Value>, error: impl Into<String>) -> Self {
        Self::new(fields, RecordStatus::Failed, Some(error.into()))
    }

    fn new(mut fields: Map<String, Value>, status: RecordStatus, error: Option<String>) -> Self {
        for key in RESERVED_KEYS {
            fields.remove(key);
        }
        Self {
            fields,
            status,
            error,
            analyzed_at: Utc::now(),
        }
    }

    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

/// Everything needed to create a job row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    pub title: String,
    pub job_details: JobDetails,
    #[serde(default)]
    pub output_fields: OutputFieldsSelection,
    #[serde(default)]
    pub resume_fields: ResumeFieldsSelection,
}

/// One batch run over a set of resumes against one job description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisJob {
    pub id: Uuid,
    pub title: String,
    pub job_details: JobDetails,
    pub output_fields: OutputFieldsSelection,
    pub resume_fields: ResumeFieldsSelection,
    pub total_records: u32,
    pub processed_records: u32,
    /// Resumes not yet handled. Informational only; clamped at zero.
    pub pool_records: u32,
    pub status: JobStatus,
    pub records: Vec<AnalysisRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AnalysisJob {
    pub fn from_new(id: Uuid, new_job: NewJob) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: new_job.title,
            job_details: new_job.job_details,
            output_fields: new_job.output_fields,
            resume_fields: new_job.resume_fields,
            total_records: 0,
            processed_records: 0,
            pool_records: 0,
            status: JobStatus::Processing,
            records: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Job header without the records, for listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: Uuid,
    pub title: String,
    pub total_records: u32,
    pub processed_records: u32,
    pub pool_records: u32,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&AnalysisJob> for JobSummary {
    fn from(job: &AnalysisJob) -> Self {
        Self {
            id: job.id,
            title: job.title.clone(),
            total_records: job.total_records,
            processed_records: job.processed_records,
            pool_records: job.pool_records,
            status: job.status,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}
