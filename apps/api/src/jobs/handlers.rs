use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::batch::BatchError;
use crate::errors::AppError;
use crate::models::job::{AnalysisJob, JobStatus, JobSummary, NewJob};
use crate::models::resume::ResumeInput;
use crate::models::selection::{JobDetails, OutputFieldsSelection, ResumeFieldsSelection};
use crate::pdf::{extract_pdf_text, PdfText};
use crate::state::AppState;

const DEFAULT_FILE_NAME: &str = "resume.pdf";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub title: String,
    pub job_details: JobDetails,
    #[serde(default)]
    pub output_fields: Option<OutputFieldsSelection>,
    #[serde(default)]
    pub resume_fields: Option<ResumeFieldsSelection>,
    #[serde(default)]
    pub resumes: Vec<ResumeInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}

impl CreateJobRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title is required".to_string()));
        }
        if self.resumes.is_empty() {
            return Err(AppError::Validation(
                "at least one resume is required".to_string(),
            ));
        }
        Ok(())
    }

    fn into_parts(self) -> (NewJob, Vec<ResumeInput>) {
        let title = self.title.trim().to_string();
        let mut job_details = self.job_details;
        if job_details.title.trim().is_empty() {
            job_details.title = title.clone();
        }
        let new_job = NewJob {
            title,
            job_details,
            output_fields: self.output_fields.unwrap_or_default(),
            resume_fields: self.resume_fields.unwrap_or_default(),
        };
        (new_job, self.resumes)
    }
}

/// POST /api/v1/resumes/extract
/// Multipart upload with a `file` field holding one PDF.
pub async fn handle_extract_resume(mut multipart: Multipart) -> Result<Json<PdfText>, AppError> {
    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .unwrap_or(DEFAULT_FILE_NAME)
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;
        upload = Some((file_name, data));
        break;
    }

    let (file_name, data) =
        upload.ok_or_else(|| AppError::Validation("missing 'file' field".to_string()))?;
    if data.is_empty() {
        return Err(AppError::Validation("uploaded file is empty".to_string()));
    }

    // pdf-extract is CPU-bound and may panic on malformed input
    let text = tokio::task::spawn_blocking(move || extract_pdf_text(&data, &file_name))
        .await
        .map_err(|e| AppError::UnprocessableEntity(format!("PDF could not be read: {e}")))??;

    info!(
        "Extracted {} ({} pages)",
        text.metadata.file_name, text.page_count
    );
    Ok(Json(text))
}

/// POST /api/v1/jobs
/// Creates the job and starts its batch in the background.
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(req): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<CreateJobResponse>), AppError> {
    req.validate()?;
    if let Some(active) = state.controller.active_job() {
        return Err(BatchError::AlreadyRunning { job_id: active }.into());
    }

    let (new_job, resumes) = req.into_parts();
    let job_id = state.store.create_job(new_job).await?;
    info!("Created job {job_id} with {} resumes", resumes.len());

    let controller = state.controller.clone();
    let store = state.store.clone();
    tokio::spawn(async move {
        match controller.start(job_id, resumes).await {
            Ok(status) => info!("Batch for job {job_id} finished: {status}"),
            Err(BatchError::AlreadyRunning { job_id: active }) => {
                // lost a race with another request; this job never started
                warn!("Job {job_id} not started, job {active} is running");
                if let Err(e) = store.update_status(job_id, JobStatus::Failed).await {
                    warn!("Could not mark job {job_id} failed: {e}");
                }
            }
            Err(e) => warn!("Batch for job {job_id} ended with error: {e}"),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateJobResponse {
            job_id,
            status: JobStatus::Processing,
        }),
    ))
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
) -> Result<Json<Vec<JobSummary>>, AppError> {
    Ok(Json(state.store.list_jobs().await?))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalysisJob>, AppError> {
    let job = state
        .store
        .get_job(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;
    Ok(Json(job))
}

/// POST /api/v1/jobs/:id/stop
pub async fn handle_stop_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobSummary>, AppError> {
    state.controller.stop(id).await?;
    let job = state
        .store
        .get_job(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;
    Ok(Json(JobSummary::from(&job)))
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.controller.active_job() == Some(id) {
        return Err(AppError::Conflict(format!(
            "Job {id} is running; stop it before deleting"
        )));
    }
    if !state.store.delete_job(id).await? {
        return Err(AppError::NotFound(format!("Job {id} not found")));
    }
    info!("Deleted job {id}");
    Ok(StatusCode::NO_CONTENT)
}
