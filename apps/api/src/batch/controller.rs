//! Batch Controller — walks a job's resumes one at a time, tracking progress
//! in the record store, honouring stop requests between resumes, and allowing
//! at most one active batch per controller.
//!
//! Failure isolation:
//! - below one resume (extractor / scoring failures) errors become record data
//! - a resume that cannot be processed at all becomes a minimal failed record
//! - at or above batch start, errors abort the batch and mark the job failed

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analysis::{extract_sections, synthesize, SynthesisInput};
use crate::config::Config;
use crate::llm_client::{ChatModel, LlmError, ModelGateway, ProviderConfig};
use crate::models::job::{AnalysisJob, AnalysisRecord, JobStatus};
use crate::models::resume::{ExtractedResumeData, ResumeInput};
use crate::store::{RecordStore, StoreError};

/// Pause between two resumes, to stay under provider rate limits.
pub const INTER_RECORD_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("No LLM provider is configured")]
    ConfigMissing,

    #[error("A batch is already running for job {job_id}")]
    AlreadyRunning { job_id: Uuid },

    #[error("No resumes to process")]
    NoData,

    #[error("Job {0} not found")]
    JobNotFound(Uuid),

    #[error("Job {job_id} is already {status}")]
    JobFinished { job_id: Uuid, status: JobStatus },

    #[error("Job {0} already holds processed records")]
    JobAlreadyStarted(Uuid),

    #[error("Model gateway error: {0}")]
    Gateway(#[from] LlmError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// A resume that could not be processed at all.
#[derive(Debug, Error)]
enum ResumeError {
    #[error("Resume text is empty")]
    EmptyText,
}

/// Supplies the provider configuration at batch start.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn provider_config(&self) -> Option<ProviderConfig>;
}

#[async_trait]
impl ConfigSource for Option<ProviderConfig> {
    async fn provider_config(&self) -> Option<ProviderConfig> {
        self.clone()
    }
}

#[async_trait]
impl ConfigSource for Config {
    async fn provider_config(&self) -> Option<ProviderConfig> {
        self.provider.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Processing { job_id: Uuid },
}

pub struct BatchController {
    store: Arc<dyn RecordStore>,
    gateway: Arc<dyn ModelGateway>,
    config: Arc<dyn ConfigSource>,
    state: Mutex<ControllerState>,
    stop_requested: AtomicBool,
    inter_record_delay: Duration,
}

/// Holds the single-flight slot; releasing it on drop covers every exit path.
struct ActiveSlot<'a> {
    controller: &'a BatchController,
}

impl Drop for ActiveSlot<'_> {
    fn drop(&mut self) {
        *self.controller.lock_state() = ControllerState::Idle;
    }
}

impl BatchController {
    pub fn new(
        store: Arc<dyn RecordStore>,
        gateway: Arc<dyn ModelGateway>,
        config: Arc<dyn ConfigSource>,
    ) -> Self {
        Self {
            store,
            gateway,
            config,
            state: Mutex::new(ControllerState::Idle),
            stop_requested: AtomicBool::new(false),
            inter_record_delay: INTER_RECORD_DELAY,
        }
    }

    pub fn with_inter_record_delay(mut self, delay: Duration) -> Self {
        self.inter_record_delay = delay;
        self
    }

    pub fn state(&self) -> ControllerState {
        *self.lock_state()
    }

    pub fn active_job(&self) -> Option<Uuid> {
        match self.state() {
            ControllerState::Processing { job_id } => Some(job_id),
            ControllerState::Idle => None,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        // The state is a plain enum; a poisoned lock still holds a valid value.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn claim(&self, job_id: Uuid) -> Result<ActiveSlot<'_>, BatchError> {
        let mut state = self.lock_state();
        if let ControllerState::Processing { job_id: active } = *state {
            return Err(BatchError::AlreadyRunning { job_id: active });
        }
        *state = ControllerState::Processing { job_id };
        self.stop_requested.store(false, Ordering::SeqCst);
        Ok(ActiveSlot { controller: self })
    }

    /// Runs the batch for `job_id` to completion, stop, or failure and
    /// returns the job's final status.
    pub async fn start(
        &self,
        job_id: Uuid,
        resumes: Vec<ResumeInput>,
    ) -> Result<JobStatus, BatchError> {
        let _slot = self.claim(job_id)?;

        match self.run(job_id, resumes).await {
            Ok(status) => Ok(status),
            Err(e @ (BatchError::JobFinished { .. } | BatchError::JobAlreadyStarted(_))) => {
                warn!("Batch for job {job_id} not started: {e}");
                Err(e)
            }
            Err(e) => {
                error!("Batch for job {job_id} failed: {e}");
                self.mark_failed(job_id).await;
                Err(e)
            }
        }
    }

    /// Requests a stop. The resume in flight finishes; no further resume starts.
    /// A job that already reached a terminal status keeps it.
    pub async fn stop(&self, job_id: Uuid) -> Result<(), BatchError> {
        if self.active_job() == Some(job_id) {
            self.stop_requested.store(true, Ordering::SeqCst);
            info!("Stop requested for job {job_id}");
        }

        match self
            .store
            .transition_status(job_id, JobStatus::Processing, JobStatus::Stopped)
            .await
        {
            Ok(_) => Ok(()),
            Err(StoreError::NotFound(id)) => Err(BatchError::JobNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn run(&self, job_id: Uuid, resumes: Vec<ResumeInput>) -> Result<JobStatus, BatchError> {
        let provider = self
            .config
            .provider_config()
            .await
            .ok_or(BatchError::ConfigMissing)?;
        if resumes.is_empty() {
            return Err(BatchError::NoData);
        }
        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or(BatchError::JobNotFound(job_id))?;
        if job.status.is_terminal() {
            return Err(BatchError::JobFinished {
                job_id,
                status: job.status,
            });
        }
        if job.processed_records > 0 || !job.records.is_empty() {
            return Err(BatchError::JobAlreadyStarted(job_id));
        }
        let model = self.gateway.create(&provider)?;

        let total = resumes.len();
        self.store.set_total_records(job_id, total as u32).await?;
        info!(
            "Batch started for job {job_id}: {total} resumes, provider={}",
            provider.provider
        );

        for (index, resume) in resumes.iter().enumerate() {
            if self.stop_requested.load(Ordering::SeqCst) {
                info!("Job {job_id} stopped after {index}/{total} resumes");
                break;
            }

            let position = index + 1;
            let record = match self.process_resume(&job, resume, model.as_ref()).await {
                Ok(record) => record,
                Err(e) => {
                    warn!("Resume {position} of job {job_id} failed: {e}");
                    failed_resume_record(position, &e.to_string())
                }
            };
            self.store.append_record(job_id, record).await?;
            self.store.increment_processed(job_id).await?;
            info!("Job {job_id} progress: {position}/{total}");

            if position < total {
                tokio::time::sleep(self.inter_record_delay).await;
            }
        }

        self.finish(job_id).await
    }

    async fn process_resume(
        &self,
        job: &AnalysisJob,
        resume: &ResumeInput,
        model: &dyn ChatModel,
    ) -> Result<AnalysisRecord, ResumeError> {
        if resume.raw_text.trim().is_empty() {
            return Err(ResumeError::EmptyText);
        }

        let extracted = ExtractedResumeData {
            raw_text: resume.raw_text.clone(),
            structured_data: extract_sections(
                &resume.raw_text,
                resume.structured_data.as_ref(),
                &job.resume_fields,
                model,
            )
            .await,
        };

        let sections = &extracted.structured_data;
        let input = SynthesisInput {
            personal: &sections.personal_info,
            education: &sections.education_info,
            work: &sections.work_experience_info,
            additional: &sections.additional_fields,
            job_details: &job.job_details,
            output_fields: &job.output_fields,
            raw_text: &extracted.raw_text,
        };
        Ok(synthesize(input, model).await)
    }

    /// Terminal transition. A stop wins over completion.
    async fn finish(&self, job_id: Uuid) -> Result<JobStatus, BatchError> {
        let target = if self.stop_requested.load(Ordering::SeqCst) {
            JobStatus::Stopped
        } else {
            JobStatus::Completed
        };

        if self
            .store
            .transition_status(job_id, JobStatus::Processing, target)
            .await?
        {
            info!("Job {job_id} {target}");
            return Ok(target);
        }

        // Someone else already moved the job to a terminal status.
        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or(BatchError::JobNotFound(job_id))?;
        Ok(job.status)
    }

    async fn mark_failed(&self, job_id: Uuid) {
        match self
            .store
            .transition_status(job_id, JobStatus::Processing, JobStatus::Failed)
            .await
        {
            Ok(_) => {}
            Err(StoreError::NotFound(_)) => {}
            Err(e) => warn!("Could not mark job {job_id} failed: {e}"),
        }
    }
}

fn failed_resume_record(position: usize, error: &str) -> AnalysisRecord {
    let mut fields = Map::new();
    fields.insert("fullName".to_string(), json!(format!("Resume {position}")));
    AnalysisRecord::failed(fields, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::ModelResponse;
    use crate::models::job::{NewJob, RecordStatus};
    use crate::models::selection::JobDetails;
    use crate::store::InMemoryRecordStore;
    use std::sync::atomic::AtomicU32;
    use tokio::sync::Notify;

    const ANALYSIS_MARKER: &str = "evaluating one candidate";

    /// Scripted model: every call fails, or sections answer with a name taken
    /// from the resume text and scoring answers with a fixed verdict.
    struct ScriptedModel {
        fail: bool,
        gate: Option<Arc<Gate>>,
    }

    /// Blocks the scoring call for the resume containing `marker`.
    struct Gate {
        marker: &'static str,
        reached: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn invoke(&self, prompt: &str) -> Result<ModelResponse, LlmError> {
            if self.fail {
                return Err(LlmError::Api {
                    status: 503,
                    message: "unavailable".into(),
                });
            }
            let is_analysis = prompt.contains(ANALYSIS_MARKER);
            if let Some(gate) = &self.gate {
                if is_analysis && prompt.contains(gate.marker) {
                    gate.reached.notify_one();
                    gate.release.notified().await;
                }
            }
            let content = if is_analysis {
                r#"{"overallScore": 7, "summary": "Reasonable fit."}"#
            } else {
                r#"{"fullName": "Candidate"}"#
            };
            Ok(ModelResponse {
                content: content.to_string(),
            })
        }
    }

    struct ScriptedGateway {
        fail: bool,
        gate: Option<Arc<Gate>>,
        created: AtomicU32,
    }

    impl ScriptedGateway {
        fn new(fail: bool, gate: Option<Arc<Gate>>) -> Self {
            Self {
                fail,
                gate,
                created: AtomicU32::new(0),
            }
        }
    }

    impl ModelGateway for ScriptedGateway {
        fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn ChatModel>, LlmError> {
            config.validate()?;
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(ScriptedModel {
                fail: self.fail,
                gate: self.gate.clone(),
            }))
        }
    }

    fn ollama_config() -> ProviderConfig {
        serde_json::from_value(json!({
            "provider": "ollama",
            "model": "llama3.1",
            "temperature": "0.2"
        }))
        .unwrap()
    }

    struct Harness {
        store: Arc<InMemoryRecordStore>,
        gateway: Arc<ScriptedGateway>,
        controller: Arc<BatchController>,
    }

    fn harness(provider: Option<ProviderConfig>, gateway: ScriptedGateway) -> Harness {
        let store = Arc::new(InMemoryRecordStore::new());
        let gateway = Arc::new(gateway);
        let controller = Arc::new(BatchController::new(
            store.clone(),
            gateway.clone(),
            Arc::new(provider),
        ));
        Harness {
            store,
            gateway,
            controller,
        }
    }

    async fn create_job(store: &InMemoryRecordStore) -> Uuid {
        store
            .create_job(NewJob {
                title: "Backend Engineer".into(),
                job_details: JobDetails::new("Backend Engineer"),
                output_fields: Default::default(),
                resume_fields: Default::default(),
            })
            .await
            .unwrap()
    }

    fn resumes(n: usize) -> Vec<ResumeInput> {
        (1..=n)
            .map(|i| ResumeInput::from_text(format!("RESUME-{i} candidate text")))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_call_failing_yields_failed_record_and_completed_job() {
        let h = harness(Some(ollama_config()), ScriptedGateway::new(true, None));
        let job_id = create_job(&h.store).await;

        let status = h.controller.start(job_id, resumes(1)).await.unwrap();

        assert_eq!(status, JobStatus::Completed);
        let job = h.store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.records.len(), 1);
        let record = &job.records[0];
        assert_eq!(record.status, RecordStatus::Failed);
        assert!(record.error.is_some());
        assert_eq!(record.field_str("fullName"), Some("N/A"));
        assert_eq!(record.fields["education"], json!([]));
        assert_eq!(record.fields["workExperience"], json!([]));
        assert_eq!(record.fields["skills"], json!([]));
        assert_eq!(job.processed_records, 1);
        assert_eq!(h.controller.active_job(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_processes_all_resumes_in_order() {
        let h = harness(Some(ollama_config()), ScriptedGateway::new(false, None));
        let job_id = create_job(&h.store).await;

        let status = h.controller.start(job_id, resumes(3)).await.unwrap();

        assert_eq!(status, JobStatus::Completed);
        let job = h.store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.total_records, 3);
        assert_eq!(job.processed_records, 3);
        assert_eq!(job.pool_records, 0);
        assert!(job
            .records
            .iter()
            .all(|r| r.status == RecordStatus::Completed && r.fields["overallScore"] == json!(7)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_mid_batch_keeps_finished_records() {
        let gate = Arc::new(Gate {
            marker: "RESUME-2",
            reached: Notify::new(),
            release: Notify::new(),
        });
        let h = harness(
            Some(ollama_config()),
            ScriptedGateway::new(false, Some(gate.clone())),
        );
        let job_id = create_job(&h.store).await;

        let controller = h.controller.clone();
        let batch = tokio::spawn(async move { controller.start(job_id, resumes(5)).await });

        gate.reached.notified().await;
        assert_eq!(h.controller.active_job(), Some(job_id));
        h.controller.stop(job_id).await.unwrap();
        gate.release.notify_one();

        let status = batch.await.unwrap().unwrap();
        assert_eq!(status, JobStatus::Stopped);

        let job = h.store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Stopped);
        assert_eq!(job.records.len(), 2);
        assert_eq!(job.processed_records, 2);
        assert_eq!(job.pool_records, 3);
        assert_eq!(h.controller.active_job(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_is_rejected_while_running() {
        let gate = Arc::new(Gate {
            marker: "RESUME-1",
            reached: Notify::new(),
            release: Notify::new(),
        });
        let h = harness(
            Some(ollama_config()),
            ScriptedGateway::new(false, Some(gate.clone())),
        );
        let first = create_job(&h.store).await;
        let second = create_job(&h.store).await;

        let controller = h.controller.clone();
        let batch = tokio::spawn(async move { controller.start(first, resumes(1)).await });
        gate.reached.notified().await;

        let rejected = h.controller.start(second, resumes(2)).await;
        assert!(matches!(
            rejected,
            Err(BatchError::AlreadyRunning { job_id }) if job_id == first
        ));
        let untouched = h.store.get_job(second).await.unwrap().unwrap();
        assert_eq!(untouched.status, JobStatus::Processing);
        assert_eq!(untouched.total_records, 0);

        gate.release.notify_one();
        assert_eq!(batch.await.unwrap().unwrap(), JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_empty_input_fails_before_any_model_call() {
        let h = harness(Some(ollama_config()), ScriptedGateway::new(false, None));
        let job_id = create_job(&h.store).await;

        let result = h.controller.start(job_id, Vec::new()).await;

        assert!(matches!(result, Err(BatchError::NoData)));
        assert_eq!(h.gateway.created.load(Ordering::SeqCst), 0);
        let job = h.store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(h.controller.active_job(), None);
    }

    #[tokio::test]
    async fn test_missing_config_marks_job_failed() {
        let h = harness(None, ScriptedGateway::new(false, None));
        let job_id = create_job(&h.store).await;

        let result = h.controller.start(job_id, resumes(1)).await;

        assert!(matches!(result, Err(BatchError::ConfigMissing)));
        let job = h.store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_unknown_job_and_bad_provider() {
        let h = harness(Some(ollama_config()), ScriptedGateway::new(false, None));
        let missing = Uuid::new_v4();
        assert!(matches!(
            h.controller.start(missing, resumes(1)).await,
            Err(BatchError::JobNotFound(id)) if id == missing
        ));

        let mut bad = ollama_config();
        bad.provider = "watsonx".into();
        let h = harness(Some(bad), ScriptedGateway::new(false, None));
        let job_id = create_job(&h.store).await;
        assert!(matches!(
            h.controller.start(job_id, resumes(1)).await,
            Err(BatchError::Gateway(LlmError::UnsupportedProvider(_)))
        ));
        let job = h.store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_resume_becomes_numbered_failed_record() {
        let h = harness(Some(ollama_config()), ScriptedGateway::new(false, None));
        let job_id = create_job(&h.store).await;
        let mut input = resumes(2);
        input[1].raw_text = "   ".into();

        h.controller.start(job_id, input).await.unwrap();

        let job = h.store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.records.len(), 2);
        assert_eq!(job.records[1].field_str("fullName"), Some("Resume 2"));
        assert_eq!(job.records[1].status, RecordStatus::Failed);
        assert_eq!(job.records[1].error.as_deref(), Some("Resume text is empty"));
        assert_eq!(job.processed_records, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_start_keeps_job_stopped() {
        let h = harness(Some(ollama_config()), ScriptedGateway::new(false, None));
        let job_id = create_job(&h.store).await;

        h.controller.stop(job_id).await.unwrap();
        let result = h.controller.start(job_id, resumes(1)).await;

        assert!(matches!(
            result,
            Err(BatchError::JobFinished {
                status: JobStatus::Stopped,
                ..
            })
        ));
        let job = h.store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Stopped);
        assert!(job.records.is_empty());
        assert_eq!(job.processed_records, 0);
        assert_eq!(h.gateway.created.load(Ordering::SeqCst), 0);
        assert_eq!(h.controller.active_job(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_on_completed_job_is_rejected() {
        let h = harness(Some(ollama_config()), ScriptedGateway::new(false, None));
        let job_id = create_job(&h.store).await;
        h.controller.start(job_id, resumes(1)).await.unwrap();

        let result = h.controller.start(job_id, resumes(1)).await;

        assert!(matches!(
            result,
            Err(BatchError::JobFinished {
                status: JobStatus::Completed,
                ..
            })
        ));
        let job = h.store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.records.len(), 1);
        assert_eq!(job.processed_records, 1);
        assert_eq!(job.total_records, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_on_job_with_records_is_rejected() {
        let h = harness(Some(ollama_config()), ScriptedGateway::new(false, None));
        let job_id = create_job(&h.store).await;
        h.store
            .append_record(job_id, failed_resume_record(1, "earlier run"))
            .await
            .unwrap();

        let result = h.controller.start(job_id, resumes(2)).await;

        assert!(matches!(result, Err(BatchError::JobAlreadyStarted(id)) if id == job_id));
        let job = h.store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.records.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_after_terminal_status_changes_nothing() {
        let h = harness(Some(ollama_config()), ScriptedGateway::new(false, None));
        let job_id = create_job(&h.store).await;
        h.controller.start(job_id, resumes(1)).await.unwrap();

        h.controller.stop(job_id).await.unwrap();
        h.controller.stop(job_id).await.unwrap();

        let job = h.store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(matches!(
            h.controller.stop(Uuid::new_v4()).await,
            Err(BatchError::JobNotFound(_))
        ));
    }
}
