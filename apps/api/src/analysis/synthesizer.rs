//! Analysis Synthesizer — scores one candidate against the job and flattens
//! everything known about them into a single `AnalysisRecord`.

use serde_json::{Map, Value};
use tracing::warn;

use crate::analysis::fields::{output_fields, SectionSchema, SCORE_KEYS};
use crate::analysis::normalizer::normalize;
use crate::analysis::prompts::ANALYSIS_PROMPT_TEMPLATE;
use crate::analysis::retry::{execute_with_retry, MAX_ATTEMPTS};
use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::llm_client::{ChatModel, LlmError};
use crate::models::job::AnalysisRecord;
use crate::models::resume::{is_na, EducationInfo, PersonalInfo, WorkExperienceInfo};
use crate::models::selection::{JobDetails, OutputFieldsSelection};

/// Resume text beyond this many characters is cut from the scoring prompt.
pub const MAX_RAW_TEXT_CHARS: usize = 12_000;

const MIN_SCORE: f64 = 1.0;
const MAX_SCORE: f64 = 10.0;

/// Everything the scoring call needs for one candidate.
pub struct SynthesisInput<'a> {
    pub personal: &'a PersonalInfo,
    pub education: &'a EducationInfo,
    pub work: &'a WorkExperienceInfo,
    pub additional: &'a Map<String, Value>,
    pub job_details: &'a JobDetails,
    pub output_fields: &'a OutputFieldsSelection,
    pub raw_text: &'a str,
}

impl SynthesisInput<'_> {
    /// Flattened section data: personal < education < work < additional.
    pub fn union(&self) -> Map<String, Value> {
        let mut union = Map::new();
        for section in [
            serde_json::to_value(self.personal),
            serde_json::to_value(self.education),
            serde_json::to_value(self.work),
        ] {
            if let Ok(Value::Object(fields)) = section {
                union.extend(fields);
            }
        }
        union.extend(self.additional.clone());
        union
    }
}

pub fn build_analysis_prompt(input: &SynthesisInput<'_>, schema: &SectionSchema) -> String {
    let job = input.job_details;
    ANALYSIS_PROMPT_TEMPLATE
        .replace("{job_title}", &job.title)
        .replace("{job_description}", JobDetails::or_na(&job.description))
        .replace("{job_requirements}", JobDetails::or_na(&job.requirements))
        .replace("{job_experience}", JobDetails::or_na(&job.experience))
        .replace("{job_location}", JobDetails::or_na(&job.location))
        .replace("{job_salary}", JobDetails::or_na(&job.salary))
        .replace("{personal_info}", &pretty(input.personal))
        .replace("{education_info}", &pretty(input.education))
        .replace("{work_experience_info}", &pretty(input.work))
        .replace("{additional_fields}", &pretty(input.additional))
        .replace("{schema}", &schema.skeleton_json())
        .replace("{instructions}", &schema.instructions_text())
        .replace("{json_rule}", JSON_ONLY_INSTRUCTION)
        // last, since resume text may itself contain `{...}` markers
        .replace("{raw_text}", &truncate_chars(input.raw_text, MAX_RAW_TEXT_CHARS))
}

fn pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}\n[truncated]", &text[..cut]),
        None => text.to_string(),
    }
}

/// Clamps numeric score keys into 1..=10, rounding to whole points.
fn clamp_scores(verdict: &mut Map<String, Value>) {
    for key in SCORE_KEYS {
        if let Some(score) = verdict.get(key).and_then(Value::as_f64) {
            let clamped = score.round().clamp(MIN_SCORE, MAX_SCORE) as u64;
            verdict.insert(key.to_string(), Value::from(clamped));
        }
    }
}

/// Runs the scoring call and produces the record for this candidate.
///
/// Never fails: when the call still errors after retries the record carries
/// the section data, `status: failed` and the error message.
pub async fn synthesize(input: SynthesisInput<'_>, model: &dyn ChatModel) -> AnalysisRecord {
    let schema = SectionSchema::build(&output_fields(input.output_fields));
    let prompt = build_analysis_prompt(&input, &schema);
    let prompt = &prompt;
    let fallback = schema.fallback_value();
    let fallback = &fallback;

    let verdict = execute_with_retry("analysis", MAX_ATTEMPTS, || async move {
        let response = model.invoke(prompt).await?;
        Ok::<Value, LlmError>(normalize(&response.content, fallback.clone()))
    })
    .await;

    let mut record = input.union();
    match verdict {
        Ok(verdict) => {
            let mut verdict = match verdict {
                Value::Object(fields) => fields,
                _ => {
                    warn!("Analysis returned a non-object verdict, using fallback");
                    schema.fallback.clone()
                }
            };
            clamp_scores(&mut verdict);
            merge_verdict(&mut record, verdict);
            AnalysisRecord::completed(record)
        }
        Err(e) => {
            warn!("Analysis failed for '{}': {e}", input.personal.full_name);
            AnalysisRecord::failed(record, e.to_string())
        }
    }
}

/// Verdict keys win, except that an `"N/A"` never replaces extracted data.
fn merge_verdict(record: &mut Map<String, Value>, verdict: Map<String, Value>) {
    for (key, value) in verdict {
        let is_placeholder = value.as_str().is_some_and(is_na);
        let has_data = record
            .get(&key)
            .is_some_and(|existing| existing.as_str().map_or(true, |s| !is_na(s)));
        if is_placeholder && has_data {
            continue;
        }
        record.insert(key, value);
    }
}
