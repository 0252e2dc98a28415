//! Field Extractors — four section prompts run concurrently per resume.
//!
//! Every extractor is one retried model call followed by normalization with
//! the section fallback. A failed extractor never fails the resume: its
//! section becomes the fallback and the error is logged.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::analysis::contacts::enrich_contacts;
use crate::analysis::fields::{
    additional_fields, education_fields, personal_info_fields, work_experience_fields,
    SectionSchema,
};
use crate::analysis::normalizer::normalize_into;
use crate::analysis::prompts::{
    ADDITIONAL_FIELDS_SECTION, EDUCATION_SECTION, PERSONAL_INFO_SECTION,
    SECTION_EXTRACTION_TEMPLATE, WORK_EXPERIENCE_SECTION,
};
use crate::analysis::retry::{execute_with_retry, MAX_ATTEMPTS};
use crate::llm_client::prompts::{JSON_ONLY_INSTRUCTION, NO_INVENTION_INSTRUCTION};
use crate::llm_client::{ChatModel, LlmError};
use crate::models::resume::{
    is_na, EducationInfo, PersonalInfo, PriorExtraction, StructuredData, WorkExperienceInfo,
};
use crate::models::selection::ResumeFieldsSelection;

/// Renders the extraction prompt for one section.
pub fn build_extraction_prompt(section: &str, schema: &SectionSchema, raw_text: &str) -> String {
    let rules = format!("{NO_INVENTION_INSTRUCTION}\n{JSON_ONLY_INSTRUCTION}");
    SECTION_EXTRACTION_TEMPLATE
        .replace("{section}", section)
        .replace("{schema}", &schema.skeleton_json())
        .replace("{instructions}", &schema.instructions_text())
        .replace("{rules}", &rules)
        .replace("{resume_text}", raw_text)
}

/// One retried call for `section`, normalized into `T` with `fallback` for
/// output that cannot be recovered.
async fn run_section<T>(
    model: &dyn ChatModel,
    section: &str,
    schema: &SectionSchema,
    raw_text: &str,
    fallback: T,
) -> Result<T, LlmError>
where
    T: DeserializeOwned + Clone,
{
    let prompt = build_extraction_prompt(section, schema, raw_text);
    let prompt = &prompt;
    let fallback = &fallback;

    execute_with_retry(section, MAX_ATTEMPTS, || async move {
        let response = model.invoke(prompt).await?;
        Ok::<T, LlmError>(normalize_into(&response.content, fallback.clone()))
    })
    .await
}

pub async fn extract_personal_info(
    raw_text: &str,
    selection: &ResumeFieldsSelection,
    model: &dyn ChatModel,
) -> Result<PersonalInfo, LlmError> {
    let schema = SectionSchema::build(&personal_info_fields(selection));
    run_section(model, PERSONAL_INFO_SECTION, &schema, raw_text, PersonalInfo::default()).await
}

pub async fn extract_education(
    raw_text: &str,
    selection: &ResumeFieldsSelection,
    model: &dyn ChatModel,
) -> Result<EducationInfo, LlmError> {
    let schema = SectionSchema::build(&education_fields(selection));
    if schema.is_empty() {
        return Ok(EducationInfo::default());
    }
    run_section(model, EDUCATION_SECTION, &schema, raw_text, EducationInfo::default()).await
}

pub async fn extract_work_experience(
    raw_text: &str,
    selection: &ResumeFieldsSelection,
    model: &dyn ChatModel,
) -> Result<WorkExperienceInfo, LlmError> {
    let schema = SectionSchema::build(&work_experience_fields(selection));
    if schema.is_empty() {
        return Ok(WorkExperienceInfo::default());
    }
    run_section(
        model,
        WORK_EXPERIENCE_SECTION,
        &schema,
        raw_text,
        WorkExperienceInfo::default(),
    )
    .await
}

/// Extracts the toggled extra sections plus custom fields. Keys the model
/// leaves out are filled from the fallback so every requested key is present.
pub async fn extract_additional_fields(
    raw_text: &str,
    selection: &ResumeFieldsSelection,
    model: &dyn ChatModel,
) -> Result<Map<String, Value>, LlmError> {
    let schema = SectionSchema::build(&additional_fields(selection));
    if schema.is_empty() {
        return Ok(Map::new());
    }
    let extracted = run_section(
        model,
        ADDITIONAL_FIELDS_SECTION,
        &schema,
        raw_text,
        schema.fallback.clone(),
    )
    .await?;
    Ok(complete_from_fallback(extracted, &schema))
}

/// Keeps only schema keys; missing or null keys take their fallback.
fn complete_from_fallback(
    mut extracted: Map<String, Value>,
    schema: &SectionSchema,
) -> Map<String, Value> {
    schema
        .fallback
        .iter()
        .map(|(key, fallback)| {
            let value = extracted
                .remove(key)
                .filter(|v| !v.is_null())
                .unwrap_or_else(|| fallback.clone());
            (key.clone(), value)
        })
        .collect()
}

fn reusable_personal(prior: Option<&PriorExtraction>) -> Option<PersonalInfo> {
    prior
        .and_then(|p| p.personal_info.clone())
        .filter(|info| !is_na(&info.full_name))
}

fn reusable_education(prior: Option<&PriorExtraction>) -> Option<EducationInfo> {
    prior
        .and_then(|p| p.education_info.clone())
        .filter(|info| !info.is_empty())
}

fn reusable_work(prior: Option<&PriorExtraction>) -> Option<WorkExperienceInfo> {
    prior
        .and_then(|p| p.work_experience_info.clone())
        .filter(|info| !info.is_empty())
}

/// Runs the four extractors concurrently, reusing sections from `prior`
/// where they already carry data.
///
/// All-settled: each extractor's failure is replaced with its fallback.
pub async fn extract_sections(
    raw_text: &str,
    prior: Option<&PriorExtraction>,
    selection: &ResumeFieldsSelection,
    model: &dyn ChatModel,
) -> StructuredData {
    let reused_personal = reusable_personal(prior);
    let reused_education = reusable_education(prior);
    let reused_work = reusable_work(prior);

    let personal = async {
        match reused_personal {
            Some(info) => {
                debug!("Reusing previously extracted personal info");
                Ok(info)
            }
            None => extract_personal_info(raw_text, selection, model).await,
        }
    };
    let education = async {
        match reused_education {
            Some(info) => {
                debug!("Reusing previously extracted education");
                Ok(info)
            }
            None => extract_education(raw_text, selection, model).await,
        }
    };
    let work = async {
        match reused_work {
            Some(info) => {
                debug!("Reusing previously extracted work experience");
                Ok(info)
            }
            None => extract_work_experience(raw_text, selection, model).await,
        }
    };
    let additional = extract_additional_fields(raw_text, selection, model);
    let additional_fallback = SectionSchema::build(&additional_fields(selection)).fallback;

    let (personal, education, work, additional) =
        tokio::join!(personal, education, work, additional);

    let mut personal_info = settle(personal, PersonalInfo::default(), "personal info");
    if selection.contact_information {
        enrich_contacts(&mut personal_info, raw_text);
    }

    StructuredData {
        personal_info,
        education_info: settle(education, EducationInfo::default(), "education"),
        work_experience_info: settle(work, WorkExperienceInfo::default(), "work experience"),
        additional_fields: settle(additional, additional_fallback, "additional fields"),
    }
}

fn settle<T>(result: Result<T, LlmError>, fallback: T, section: &str) -> T {
    result.unwrap_or_else(|e| {
        warn!("{section} extraction failed after retries, using fallback: {e}");
        fallback
    })
}
