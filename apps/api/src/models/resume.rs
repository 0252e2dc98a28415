use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const NOT_AVAILABLE: &str = "N/A";

fn na() -> String {
    NOT_AVAILABLE.to_string()
}

/// Models return null, numbers or empty strings for text fields; all of those
/// collapse to a string, with `"N/A"` for nothing usable.
fn text_or_na<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => na(),
    })
}

/// Anything that is not an array becomes an empty list.
fn list_or_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => Vec::new(),
    })
}

pub fn is_na(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v.eq_ignore_ascii_case(NOT_AVAILABLE)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    #[serde(default = "na", deserialize_with = "text_or_na")]
    pub full_name: String,
    #[serde(default = "na", deserialize_with = "text_or_na")]
    pub email: String,
    #[serde(default = "na", deserialize_with = "text_or_na")]
    pub phone: String,
    #[serde(default = "na", deserialize_with = "text_or_na")]
    pub address: String,
    #[serde(default = "na", deserialize_with = "text_or_na")]
    pub linkedin: String,
    #[serde(default = "na", deserialize_with = "text_or_na")]
    pub github: String,
    #[serde(default = "na", deserialize_with = "text_or_na")]
    pub website: String,
    #[serde(default = "na", deserialize_with = "text_or_na")]
    pub summary: String,
}

impl Default for PersonalInfo {
    fn default() -> Self {
        Self {
            full_name: na(),
            email: na(),
            phone: na(),
            address: na(),
            linkedin: na(),
            github: na(),
            website: na(),
            summary: na(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationInfo {
    #[serde(default, deserialize_with = "list_or_empty")]
    pub education: Vec<Value>,
    #[serde(default, deserialize_with = "list_or_empty")]
    pub certifications: Vec<Value>,
}

impl EducationInfo {
    pub fn is_empty(&self) -> bool {
        self.education.is_empty() && self.certifications.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperienceInfo {
    #[serde(default, deserialize_with = "list_or_empty")]
    pub work_experience: Vec<Value>,
    #[serde(default, deserialize_with = "list_or_empty")]
    pub projects: Vec<Value>,
}

impl WorkExperienceInfo {
    pub fn is_empty(&self) -> bool {
        self.work_experience.is_empty() && self.projects.is_empty()
    }
}

/// The four extracted sections of one resume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredData {
    pub personal_info: PersonalInfo,
    pub education_info: EducationInfo,
    pub work_experience_info: WorkExperienceInfo,
    pub additional_fields: Map<String, Value>,
}

/// Per-resume intermediate; dropped once the analysis record exists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedResumeData {
    pub raw_text: String,
    pub structured_data: StructuredData,
}

/// Sections carried over from an earlier extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorExtraction {
    #[serde(default)]
    pub personal_info: Option<PersonalInfo>,
    #[serde(default)]
    pub education_info: Option<EducationInfo>,
    #[serde(default)]
    pub work_experience_info: Option<WorkExperienceInfo>,
}

/// One resume handed to a batch: raw text plus whatever was already extracted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeInput {
    #[serde(default)]
    pub file_name: Option<String>,
    pub raw_text: String,
    #[serde(default)]
    pub structured_data: Option<PriorExtraction>,
}

impl ResumeInput {
    pub fn from_text(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            ..Default::default()
        }
    }
}
