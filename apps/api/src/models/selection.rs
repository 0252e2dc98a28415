use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Value type of a user-defined field. Drives the example shown to the model
/// and the fallback used when extraction fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Number,
    List,
    Boolean,
}

impl FieldType {
    pub fn example_value(&self) -> Value {
        match self {
            FieldType::Text => json!("..."),
            FieldType::Number => json!(0),
            FieldType::List => json!([]),
            FieldType::Boolean => json!(false),
        }
    }

    pub fn fallback_value(&self) -> Value {
        match self {
            FieldType::List => json!([]),
            _ => json!("N/A"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomAnalysisField {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Which resume sections to extract. Missing toggles default to on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResumeFieldsSelection {
    pub contact_information: bool,
    pub professional_summary: bool,
    pub education: bool,
    pub work_experience: bool,
    pub projects: bool,
    pub certifications: bool,
    pub skills: bool,
    pub languages: bool,
    pub publications: bool,
    pub awards: bool,
    pub volunteer_experience: bool,
    pub custom_fields: Vec<CustomField>,
}

impl Default for ResumeFieldsSelection {
    fn default() -> Self {
        Self {
            contact_information: true,
            professional_summary: true,
            education: true,
            work_experience: true,
            projects: true,
            certifications: true,
            skills: true,
            languages: true,
            publications: true,
            awards: true,
            volunteer_experience: true,
            custom_fields: Vec::new(),
        }
    }
}

/// Which analysis dimensions the final scoring call must return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputFieldsSelection {
    pub full_name: bool,
    pub current_role: bool,
    pub overall_score: bool,
    pub skills_match: bool,
    pub experience_match: bool,
    pub education_match: bool,
    pub summary: bool,
    pub strengths: bool,
    pub weaknesses: bool,
    pub recommendations: bool,
    pub custom_fields: Vec<CustomAnalysisField>,
}

impl Default for OutputFieldsSelection {
    fn default() -> Self {
        Self {
            full_name: true,
            current_role: true,
            overall_score: true,
            skills_match: true,
            experience_match: true,
            education_match: true,
            summary: true,
            strengths: true,
            weaknesses: true,
            recommendations: true,
            custom_fields: Vec::new(),
        }
    }
}

/// The position candidates are scored against. Only `title` is required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetails {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
}

impl JobDetails {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Renders an optional detail for a prompt, `"N/A"` when absent or blank.
    pub fn or_na(value: &Option<String>) -> &str {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or("N/A")
    }
}
