//! Field table — every schema key a prompt can ask for, with its example
//! value, instruction line and fallback.
//!
//! Building a section schema is a pure fold over the enabled entries plus any
//! custom fields, so the schema (and its fallback) can be tested without
//! looking at prompt text.

use serde_json::{json, Map, Value};

use crate::models::selection::{
    CustomAnalysisField, CustomField, FieldType, OutputFieldsSelection, ResumeFieldsSelection,
};

/// Verdict keys holding a 1–10 score.
pub const SCORE_KEYS: [&str; 4] = [
    "overallScore",
    "skillsMatch",
    "experienceMatch",
    "educationMatch",
];

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub key: String,
    pub example: Value,
    pub instruction: String,
    pub fallback: Value,
}

impl FieldSpec {
    fn text(key: &str, example: &str, instruction: &str) -> Self {
        Self {
            key: key.to_string(),
            example: json!(example),
            instruction: instruction.to_string(),
            fallback: json!("N/A"),
        }
    }

    fn list(key: &str, example: Value, instruction: &str) -> Self {
        Self {
            key: key.to_string(),
            example,
            instruction: instruction.to_string(),
            fallback: json!([]),
        }
    }

    fn score(key: &str, example: u8, instruction: &str) -> Self {
        Self {
            key: key.to_string(),
            example: json!(example),
            instruction: instruction.to_string(),
            fallback: json!("N/A"),
        }
    }

    fn custom(name: &str, field_type: FieldType, instruction: String) -> Self {
        Self {
            key: slugify(name),
            example: field_type.example_value(),
            instruction,
            fallback: field_type.fallback_value(),
        }
    }
}

/// Schema skeleton, fallback and instruction lines for one prompt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionSchema {
    pub skeleton: Map<String, Value>,
    pub fallback: Map<String, Value>,
    pub instructions: Vec<String>,
}

impl SectionSchema {
    pub fn build<'a>(specs: impl IntoIterator<Item = &'a FieldSpec>) -> Self {
        specs
            .into_iter()
            .fold(SectionSchema::default(), |mut schema, spec| {
                schema.skeleton.insert(spec.key.clone(), spec.example.clone());
                schema.fallback.insert(spec.key.clone(), spec.fallback.clone());
                schema
                    .instructions
                    .push(format!("- {}: {}", spec.key, spec.instruction));
                schema
            })
    }

    pub fn is_empty(&self) -> bool {
        self.skeleton.is_empty()
    }

    pub fn skeleton_json(&self) -> String {
        serde_json::to_string_pretty(&self.skeleton).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn fallback_value(&self) -> Value {
        Value::Object(self.fallback.clone())
    }

    pub fn instructions_text(&self) -> String {
        self.instructions.join("\n")
    }
}

/// `"Security Clearance"` → `"security_clearance"`.
pub fn slugify(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

fn enabled(table: Vec<(bool, FieldSpec)>) -> impl Iterator<Item = FieldSpec> {
    table.into_iter().filter(|(on, _)| *on).map(|(_, spec)| spec)
}

fn custom_resume_fields(fields: &[CustomField]) -> impl Iterator<Item = FieldSpec> + '_ {
    fields
        .iter()
        .filter(|f| !f.name.trim().is_empty())
        .map(|f| {
            FieldSpec::custom(
                &f.name,
                f.field_type,
                format!("Extract \"{}\" from the resume", f.name.trim()),
            )
        })
}

fn custom_analysis_fields(
    fields: &[CustomAnalysisField],
) -> impl Iterator<Item = FieldSpec> + '_ {
    fields
        .iter()
        .filter(|f| !f.name.trim().is_empty())
        .map(|f| {
            let instruction = f
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from)
                .unwrap_or_else(|| format!("Assess \"{}\" for this candidate", f.name.trim()));
            FieldSpec::custom(&f.name, f.field_type, instruction)
        })
}

// ── Section tables ──────────────────────────────────────────────────────────

pub fn personal_info_fields(selection: &ResumeFieldsSelection) -> Vec<FieldSpec> {
    let contact = selection.contact_information;
    enabled(vec![
        (true, FieldSpec::text("fullName", "John Smith", "Candidate's full name")),
        (contact, FieldSpec::text("email", "john.smith@example.com", "Primary email address")),
        (contact, FieldSpec::text("phone", "+1 (555) 123-4567", "Primary phone number")),
        (contact, FieldSpec::text("address", "Toronto, ON, Canada", "City / region / country as written")),
        (contact, FieldSpec::text("linkedin", "https://www.linkedin.com/in/johnsmith", "LinkedIn profile URL")),
        (contact, FieldSpec::text("github", "https://github.com/johnsmith", "GitHub profile URL")),
        (contact, FieldSpec::text("website", "https://johnsmith.dev", "Personal website or portfolio URL")),
        (
            selection.professional_summary,
            FieldSpec::text(
                "summary",
                "Backend engineer with 6 years building payment systems in Rust and Go.",
                "Professional summary or objective, condensed to 2-3 sentences",
            ),
        ),
    ])
    .collect()
}

pub fn education_fields(selection: &ResumeFieldsSelection) -> Vec<FieldSpec> {
    enabled(vec![
        (
            selection.education,
            FieldSpec::list(
                "education",
                json!([{
                    "degree": "B.Sc. Computer Science",
                    "institution": "University of Toronto",
                    "location": "Toronto, ON",
                    "startDate": "2014",
                    "endDate": "2018",
                    "gpa": "3.8"
                }]),
                "Every degree, diploma or academic program, most recent first",
            ),
        ),
        (
            selection.certifications,
            FieldSpec::list(
                "certifications",
                json!([{
                    "name": "AWS Certified Solutions Architect",
                    "issuer": "Amazon Web Services",
                    "date": "2022"
                }]),
                "Professional certifications and licenses",
            ),
        ),
    ])
    .collect()
}

pub fn work_experience_fields(selection: &ResumeFieldsSelection) -> Vec<FieldSpec> {
    enabled(vec![
        (
            selection.work_experience,
            FieldSpec::list(
                "workExperience",
                json!([{
                    "company": "Acme Corp",
                    "title": "Senior Software Engineer",
                    "location": "Remote",
                    "startDate": "2020-03",
                    "endDate": "Present",
                    "description": "Led the payments platform team.",
                    "achievements": ["Cut checkout latency by 40%"]
                }]),
                "Every position held, most recent first; keep achievements verbatim where possible",
            ),
        ),
        (
            selection.projects,
            FieldSpec::list(
                "projects",
                json!([{
                    "name": "ledger-rs",
                    "description": "Double-entry accounting library",
                    "technologies": ["Rust", "PostgreSQL"],
                    "url": "https://github.com/johnsmith/ledger-rs"
                }]),
                "Personal, academic or open-source projects",
            ),
        ),
    ])
    .collect()
}

pub fn additional_fields(selection: &ResumeFieldsSelection) -> Vec<FieldSpec> {
    enabled(vec![
        (
            selection.skills,
            FieldSpec::list(
                "skills",
                json!(["Rust", "PostgreSQL", "Kubernetes", "Team leadership"]),
                "Technical and soft skills mentioned anywhere in the resume",
            ),
        ),
        (
            selection.languages,
            FieldSpec::list(
                "languages",
                json!([{"language": "English", "proficiency": "Native"}]),
                "Spoken languages with proficiency when stated",
            ),
        ),
        (
            selection.awards,
            FieldSpec::list(
                "awards",
                json!([{"title": "Engineer of the Year", "issuer": "Acme Corp", "date": "2021"}]),
                "Awards, honors and scholarships",
            ),
        ),
        (
            selection.publications,
            FieldSpec::list(
                "publications",
                json!([{"title": "Scaling Ledgers", "venue": "RustConf", "date": "2023"}]),
                "Papers, articles, talks and books",
            ),
        ),
        (
            selection.volunteer_experience,
            FieldSpec::list(
                "volunteerExperience",
                json!([{"organization": "Code Club", "role": "Mentor", "startDate": "2019", "endDate": "2021"}]),
                "Volunteer roles and community work",
            ),
        ),
    ])
    .chain(custom_resume_fields(&selection.custom_fields))
    .collect()
}

pub fn output_fields(selection: &OutputFieldsSelection) -> Vec<FieldSpec> {
    enabled(vec![
        (selection.full_name, FieldSpec::text("fullName", "John Smith", "Candidate's full name")),
        (
            selection.current_role,
            FieldSpec::text("currentRole", "Senior Software Engineer at Acme Corp", "Most recent job title and employer"),
        ),
        (
            selection.overall_score,
            FieldSpec::score("overallScore", 8, "Overall match for this job, integer from 1 (poor) to 10 (excellent)"),
        ),
        (
            selection.skills_match,
            FieldSpec::score("skillsMatch", 7, "How well the candidate's skills cover the requirements, 1-10"),
        ),
        (
            selection.experience_match,
            FieldSpec::score("experienceMatch", 8, "How well the candidate's experience fits the role, 1-10"),
        ),
        (
            selection.education_match,
            FieldSpec::score("educationMatch", 6, "How well the candidate's education fits the role, 1-10"),
        ),
        (
            selection.summary,
            FieldSpec::text(
                "summary",
                "Strong backend engineer with directly relevant payments experience.",
                "2-3 sentence assessment of fit",
            ),
        ),
        (
            selection.strengths,
            FieldSpec::list("strengths", json!(["6 years of Rust", "Led a team of 5"]), "Key strengths relative to the job"),
        ),
        (
            selection.weaknesses,
            FieldSpec::list("weaknesses", json!(["No Kubernetes experience"]), "Gaps relative to the job"),
        ),
        (
            selection.recommendations,
            FieldSpec::text(
                "recommendations",
                "Advance to technical interview; probe infrastructure depth.",
                "Hiring recommendation and next steps",
            ),
        ),
    ])
    .chain(custom_analysis_fields(&selection.custom_fields))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Security Clearance"), "security_clearance");
        assert_eq!(slugify("  Years  of Rust "), "years_of_rust");
        assert_eq!(slugify("GPA"), "gpa");
    }

    #[test]
    fn test_additional_fields_follow_toggles_and_custom_fields() {
        let selection = ResumeFieldsSelection {
            skills: true,
            languages: false,
            awards: false,
            publications: true,
            volunteer_experience: false,
            custom_fields: vec![
                CustomField {
                    name: "Security Clearance".into(),
                    field_type: FieldType::Text,
                },
                CustomField {
                    name: "Open Source Repos".into(),
                    field_type: FieldType::List,
                },
            ],
            ..Default::default()
        };

        let schema = SectionSchema::build(&additional_fields(&selection));
        let keys: Vec<_> = schema
            .instructions
            .iter()
            .filter_map(|line| line.strip_prefix("- "))
            .filter_map(|line| line.split(':').next())
            .collect();
        assert_eq!(
            keys,
            vec!["skills", "publications", "security_clearance", "open_source_repos"]
        );
        assert_eq!(schema.skeleton.len(), 4);
        assert_eq!(schema.fallback["skills"], json!([]));
        assert_eq!(schema.fallback["security_clearance"], json!("N/A"));
        assert_eq!(schema.fallback["open_source_repos"], json!([]));
        assert_eq!(schema.instructions.len(), 4);
    }

    #[test]
    fn test_all_additional_toggles_off_gives_empty_schema() {
        let selection = ResumeFieldsSelection {
            skills: false,
            languages: false,
            awards: false,
            publications: false,
            volunteer_experience: false,
            ..Default::default()
        };
        assert!(SectionSchema::build(&additional_fields(&selection)).is_empty());
    }

    #[test]
    fn test_personal_info_always_asks_for_name() {
        let selection = ResumeFieldsSelection {
            contact_information: false,
            professional_summary: false,
            ..Default::default()
        };
        let schema = SectionSchema::build(&personal_info_fields(&selection));
        assert_eq!(schema.skeleton.keys().collect::<Vec<_>>(), vec!["fullName"]);
    }

    #[test]
    fn test_output_schema_includes_custom_analysis_fields() {
        let selection = OutputFieldsSelection {
            weaknesses: false,
            custom_fields: vec![CustomAnalysisField {
                name: "Culture Fit".into(),
                field_type: FieldType::Number,
                description: Some("Fit with a small remote team, 1-10".into()),
            }],
            ..Default::default()
        };
        let schema = SectionSchema::build(&output_fields(&selection));
        assert!(!schema.skeleton.contains_key("weaknesses"));
        assert_eq!(schema.skeleton["culture_fit"], json!(0));
        assert!(schema
            .instructions_text()
            .contains("- culture_fit: Fit with a small remote team, 1-10"));
        assert_eq!(schema.skeleton["overallScore"], json!(8));
    }

    #[test]
    fn test_default_sections_fallbacks() {
        let selection = ResumeFieldsSelection::default();
        let education = SectionSchema::build(&education_fields(&selection));
        assert_eq!(
            education.fallback_value(),
            json!({"education": [], "certifications": []})
        );
        let work = SectionSchema::build(&work_experience_fields(&selection));
        assert_eq!(
            work.fallback_value(),
            json!({"workExperience": [], "projects": []})
        );
    }
}
