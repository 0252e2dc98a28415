// All LLM prompt constants for the Analysis module.
// Templates use `{placeholder}` markers filled with `str::replace` before sending.
// Shared output rules come from llm_client::prompts.

/// Extraction prompt shared by all four section extractors.
/// Replace `{section}`, `{schema}`, `{instructions}`, `{rules}` and `{resume_text}`.
pub const SECTION_EXTRACTION_TEMPLATE: &str = r#"You are an expert resume parser. Extract the {section} from the resume below.

Return a JSON object with this EXACT schema (no extra fields). The values shown are examples only:
{schema}

Field guide:
{instructions}

{rules}

RESUME TEXT:
"""
{resume_text}
"""

Respond with the JSON object only."#;

/// Final scoring prompt.
/// Replace `{job_title}`, `{job_description}`, `{job_requirements}`,
/// `{job_experience}`, `{job_location}`, `{job_salary}`, `{personal_info}`,
/// `{education_info}`, `{work_experience_info}`, `{additional_fields}`,
/// `{raw_text}`, `{schema}`, `{instructions}` and `{json_rule}`.
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"You are a senior technical recruiter evaluating one candidate against one open position.

JOB:
- Title: {job_title}
- Description: {job_description}
- Requirements: {job_requirements}
- Experience: {job_experience}
- Location: {job_location}
- Salary: {job_salary}

CANDIDATE (structured extraction):
Personal information:
{personal_info}

Education:
{education_info}

Work experience:
{work_experience_info}

Additional fields:
{additional_fields}

ORIGINAL RESUME TEXT:
"""
{raw_text}
"""

Evaluation rules:
- The structured sections are the ground truth about the candidate.
- Use the original resume text only to corroborate or fill gaps in the structured data. Never contradict it.
- Scores are integers from 1 (poor match) to 10 (excellent match) for this specific job.
- Be specific: cite concrete evidence from the resume in the summary, strengths and weaknesses.

Return a JSON object with this EXACT schema (no extra fields). The values shown are examples only:
{schema}

Field guide:
{instructions}

{json_rule}"#;

/// Section names as they appear in the extraction prompt.
pub const PERSONAL_INFO_SECTION: &str = "candidate's personal and contact information";
pub const EDUCATION_SECTION: &str = "candidate's education and certifications";
pub const WORK_EXPERIENCE_SECTION: &str = "candidate's work experience and projects";
pub const ADDITIONAL_FIELDS_SECTION: &str = "additional candidate details";
