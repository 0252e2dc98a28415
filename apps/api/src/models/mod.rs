pub mod job;
pub mod resume;
pub mod selection;

pub use job::{AnalysisJob, AnalysisRecord, JobStatus, JobSummary, NewJob, RecordStatus};
pub use resume::{
    EducationInfo, ExtractedResumeData, PersonalInfo, PriorExtraction, ResumeInput,
    StructuredData, WorkExperienceInfo,
};
pub use selection::{
    CustomAnalysisField, CustomField, FieldType, JobDetails, OutputFieldsSelection,
    ResumeFieldsSelection,
};
