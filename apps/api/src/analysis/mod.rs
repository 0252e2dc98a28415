// Resume analysis pipeline: section extraction, contact enrichment, scoring.
// All model calls go through llm_client and every model reply through
// normalizer. Retries wrap one invoke + normalize unit.

pub mod contacts;
pub mod extractors;
pub mod fields;
pub mod normalizer;
pub mod prompts;
pub mod retry;
pub mod synthesizer;

pub use extractors::extract_sections;
pub use normalizer::{normalize, normalize_into};
pub use retry::{execute_with_retry, MAX_ATTEMPTS};
pub use synthesizer::{synthesize, SynthesisInput};
