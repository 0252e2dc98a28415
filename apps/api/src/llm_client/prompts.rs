// Shared prompt fragments.
// Each module that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting fragments appended to those prompts.

/// Output contract appended to every prompt that expects structured data.
pub const JSON_ONLY_INSTRUCTION: &str = "\
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies. \
    Use double quotes for every key and string value.";

/// Extraction must stay inside the source document.
pub const NO_INVENTION_INSTRUCTION: &str = "\
    CRITICAL: Only report information that is explicitly present in the resume text. \
    Do NOT infer, interpolate, or invent details. \
    Use \"N/A\" for missing text values and [] for missing lists.";
