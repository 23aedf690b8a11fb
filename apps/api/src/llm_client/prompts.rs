// Cross-cutting prompt fragments. Prompt templates that belong to one
// service live in that service's own prompts.rs (see analysis/prompts.rs).

/// System prompt for resume feedback calls. Enforces JSON-only output so the
/// response text parses directly into the `Feedback` model.
pub const FEEDBACK_SYSTEM: &str = "You are an expert in ATS (Applicant Tracking \
    System) screening and resume review. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies outside the JSON.";
