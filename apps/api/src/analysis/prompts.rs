//! Prompt construction for resume feedback.

/// JSON shape the model must return. Kept in lockstep with
/// `models::feedback::Feedback`.
const FEEDBACK_FORMAT: &str = r#"{
  "overallScore": number (0-100),
  "ATS": {"score": number (0-100), "tips": [{"type": "good" | "improve", "tip": string}]},
  "toneAndStyle": {"score": number (0-100), "tips": [{"type": "good" | "improve", "tip": string, "explanation": string}]},
  "content": {"score": number (0-100), "tips": [{"type": "good" | "improve", "tip": string, "explanation": string}]},
  "structure": {"score": number (0-100), "tips": [{"type": "good" | "improve", "tip": string, "explanation": string}]},
  "skills": {"score": number (0-100), "tips": [{"type": "good" | "improve", "tip": string, "explanation": string}]}
}"#;

/// Builds the analysis instructions from the user's job context. Pure
/// formatting; absent fields simply interpolate as empty strings.
pub fn prepare_instructions(job_title: &str, job_description: &str) -> String {
    format!(
        "Analyze and rate this resume, and suggest how to improve it.\n\
         Be thorough and detailed; do not hesitate to point out mistakes or give \
         low scores if the resume deserves them. That is what helps the user improve.\n\
         If a job title or job description is provided, take it into account.\n\
         The job title is: {job_title}\n\
         The job description is: {job_description}\n\
         Provide the feedback using the following JSON format:\n{FEEDBACK_FORMAT}\n\
         Return the analysis as a JSON object only, with no other text."
    )
}
