//! The persisted unit of the service: one uploaded resume, its preview image,
//! the user's job context, and (once analysis completes) its feedback.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::models::feedback::Feedback;

/// Record-store key prefix. Every record lives under `resume-{id}`.
const KEY_PREFIX: &str = "resume-";

/// Generates a fresh record identifier. Random 128-bit, collision-free for
/// any realistic store lifetime.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn record_key(id: &str) -> String {
    format!("{KEY_PREFIX}{id}")
}

pub fn key_prefix() -> &'static str {
    KEY_PREFIX
}

/// A persisted resume record.
///
/// `feedback` is `None` while the analysis pipeline is in flight or after it
/// failed past the partial persist; callers must treat such a record as
/// incomplete, never as a finished analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRecord {
    pub id: String,
    pub resume_path: String,
    pub image_path: String,
    #[serde(default)]
    pub values: HashMap<String, String>,
    #[serde(default, deserialize_with = "deserialize_feedback")]
    pub feedback: Option<Feedback>,
    pub created_at: DateTime<Utc>,
}

impl ResumeRecord {
    /// Assembles a partial record: identifier assigned, blobs uploaded,
    /// feedback still absent.
    pub fn partial(
        id: String,
        resume_path: String,
        image_path: String,
        values: HashMap<String, String>,
    ) -> Self {
        Self {
            id,
            resume_path,
            image_path,
            values,
            feedback: None,
            created_at: Utc::now(),
        }
    }

    pub fn key(&self) -> String {
        record_key(&self.id)
    }

    pub fn is_complete(&self) -> bool {
        self.feedback.is_some()
    }

    /// Attaches feedback exactly once. A record that already carries feedback
    /// keeps it; feedback is never reset or replaced.
    pub fn attach_feedback(&mut self, feedback: Feedback) {
        if self.feedback.is_none() {
            self.feedback = Some(feedback);
        }
    }
}

/// Accepts the structured feedback object, `null`, or the legacy empty string
/// that the original front-end stored before analysis completed.
fn deserialize_feedback<'de, D>(deserializer: D) -> Result<Option<Feedback>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) if s.is_empty() => Ok(None),
        Some(other) => Feedback::deserialize(other)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
