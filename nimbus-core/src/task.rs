//! Task model shared by the store, the enrichment pipeline, and the CLI.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
}

/// AI-derived metadata embedded in every task.
///
/// `sentiment` and `language_code` are always present; `category` and
/// `urgency` are optional on the type but the canonical enrichment pipeline
/// (remote or local fallback) always fills them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiMetadata {
    pub sentiment: Sentiment,

    /// Display name, e.g. "English".
    pub language: String,

    /// ISO-639-1-like 2-letter code.
    pub language_code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(rename = "urgencyLevel", skip_serializing_if = "Option::is_none")]
    pub urgency: Option<UrgencyLevel>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_reminder_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_reminder_text: Option<String>,
}

impl Default for AiMetadata {
    fn default() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            language: "English".to_string(),
            language_code: "en".to_string(),
            category: None,
            urgency: None,
            audio_reminder_url: None,
            audio_reminder_text: None,
        }
    }
}

/// Core task type.
///
/// Created once by the enrichment orchestrator after analysis settles, then
/// owned exclusively by the [`TaskStore`](crate::TaskStore). Status is the
/// only field mutated afterwards, and only through the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,

    pub status: TaskStatus,

    /// Calendar date the task is due.
    pub due_date: NaiveDate,

    pub created_at: DateTime<Utc>,
    /// Bumped on every mutation; always >= `created_at`.
    pub updated_at: DateTime<Utc>,

    pub has_attachment: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,

    #[serde(rename = "aiMetadata")]
    pub ai: AiMetadata,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        due_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            status: TaskStatus::Active,
            due_date,
            created_at: now,
            updated_at: now,
            has_attachment: false,
            attachment_url: None,
            ai: AiMetadata::default(),
        }
    }

    pub fn with_ai(mut self, ai: AiMetadata) -> Self {
        self.ai = ai;
        self
    }
}

/// Raw input to task creation, before enrichment runs.
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    /// 2-letter code the user forced in the form; empty/absent means auto.
    pub force_language: Option<String>,
    pub attachment: Option<AttachmentDraft>,
}

/// A file the user attached at creation time, fed to the attachment pipeline.
#[derive(Debug, Clone)]
pub struct AttachmentDraft {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Generate a creation-time task id.
///
/// Millisecond timestamps are unique enough in practice for a single-user,
/// single-process tracker; collision handling is a non-goal.
pub fn generate_task_id() -> String {
    Utc::now().timestamp_millis().to_string()
}
