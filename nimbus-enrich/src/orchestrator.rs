//! Drives task creation: remote analysis with a deterministic local fallback.
//!
//! Task creation never fails because enrichment failed. When the remote
//! analyzer errors or times out, metadata comes from the keyword heuristics
//! and the caller is told which path was taken so the UI can show a
//! non-fatal warning. No partial task is ever visible to the store.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use nimbus_core::classify;
use nimbus_core::store::{StoreError, TaskStore};
use nimbus_core::task::{AiMetadata, Sentiment, Task, TaskDraft, generate_task_id};

use crate::client::{AiInsights, EnrichmentClient};
use crate::error::EnrichError;

/// Seam over the remote analyzer so the fallback path is testable offline.
#[async_trait]
pub trait TextAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<AiInsights, EnrichError>;
}

#[async_trait]
impl TextAnalyzer for EnrichmentClient {
    async fn analyze(&self, text: &str) -> Result<AiInsights, EnrichError> {
        EnrichmentClient::analyze(self, text).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentPath {
    Remote,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct CreationOutcome {
    pub task: Task,
    pub path: EnrichmentPath,
}

pub struct TaskEnrichmentOrchestrator<A> {
    analyzer: A,
    store: Arc<TaskStore>,
}

impl<A: TextAnalyzer> TaskEnrichmentOrchestrator<A> {
    pub fn new(analyzer: A, store: Arc<TaskStore>) -> Self {
        Self { analyzer, store }
    }

    /// Create a task with a fresh id.
    pub async fn create_task(&self, draft: TaskDraft) -> Result<CreationOutcome, StoreError> {
        self.create_task_with_id(generate_task_id(), draft).await
    }

    /// Create a task under a caller-chosen id.
    ///
    /// Used when the attachment pipeline runs concurrently for the same
    /// creation event and needs the id before the task exists.
    pub async fn create_task_with_id(
        &self,
        id: String,
        draft: TaskDraft,
    ) -> Result<CreationOutcome, StoreError> {
        let text = format!("{} {}", draft.title, draft.description);

        let (ai, path) = match self.analyzer.analyze(&text).await {
            Ok(insights) => {
                info!(task_id = %id, "remote analysis succeeded");
                (metadata_from_insights(insights), EnrichmentPath::Remote)
            }
            Err(err) => {
                warn!(task_id = %id, %err, "remote analysis unavailable, using local heuristics");
                (fallback_metadata(&draft), EnrichmentPath::Fallback)
            }
        };

        let mut task = Task::new(id, &draft.title, &draft.description, draft.due_date).with_ai(ai);
        task.has_attachment = draft.attachment.is_some();

        self.store.add(task.clone())?;
        Ok(CreationOutcome { task, path })
    }
}

fn metadata_from_insights(insights: AiInsights) -> AiMetadata {
    AiMetadata {
        sentiment: insights.sentiment,
        language: insights.language,
        language_code: insights.language_code,
        category: insights.category,
        urgency: insights.urgency,
        audio_reminder_url: None,
        audio_reminder_text: None,
    }
}

/// Fully-populated metadata from the local heuristics: neutral sentiment,
/// keyword category/urgency, user-forced language or English.
fn fallback_metadata(draft: &TaskDraft) -> AiMetadata {
    let text = format!("{} {}", draft.title, draft.description);
    let code = draft
        .force_language
        .clone()
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "en".to_string());
    AiMetadata {
        sentiment: Sentiment::Neutral,
        language: classify::language_name(&code).to_string(),
        language_code: code,
        category: Some(classify::category(&text).to_string()),
        urgency: Some(classify::urgency(&text)),
        audio_reminder_url: None,
        audio_reminder_text: None,
    }
}
