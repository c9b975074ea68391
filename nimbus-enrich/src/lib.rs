//! nimbus-enrich: the network side of the Nimbus task tracker.
//!
//! Holds the enrichment client (text analysis, translation, speech), the
//! task-creation orchestrator with its local fallback, and the attachment
//! upload-and-label pipeline. Pure domain logic lives in `nimbus-core`.

pub mod attachment;
pub mod client;
pub mod envelope;
pub mod error;
pub mod orchestrator;

pub use attachment::{AttachmentOutcome, AttachmentPipeline, ImageLabel, UploadGrant};
pub use client::{AiInsights, DEFAULT_TIMEOUT, EnrichmentClient, LanguageGuess};
pub use envelope::Payload;
pub use error::{AttachmentError, EnrichError};
pub use orchestrator::{
    CreationOutcome, EnrichmentPath, TaskEnrichmentOrchestrator, TextAnalyzer,
};
