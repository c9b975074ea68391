//! nimbus-core: domain types and pure logic for the Nimbus task tracker.
//!
//! Everything here is offline: the task model, the reactive in-memory store,
//! the keyword fallback classifier, and the storage-URL locator parser. The
//! network side lives in `nimbus-enrich`.

pub mod classify;
pub mod locator;
pub mod store;
pub mod task;

pub use locator::UploadLocator;
pub use store::{StoreError, Subscription, TaskStore};
pub use task::{
    AiMetadata, AttachmentDraft, Sentiment, Task, TaskDraft, TaskStatus, UrgencyLevel,
    generate_task_id,
};
