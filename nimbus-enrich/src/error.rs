use thiserror::Error;

/// Failures from the remote text-analysis capabilities.
///
/// `Unavailable` covers timeouts and transport failures; the orchestrator
/// recovers from it locally for `analyze`, while translate/synthesize
/// callers surface it as a non-fatal warning.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("enrichment service unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected enrichment response: {0}")]
    BadResponse(String),
}

/// Stage-distinct failures from the attachment pipeline.
///
/// Each stage fails independently so the UI can tell "upload failed" from
/// "analysis failed" from "could not determine image location". None of
/// these roll back an already-created task.
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("invalid upload credential response: {0}")]
    InvalidUploadResponse(String),

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("could not determine image location from {0}")]
    LocatorUnparseable(String),

    #[error("invalid label response: {0}")]
    InvalidLabelResponse(String),
}
