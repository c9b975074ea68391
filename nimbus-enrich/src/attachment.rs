//! Attachment pipeline: upload handshake, blob upload, image labelling.
//!
//! Three strictly sequential stages; stage N starts only after stage N-1
//! has fully settled. Each stage fails with its own error variant and no
//! stage failure aborts or rolls back task creation.

use std::time::Duration;

use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use nimbus_core::locator;
use nimbus_core::task::AttachmentDraft;

use crate::client::DEFAULT_TIMEOUT;
use crate::envelope::unwrap_body;
use crate::error::AttachmentError;

/// Stage-1 output: where to upload, the presigned fields to echo back, and
/// the eventual public object URL.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadGrant {
    pub upload_url: String,
    /// Presigned form fields. Order matters to some storage backends, so
    /// these keep the order the credential endpoint returned them in.
    pub fields: Map<String, Value>,
    pub file_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageLabel {
    pub name: String,
    pub confidence: String,
}

#[derive(Debug, Clone)]
pub struct AttachmentOutcome {
    pub file_url: String,
    pub labels: Vec<ImageLabel>,
}

pub struct AttachmentPipeline {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl AttachmentPipeline {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: Client::new(),
            base_url,
            timeout,
        }
    }

    /// Run all three stages for one attachment.
    pub async fn run(
        &self,
        task_id: &str,
        attachment: &AttachmentDraft,
    ) -> Result<AttachmentOutcome, AttachmentError> {
        let grant = self.request_credentials(task_id, attachment).await?;
        self.upload(&grant, attachment).await?;
        let labels = self.label_image(&grant.file_url).await?;
        info!(task_id, file_url = %grant.file_url, labels = labels.len(), "attachment pipeline done");
        Ok(AttachmentOutcome {
            file_url: grant.file_url,
            labels,
        })
    }

    /// Stage 1: exchange file metadata for upload credentials.
    async fn request_credentials(
        &self,
        task_id: &str,
        attachment: &AttachmentDraft,
    ) -> Result<UploadGrant, AttachmentError> {
        let url = format!("{}/files/upload-url", self.base_url);
        let body = json!({
            "fileName": attachment.file_name,
            "contentType": attachment.content_type,
            "taskId": task_id,
        });

        let exchange = async {
            let resp = self
                .http
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| AttachmentError::InvalidUploadResponse(e.to_string()))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(AttachmentError::InvalidUploadResponse(format!(
                    "credential endpoint returned {status}"
                )));
            }
            resp.json::<Value>()
                .await
                .map_err(|e| AttachmentError::InvalidUploadResponse(e.to_string()))
        };
        let raw = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                AttachmentError::InvalidUploadResponse("credential request timed out".into())
            })??;
        parse_upload_grant(raw)
    }

    /// Stage 2: multipart POST to the presigned URL. Presigned fields go in
    /// first, in order; the file part must come last.
    async fn upload(
        &self,
        grant: &UploadGrant,
        attachment: &AttachmentDraft,
    ) -> Result<(), AttachmentError> {
        let mut form = Form::new();
        for (name, value) in &grant.fields {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            form = form.text(name.clone(), text);
        }
        let part = Part::bytes(attachment.bytes.clone())
            .file_name(attachment.file_name.clone())
            .mime_str(&attachment.content_type)
            .map_err(|e| AttachmentError::UploadFailed(e.to_string()))?;
        form = form.part("file", part);

        debug!(upload_url = %grant.upload_url, "uploading attachment");
        let exchange = async {
            let resp = self
                .http
                .post(&grant.upload_url)
                .multipart(form)
                .send()
                .await
                .map_err(|e| AttachmentError::UploadFailed(e.to_string()))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(AttachmentError::UploadFailed(format!(
                    "storage returned {status}"
                )));
            }
            Ok(())
        };
        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| AttachmentError::UploadFailed("upload timed out".into()))?
    }

    /// Stage 3: derive the storage locator from the object URL, then request
    /// image labels. Runs only after the upload has completed.
    async fn label_image(&self, file_url: &str) -> Result<Vec<ImageLabel>, AttachmentError> {
        let loc = locator::parse(file_url)
            .ok_or_else(|| AttachmentError::LocatorUnparseable(file_url.to_string()))?;

        let url = format!("{}/ai/image-analyze", self.base_url);
        // wire names are the backend's own: bucket/key
        let body = json!({ "bucket": loc.container, "key": loc.key });

        let exchange = async {
            let resp = self
                .http
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| AttachmentError::InvalidLabelResponse(e.to_string()))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(AttachmentError::InvalidLabelResponse(format!(
                    "label endpoint returned {status}"
                )));
            }
            resp.json::<Value>()
                .await
                .map_err(|e| AttachmentError::InvalidLabelResponse(e.to_string()))
        };
        let raw = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| AttachmentError::InvalidLabelResponse("label request timed out".into()))??;
        parse_label_response(raw)
    }
}

pub(crate) fn parse_upload_grant(raw: Value) -> Result<UploadGrant, AttachmentError> {
    let value =
        unwrap_body(raw).map_err(|e| AttachmentError::InvalidUploadResponse(e.to_string()))?;

    let upload_url = value
        .get("uploadUrl")
        .and_then(Value::as_str)
        .ok_or_else(|| AttachmentError::InvalidUploadResponse("missing uploadUrl".into()))?
        .to_string();
    let file_url = value
        .get("fileUrl")
        .and_then(Value::as_str)
        .ok_or_else(|| AttachmentError::InvalidUploadResponse("missing fileUrl".into()))?
        .to_string();
    let fields = value
        .get("fields")
        .and_then(Value::as_object)
        .ok_or_else(|| AttachmentError::InvalidUploadResponse("missing fields".into()))?
        .clone();

    Ok(UploadGrant {
        upload_url,
        fields,
        file_url,
    })
}

pub(crate) fn parse_label_response(raw: Value) -> Result<Vec<ImageLabel>, AttachmentError> {
    let value =
        unwrap_body(raw).map_err(|e| AttachmentError::InvalidLabelResponse(e.to_string()))?;

    let labels = value
        .get("labels")
        .and_then(Value::as_array)
        .ok_or_else(|| AttachmentError::InvalidLabelResponse("missing labels".into()))?;

    labels
        .iter()
        .map(|label| {
            let name = label
                .get("Name")
                .and_then(Value::as_str)
                .ok_or_else(|| AttachmentError::InvalidLabelResponse("label missing Name".into()))?
                .to_string();
            let confidence = match label.get("Confidence") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => {
                    return Err(AttachmentError::InvalidLabelResponse(
                        "label missing Confidence".into(),
                    ));
                }
            };
            Ok(ImageLabel { name, confidence })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn grant_from_enveloped_string_body() {
        let raw = json!({
            "body": "{\"uploadUrl\":\"u\",\"fields\":{},\"fileUrl\":\"https://b.s3.amazonaws.com/k.jpg\"}"
        });
        let grant = parse_upload_grant(raw).unwrap();
        assert_eq!(grant.upload_url, "u");
        assert!(grant.fields.is_empty());
        assert_eq!(grant.file_url, "https://b.s3.amazonaws.com/k.jpg");
    }

    #[test]
    fn grant_fields_keep_response_order() {
        let raw = json!({
            "uploadUrl": "u",
            "fields": {"key": "k.jpg", "policy": "p", "x-amz-signature": "s"},
            "fileUrl": "f",
        });
        let grant = parse_upload_grant(raw).unwrap();
        let names: Vec<&String> = grant.fields.keys().collect();
        assert_eq!(names, ["key", "policy", "x-amz-signature"]);
    }

    #[test]
    fn grant_missing_any_field_is_invalid() {
        for missing in ["uploadUrl", "fields", "fileUrl"] {
            let mut raw = json!({
                "uploadUrl": "u",
                "fields": {},
                "fileUrl": "f",
            });
            raw.as_object_mut().unwrap().remove(missing);
            assert!(
                matches!(
                    parse_upload_grant(raw),
                    Err(AttachmentError::InvalidUploadResponse(_))
                ),
                "should fail without {missing}"
            );
        }
    }

    #[test]
    fn labels_from_enveloped_string_body() {
        let raw = json!({
            "body": "{\"labels\":[{\"Name\":\"Car\",\"Confidence\":\"98.2\"}]}"
        });
        let labels = parse_label_response(raw).unwrap();
        assert_eq!(
            labels,
            vec![ImageLabel {
                name: "Car".to_string(),
                confidence: "98.2".to_string(),
            }]
        );
    }

    #[test]
    fn label_confidence_accepts_numbers() {
        let raw = json!({"labels": [{"Name": "Dog", "Confidence": 87.5}]});
        let labels = parse_label_response(raw).unwrap();
        assert_eq!(labels[0].confidence, "87.5");
    }

    #[test]
    fn labels_preserve_order() {
        let raw = json!({"labels": [
            {"Name": "Car", "Confidence": "98.2"},
            {"Name": "Wheel", "Confidence": "91.0"},
        ]});
        let labels = parse_label_response(raw).unwrap();
        assert_eq!(labels[0].name, "Car");
        assert_eq!(labels[1].name, "Wheel");
    }

    #[test]
    fn malformed_label_body_is_invalid_not_a_panic() {
        assert!(matches!(
            parse_label_response(json!({"body": "not json"})),
            Err(AttachmentError::InvalidLabelResponse(_))
        ));
        assert!(matches!(
            parse_label_response(json!({"labels": [{"Confidence": "1.0"}]})),
            Err(AttachmentError::InvalidLabelResponse(_))
        ));
    }
}
