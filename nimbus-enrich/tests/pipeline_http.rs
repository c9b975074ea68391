//! HTTP-level tests for the enrichment client and attachment pipeline,
//! against a wiremock server standing in for the remote backend.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nimbus_core::TaskStore;
use nimbus_core::task::{AttachmentDraft, Sentiment, TaskDraft, UrgencyLevel};
use nimbus_enrich::{
    AttachmentError, AttachmentPipeline, EnrichError, EnrichmentClient, EnrichmentPath,
    TaskEnrichmentOrchestrator,
};

fn draft(title: &str, description: &str) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        description: description.to_string(),
        due_date: chrono::NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
        force_language: None,
        attachment: None,
    }
}

fn attachment() -> AttachmentDraft {
    AttachmentDraft {
        file_name: "photo.jpg".to_string(),
        content_type: "image/jpeg".to_string(),
        bytes: vec![0xff, 0xd8, 0xff, 0xe0],
    }
}

#[tokio::test]
async fn analyze_success_enriches_task_remotely() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ai/analyze"))
        .and(body_json(json!({"text": "Finish report for the project"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sentiment": "POSITIVE",
            "language": "English",
            "languageCode": "en",
            "category": "work",
            "urgencyLevel": "medium",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(TaskStore::new());
    let client = EnrichmentClient::new(server.uri());
    let orch = TaskEnrichmentOrchestrator::new(client, store.clone());

    let out = orch
        .create_task(draft("Finish report", "for the project"))
        .await
        .unwrap();

    assert_eq!(out.path, EnrichmentPath::Remote);
    assert_eq!(out.task.ai.sentiment, Sentiment::Positive);
    assert_eq!(out.task.ai.category.as_deref(), Some("work"));
    assert_eq!(out.task.ai.urgency, Some(UrgencyLevel::Medium));
    assert_eq!(store.tasks()[0], out.task);
}

#[tokio::test]
async fn analyze_nested_sentiment_envelope_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ai/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "body": "{\"sentiment\":{\"Sentiment\":\"MIXED\"}}"
        })))
        .mount(&server)
        .await;

    let client = EnrichmentClient::new(server.uri());
    let insights = client.analyze("whatever").await.unwrap();
    assert_eq!(insights.sentiment, Sentiment::Neutral);
}

#[tokio::test]
async fn analyze_server_error_triggers_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ai/analyze"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = Arc::new(TaskStore::new());
    let client = EnrichmentClient::new(server.uri());
    let orch = TaskEnrichmentOrchestrator::new(client, store.clone());

    let out = orch
        .create_task(draft("buy milk", "at the store soon"))
        .await
        .unwrap();

    assert_eq!(out.path, EnrichmentPath::Fallback);
    assert_eq!(out.task.ai.sentiment, Sentiment::Neutral);
    assert_eq!(out.task.ai.category.as_deref(), Some("shopping"));
    assert_eq!(out.task.ai.urgency, Some(UrgencyLevel::Medium));
    assert_eq!(store.tasks().len(), 1);
}

#[tokio::test]
async fn analyze_timeout_triggers_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ai/analyze"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"sentiment": "POSITIVE"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let store = Arc::new(TaskStore::new());
    let client = EnrichmentClient::with_timeout(server.uri(), Duration::from_millis(100));
    let orch = TaskEnrichmentOrchestrator::new(client, store.clone());

    let out = orch.create_task(draft("walk", "in the park")).await.unwrap();

    assert_eq!(out.path, EnrichmentPath::Fallback);
    assert_eq!(out.task.ai.category.as_deref(), Some("personal"));
    assert_eq!(store.tasks().len(), 1);
}

#[tokio::test]
async fn timeout_bound_covers_the_whole_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ai/analyze"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"sentiment": "POSITIVE"}))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let client = EnrichmentClient::with_timeout(server.uri(), Duration::from_millis(100));
    let start = std::time::Instant::now();
    let err = client.analyze("slow").await.unwrap_err();

    assert!(matches!(err, EnrichError::Unavailable(_)));
    // one window for send plus body read; the bound must not stack per phase
    assert!(
        start.elapsed() < Duration::from_millis(1500),
        "call took {:?}, expected a single bounded window",
        start.elapsed()
    );
}

#[tokio::test]
async fn credential_stage_timeout_is_bounded_and_distinct() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files/upload-url"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"uploadUrl": "u", "fields": {}, "fileUrl": "f"}))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let pipeline = AttachmentPipeline::with_timeout(server.uri(), Duration::from_millis(100));
    let start = std::time::Instant::now();
    let err = pipeline.run("task-1", &attachment()).await.unwrap_err();

    assert!(matches!(err, AttachmentError::InvalidUploadResponse(_)));
    assert!(
        start.elapsed() < Duration::from_millis(1500),
        "stage took {:?}, expected a single bounded window",
        start.elapsed()
    );
}

#[tokio::test]
async fn translate_returns_text_and_surfaces_unavailability() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ai/translate"))
        .and(body_json(json!({"text": "Hello", "targetLanguage": "es"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"translatedText": "Hola"})),
        )
        .mount(&server)
        .await;

    let client = EnrichmentClient::new(server.uri());
    assert_eq!(client.translate("Hello", "es").await.unwrap(), "Hola");

    // no /ai/polly mock mounted: wiremock answers 404
    let err = client.synthesize_speech("Hello", "en").await.unwrap_err();
    assert!(matches!(err, EnrichError::Unavailable(_)));
}

#[tokio::test]
async fn attachment_pipeline_happy_path() {
    let server = MockServer::start().await;

    let upload_url = format!("{}/upload", server.uri());
    let grant_body = json!({
        "uploadUrl": upload_url,
        "fields": {"key": "uploads/photo.jpg", "policy": "p", "x-amz-signature": "s"},
        "fileUrl": "https://my-bucket.s3.amazonaws.com/uploads/photo.jpg",
    });
    Mock::given(method("POST"))
        .and(path("/files/upload-url"))
        .respond_with(
            // string-encoded envelope, the worst of the two historic shapes
            ResponseTemplate::new(200).set_body_json(json!({"body": grant_body.to_string()})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/ai/image-analyze"))
        .and(body_json(json!({"bucket": "my-bucket", "key": "uploads/photo.jpg"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "body": "{\"labels\":[{\"Name\":\"Car\",\"Confidence\":\"98.20%\"},{\"Name\":\"Vehicle\",\"Confidence\":\"95.11%\"}]}"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = AttachmentPipeline::new(server.uri());
    let out = pipeline.run("task-1", &attachment()).await.unwrap();

    assert_eq!(out.file_url, "https://my-bucket.s3.amazonaws.com/uploads/photo.jpg");
    assert_eq!(out.labels.len(), 2);
    assert_eq!(out.labels[0].name, "Car");
    assert_eq!(out.labels[0].confidence, "98.20%");
}

#[tokio::test]
async fn upload_form_sends_presigned_fields_before_the_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files/upload-url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uploadUrl": format!("{}/upload", server.uri()),
            "fields": {"key": "uploads/photo.jpg", "policy": "p", "x-amz-signature": "s"},
            "fileUrl": "https://my-bucket.s3.amazonaws.com/uploads/photo.jpg",
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ai/image-analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"labels": []})))
        .mount(&server)
        .await;

    let pipeline = AttachmentPipeline::new(server.uri());
    pipeline.run("task-1", &attachment()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let upload = requests
        .iter()
        .find(|r| r.url.path() == "/upload")
        .expect("upload request was sent");
    let body = String::from_utf8_lossy(&upload.body);

    let pos = |needle: &str| {
        body.find(needle)
            .unwrap_or_else(|| panic!("form body missing {needle}"))
    };
    assert!(pos("name=\"key\"") < pos("name=\"policy\""));
    assert!(pos("name=\"policy\"") < pos("name=\"x-amz-signature\""));
    assert!(pos("name=\"x-amz-signature\"") < pos("name=\"file\""));

    // the file part is the last part in the form
    let last_part = body.rfind("form-data; name=\"").expect("form has parts");
    assert!(body[last_part..].starts_with("form-data; name=\"file\""));
}

#[tokio::test]
async fn credential_failure_stops_before_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files/upload-url"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let pipeline = AttachmentPipeline::new(server.uri());
    let err = pipeline.run("task-1", &attachment()).await.unwrap_err();
    assert!(matches!(err, AttachmentError::InvalidUploadResponse(_)));
}

#[tokio::test]
async fn storage_rejection_is_upload_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files/upload-url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uploadUrl": format!("{}/upload", server.uri()),
            "fields": {},
            "fileUrl": "https://my-bucket.s3.amazonaws.com/k.jpg",
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ai/image-analyze"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let pipeline = AttachmentPipeline::new(server.uri());
    let err = pipeline.run("task-1", &attachment()).await.unwrap_err();
    assert!(matches!(err, AttachmentError::UploadFailed(_)));
}

#[tokio::test]
async fn unparseable_file_url_skips_label_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files/upload-url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uploadUrl": format!("{}/upload", server.uri()),
            "fields": {},
            "fileUrl": "https://cdn.example.com/k.jpg",
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ai/image-analyze"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let pipeline = AttachmentPipeline::new(server.uri());
    let err = pipeline.run("task-1", &attachment()).await.unwrap_err();
    assert!(matches!(err, AttachmentError::LocatorUnparseable(_)));
}

#[tokio::test]
async fn bad_label_body_is_invalid_label_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files/upload-url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uploadUrl": format!("{}/upload", server.uri()),
            "fields": {},
            "fileUrl": "https://my-bucket.s3.amazonaws.com/k.jpg",
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ai/image-analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"body": "not json"})))
        .mount(&server)
        .await;

    let pipeline = AttachmentPipeline::new(server.uri());
    let err = pipeline.run("task-1", &attachment()).await.unwrap_err();
    assert!(matches!(err, AttachmentError::InvalidLabelResponse(_)));
}

#[tokio::test]
async fn creation_and_attachment_run_concurrently() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ai/analyze"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/files/upload-url"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = Arc::new(TaskStore::new());
    let client = EnrichmentClient::new(server.uri());
    let orch = TaskEnrichmentOrchestrator::new(client, store.clone());
    let pipeline = AttachmentPipeline::new(server.uri());

    let task_id = "concurrent-1".to_string();
    let mut d = draft("photo task", "with an image");
    d.attachment = Some(attachment());
    let att = d.attachment.clone().unwrap();

    let (created, uploaded) = tokio::join!(
        orch.create_task_with_id(task_id.clone(), d),
        pipeline.run(&task_id, &att),
    );

    // attachment failure never blocks task creation
    let out = created.unwrap();
    assert!(uploaded.is_err());
    assert!(out.task.has_attachment);
    assert_eq!(store.tasks()[0].id, "concurrent-1");
}
