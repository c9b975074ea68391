//! Thin adapter around the remote text-analysis, translation, speech, and
//! language-detection endpoints.
//!
//! Every call shares one bounded timeout. The observed backend only bounded
//! `analyze`, leaving the rest potentially unbounded; that inconsistency was
//! a latent defect, so the bound applies uniformly here.

use std::time::Duration;

use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use nimbus_core::task::{Sentiment, UrgencyLevel};

use crate::envelope::unwrap_body;
use crate::error::EnrichError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// What the remote analysis endpoint derives from task text.
#[derive(Debug, Clone, PartialEq)]
pub struct AiInsights {
    pub sentiment: Sentiment,
    pub language: String,
    pub language_code: String,
    pub category: Option<String>,
    pub urgency: Option<UrgencyLevel>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LanguageGuess {
    pub language: String,
    pub language_code: String,
    pub confidence: f64,
}

pub struct EnrichmentClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl EnrichmentClient {
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

    /// Analyze task text. Never returns partial data: timeout or transport
    /// failure is [`EnrichError::Unavailable`] and the caller falls back.
    pub async fn analyze(&self, text: &str) -> Result<AiInsights, EnrichError> {
        let value = self.post_json("/ai/analyze", &json!({ "text": text })).await?;
        Ok(parse_insights(&value))
    }

    pub async fn translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<String, EnrichError> {
        let value = self
            .post_json(
                "/ai/translate",
                &json!({ "text": text, "targetLanguage": target_language }),
            )
            .await?;
        require_str(&value, "translatedText")
    }

    pub async fn synthesize_speech(
        &self,
        text: &str,
        language: &str,
    ) -> Result<String, EnrichError> {
        let value = self
            .post_json("/ai/polly", &json!({ "text": text, "language": language }))
            .await?;
        require_str(&value, "audioUrl")
    }

    pub async fn detect_language(&self, text: &str) -> Result<LanguageGuess, EnrichError> {
        let value = self
            .post_json("/ai/detect-language", &json!({ "text": text }))
            .await?;
        Ok(LanguageGuess {
            language: require_str(&value, "language")?,
            language_code: require_str(&value, "languageCode")?,
            confidence: value
                .get("confidence")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
        })
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, EnrichError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "enrichment request");

        // One window covers send plus body read; the bound is on the whole
        // call, not per phase.
        let exchange = async {
            let resp = self
                .http
                .post(&url)
                .json(body)
                .send()
                .await
                .map_err(|e| EnrichError::Unavailable(format!("{path}: {e}")))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(EnrichError::Unavailable(format!("{path} returned {status}")));
            }
            resp.json::<Value>()
                .await
                .map_err(|e| EnrichError::BadResponse(format!("{path}: {e}")))
        };
        let raw = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                EnrichError::Unavailable(format!("{path} timed out after {:?}", self.timeout))
            })??;

        unwrap_body(raw).map_err(|e| EnrichError::BadResponse(format!("{path}: {e}")))
    }
}

fn require_str(value: &Value, field: &str) -> Result<String, EnrichError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| EnrichError::BadResponse(format!("missing {field}")))
}

fn parse_insights(value: &Value) -> AiInsights {
    AiInsights {
        sentiment: parse_sentiment(value.get("sentiment")),
        language: value
            .get("language")
            .and_then(Value::as_str)
            .unwrap_or("English")
            .to_string(),
        language_code: value
            .get("languageCode")
            .and_then(Value::as_str)
            .unwrap_or("en")
            .to_string(),
        category: value
            .get("category")
            .and_then(Value::as_str)
            .map(str::to_string),
        urgency: value
            .get("urgencyLevel")
            .and_then(Value::as_str)
            .and_then(parse_urgency),
    }
}

/// The backend reports sentiment either as a raw string field or nested
/// under `sentiment.Sentiment`. MIXED and anything unrecognized collapse
/// to neutral.
fn parse_sentiment(value: Option<&Value>) -> Sentiment {
    let raw = match value {
        Some(Value::String(s)) => s.as_str(),
        Some(Value::Object(map)) => map
            .get("Sentiment")
            .and_then(Value::as_str)
            .unwrap_or_default(),
        _ => "",
    };
    match raw.to_ascii_uppercase().as_str() {
        "POSITIVE" => Sentiment::Positive,
        "NEGATIVE" => Sentiment::Negative,
        _ => Sentiment::Neutral,
    }
}

fn parse_urgency(raw: &str) -> Option<UrgencyLevel> {
    match raw.to_ascii_lowercase().as_str() {
        "low" => Some(UrgencyLevel::Low),
        "medium" => Some(UrgencyLevel::Medium),
        "high" => Some(UrgencyLevel::High),
        _ => None,
    }
}
