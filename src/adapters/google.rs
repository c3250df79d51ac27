//! Google Translate adapter.
//!
//! Uses the public `translate_a/single` endpoint, which answers with a nested
//! JSON array whose first element lists the translated segments.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{Translate, TranslateError};

/// Default endpoint for the public translation API
pub const DEFAULT_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Translator backed by Google Translate
pub struct GoogleTranslator {
    endpoint: String,
    client: reqwest::Client,
}

impl GoogleTranslator {
    /// Create a translator against `endpoint` with a per-request timeout
    pub fn new(endpoint: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait]
impl Translate for GoogleTranslator {
    fn name(&self) -> &str {
        "google"
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, TranslateError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", source_language),
                ("tl", target_language),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| TranslateError::ServiceUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::ServiceUnavailable(format!(
                "translation request failed with status {}",
                status
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TranslateError::ServiceUnavailable(format!("invalid response: {}", e)))?;

        let translated = parse_translation(&body)?;
        debug!(source_language, target_language, "Translated utterance");
        Ok(translated)
    }

    async fn health_check(&self) -> Result<()> {
        let translated = self
            .translate("hello", "en", "fr")
            .await
            .context("Translation health check failed")?;

        if translated.is_empty() {
            anyhow::bail!("Translation health check returned an empty result");
        }

        Ok(())
    }
}

/// Concatenate the translated segments of a `translate_a/single` response
fn parse_translation(body: &Value) -> Result<String, TranslateError> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslateError::ServiceUnavailable("response has no segments".to_string()))?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    Ok(translated)
}
