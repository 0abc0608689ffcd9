//! HTTP synthesizer for OpenAI-compatible speech endpoints.

use super::types::{AudioArtifact, SpeechRequest};
use super::{ensure_api, Synthesizer};
use crate::config::SynthesizerConfig;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

/// Provider identifier served by [`HttpSynthesizer`] unless overridden.
pub const DEFAULT_API: &str = "openai-tts";

/// Synthesizer backed by a `POST {model, input, voice, response_format}`
/// speech endpoint.
pub struct HttpSynthesizer {
    http_client: reqwest::Client,
    api: String,
    api_version: Option<String>,
    model: String,
    endpoint: String,
    api_key: String,
    usage: AtomicU64,
}

impl HttpSynthesizer {
    pub fn builder() -> HttpSynthesizerBuilder {
        HttpSynthesizerBuilder::new()
    }

    pub fn from_config(config: &SynthesizerConfig) -> Result<Self> {
        let mut builder = Self::builder()
            .api(&config.api)
            .api_version(&config.api_version)
            .model(&config.model)
            .endpoint(&config.endpoint)
            .timeout_secs(config.timeout_secs);
        if let Some(key) = &config.secret_access_key {
            builder = builder.api_key(key);
        }
        builder.build()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }

    /// Reject a request pinned to another API version than this client speaks.
    fn ensure_api_version(&self, request: &SpeechRequest) -> Result<()> {
        match (request.api_version.as_deref(), self.api_version.as_deref()) {
            (Some(wanted), Some(served)) if wanted != served => {
                Err(Error::validation_with_context(
                    format!("expected apiVersion:{} actual:{}", served, wanted),
                    ErrorContext::new()
                        .with_field_path("request.apiVersion")
                        .with_source("http_synthesizer"),
                ))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    fn api(&self) -> &str {
        &self.api
    }

    async fn speak(&self, request: &SpeechRequest) -> Result<AudioArtifact> {
        ensure_api(request, &self.api)?;
        self.ensure_api_version(request)?;
        let format = request.format();
        let mut body = serde_json::json!({
            "model": self.model,
            "input": request.text,
            "response_format": format.response_format(),
        });
        if let Some(voice) = &request.voice {
            body["voice"] = serde_json::Value::String(voice.clone());
        }
        tracing::debug!(endpoint = %self.endpoint, body = %body, "synthesize speech");
        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                Error::provider_with_context(
                    format!("TTS request failed: {}", e),
                    ErrorContext::new().with_source("http_synthesizer"),
                )
            })?;
        let status = response.status();
        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let bytes = response.bytes().await.map_err(|e| {
            Error::provider_with_context(
                format!("Failed to read TTS response: {}", e),
                ErrorContext::new().with_source("http_synthesizer"),
            )
        })?;
        if !status.is_success() {
            let body_str = String::from_utf8_lossy(&bytes);
            tracing::error!(status = %status, body = %body_str, "synthesize speech failed");
            return Err(Error::provider_with_context(
                format!("TTS API error ({}): {}", status, body_str),
                ErrorContext::new().with_source("http_synthesizer"),
            ));
        }
        let mime = mime
            .filter(|m| m.starts_with("audio/"))
            .unwrap_or_else(|| format.mime_type().to_string());
        self.usage
            .fetch_add(request.text.chars().count() as u64, Ordering::Relaxed);
        Ok(AudioArtifact::from_bytes(mime, &bytes))
    }

    fn usage(&self) -> u64 {
        self.usage.load(Ordering::Relaxed)
    }
}

pub struct HttpSynthesizerBuilder {
    api: Option<String>,
    api_version: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    endpoint: Option<String>,
    timeout_secs: u64,
}

impl HttpSynthesizerBuilder {
    pub fn new() -> Self {
        Self {
            api: None,
            api_version: None,
            model: None,
            api_key: None,
            endpoint: None,
            timeout_secs: 60,
        }
    }
    pub fn api(mut self, api: impl Into<String>) -> Self {
        self.api = Some(api.into());
        self
    }
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn build(self) -> Result<HttpSynthesizer> {
        let model = self
            .model
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| Error::configuration("Model must be specified"))?;
        let api_key = self
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                Error::configuration_with_context(
                    "API key required",
                    ErrorContext::new().with_field_path("synthesizer.secret_access_key"),
                )
            })?;
        let endpoint = self
            .endpoint
            .unwrap_or_else(|| "https://api.openai.com/v1/audio/speech".to_string());
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(self.timeout_secs.max(1)))
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(HttpSynthesizer {
            http_client,
            api: self.api.unwrap_or_else(|| DEFAULT_API.to_string()),
            api_version: self.api_version.filter(|v| !v.is_empty()),
            model,
            endpoint,
            api_key,
            usage: AtomicU64::new(0),
        })
    }
}

impl Default for HttpSynthesizerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
