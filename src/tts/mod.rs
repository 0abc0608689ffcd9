//! TTS（文字转语音）模块：合成能力接口与基于 HTTP 的实现。
//!
//! The [`Synthesizer`] trait is the narrow capability the cache consumes;
//! [`HttpSynthesizer`] talks to an OpenAI-compatible speech endpoint.

mod client;
mod types;

pub use client::{HttpSynthesizer, HttpSynthesizerBuilder, DEFAULT_API};
pub use types::{AudioArtifact, AudioFormat, SpeechRequest, RECOGNIZED_MEMBERS};

use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;

/// A speech synthesis provider.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Provider identifier that requests must name in their `api` member.
    fn api(&self) -> &str;

    async fn speak(&self, request: &SpeechRequest) -> Result<AudioArtifact>;

    /// Provider-side usage (e.g. characters billed) accumulated by this client.
    fn usage(&self) -> u64 {
        0
    }
}

/// Reject a request addressed to another provider.
pub fn ensure_api(request: &SpeechRequest, api: &str) -> Result<()> {
    if request.api != api {
        return Err(Error::validation_with_context(
            format!("expected api:{} actual:{}", api, request.api),
            ErrorContext::new()
                .with_field_path("request.api")
                .with_source("synthesizer"),
        ));
    }
    Ok(())
}
