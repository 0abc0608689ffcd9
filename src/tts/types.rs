//! TTS (Text-to-Speech) types.

use crate::{Error, ErrorContext, Result};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Member names backed by a typed field of [`SpeechRequest`].
pub const RECOGNIZED_MEMBERS: &[&str] = &[
    "language",
    "voice",
    "guid",
    "text",
    "audioFormat",
    "api",
    "apiVersion",
];

/// A speech synthesis request.
///
/// Unrecognized members are kept in `extra` and take part in fingerprinting,
/// so two requests only share a cache entry when every member agrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    /// Explicit fingerprint; overrides computed hashing when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    pub text: String,
    pub audio_format: String,
    /// Provider identifier, e.g. `openai-tts`.
    pub api: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SpeechRequest {
    pub fn new(
        api: impl Into<String>,
        text: impl Into<String>,
        audio_format: impl Into<String>,
    ) -> Self {
        Self {
            language: None,
            voice: None,
            guid: None,
            text: text.into(),
            audio_format: audio_format.into(),
            api: api.into(),
            api_version: None,
            extra: Map::new(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn with_guid(mut self, guid: impl Into<String>) -> Self {
        self.guid = Some(guid.into());
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Attach an opaque pass-through member. Names of typed fields are
    /// rejected; use the matching `with_*` method instead.
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Result<Self> {
        let name = name.into();
        if RECOGNIZED_MEMBERS.contains(&name.as_str()) {
            return Err(shadowed_member(&name));
        }
        self.extra.insert(name, value);
        Ok(self)
    }

    /// JSON form used for fingerprinting. Typed fields always win over an
    /// `extra` member of the same name.
    pub fn to_json(&self) -> Value {
        let mut map = self.extra.clone();
        let typed = [
            ("language", self.language.as_deref()),
            ("voice", self.voice.as_deref()),
            ("guid", self.guid.as_deref()),
            ("text", Some(self.text.as_str())),
            ("audioFormat", Some(self.audio_format.as_str())),
            ("api", Some(self.api.as_str())),
            ("apiVersion", self.api_version.as_deref()),
        ];
        for (name, value) in typed {
            match value {
                Some(v) => map.insert(name.to_string(), Value::String(v.to_string())),
                None => map.remove(name),
            };
        }
        Value::Object(map)
    }

    /// Parse a request from loosely typed JSON, rejecting `null` and
    /// non-object input up front.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::validation_with_context(
                "expected request",
                ErrorContext::new()
                    .with_details(format!("got {}", json_type(&value)))
                    .with_source("speech_request"),
            ));
        }
        let request: SpeechRequest = serde_json::from_value(value).map_err(|e| {
            Error::validation_with_context(
                format!("malformed request: {}", e),
                ErrorContext::new().with_source("speech_request"),
            )
        })?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.trim().is_empty() {
            return Err(Error::validation_with_context(
                "request api is empty",
                ErrorContext::new().with_field_path("request.api"),
            ));
        }
        if self.text.is_empty() {
            return Err(Error::validation_with_context(
                "request text is empty",
                ErrorContext::new().with_field_path("request.text"),
            ));
        }
        if let Some(name) = self
            .extra
            .keys()
            .find(|k| RECOGNIZED_MEMBERS.contains(&k.as_str()))
        {
            return Err(shadowed_member(name));
        }
        Ok(())
    }

    pub fn format(&self) -> AudioFormat {
        AudioFormat::from_name(&self.audio_format)
    }
}

fn shadowed_member(name: &str) -> Error {
    Error::validation_with_context(
        format!("extra member shadows request field: {}", name),
        ErrorContext::new()
            .with_field_path(format!("request.{}", name))
            .with_source("speech_request"),
    )
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Encoded audio returned by a synthesizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioArtifact {
    pub mime: String,
    pub base64: String,
}

impl AudioArtifact {
    pub fn from_bytes(mime: impl Into<String>, data: &[u8]) -> Self {
        Self {
            mime: mime.into(),
            base64: base64::engine::general_purpose::STANDARD.encode(data),
        }
    }

    /// Decode the audio payload.
    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(self.base64.as_bytes())
            .map_err(|e| {
                Error::validation_with_context(
                    format!("malformed base64 audio: {}", e),
                    ErrorContext::new().with_field_path("response.base64"),
                )
            })
    }
}

/// Supported audio formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    OggVorbis,
    Opus,
    Aac,
    Flac,
    Wav,
    Pcm,
}

impl AudioFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::OggVorbis => "audio/ogg",
            Self::Opus => "audio/opus",
            Self::Aac => "audio/aac",
            Self::Flac => "audio/flac",
            Self::Wav => "audio/wav",
            Self::Pcm => "audio/pcm",
        }
    }

    /// Name understood by OpenAI-compatible speech endpoints.
    pub fn response_format(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::OggVorbis | Self::Opus => "opus",
            Self::Aac => "aac",
            Self::Flac => "flac",
            Self::Wav => "wav",
            Self::Pcm => "pcm",
        }
    }

    /// Unknown names fall back to MP3.
    pub fn from_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "ogg_vorbis" | "ogg" => Self::OggVorbis,
            "opus" => Self::Opus,
            "aac" => Self::Aac,
            "flac" => Self::Flac,
            "wav" => Self::Wav,
            "pcm" => Self::Pcm,
            _ => Self::Mp3,
        }
    }
}
