// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ElevenLabs integration for voice cloning and speech synthesis.

use std::time::Duration;

use axum::http::StatusCode;
use reqwest::{multipart, Client};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::VoiceSettings;

const DEFAULT_CLONE_NAME: &str = "Echo Voice Clone";
const DEFAULT_SAMPLE_FILE_NAME: &str = "voice-sample.webm";
const DEFAULT_SPEECH_CONTENT_TYPE: &str = "audio/mpeg";
const API_KEY_HEADER: &str = "xi-api-key";

/// Audio media types accepted as voice samples.
pub const ALLOWED_SAMPLE_TYPES: [&str; 4] = ["audio/webm", "audio/wav", "audio/mpeg", "audio/mp4"];

#[derive(Debug, thiserror::Error)]
pub enum ElevenLabsError {
    #[error("Missing ELEVENLABS_API_KEY")]
    MissingApiKey,

    /// Non-2xx answer; carries the upstream status and body text.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("ElevenLabs request failed: {0}")]
    Request(String),

    #[error("ElevenLabs response was invalid: {0}")]
    InvalidResponse(String),
}

impl ElevenLabsError {
    /// HTTP status the API boundary answers with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ElevenLabsError::MissingApiKey => StatusCode::INTERNAL_SERVER_ERROR,
            ElevenLabsError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ElevenLabsError::Request(_) | ElevenLabsError::InvalidResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

/// Uploaded voice sample.
#[derive(Debug, Clone)]
pub struct VoiceSample {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClonedVoice {
    pub voice_id: String,
    pub name: String,
}

/// Synthesized speech. The body has not been read yet.
#[derive(Debug)]
pub struct SynthesizedSpeech {
    pub content_type: String,
    pub response: reqwest::Response,
}

#[derive(Debug, Deserialize)]
struct AddVoiceResponse {
    #[serde(default)]
    voice_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct TextToSpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

#[derive(Debug, Clone)]
pub struct ElevenLabsClient {
    api_key: Option<String>,
    base_url: String,
    model_id: String,
    http: Client,
}

impl ElevenLabsClient {
    pub fn new(settings: &VoiceSettings) -> Result<Self, ElevenLabsError> {
        url::Url::parse(&settings.base_url)
            .map_err(|e| ElevenLabsError::Request(format!("invalid base URL: {e}")))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ElevenLabsError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model_id: settings.model_id.clone(),
            http,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, ElevenLabsError> {
        self.api_key.as_deref().ok_or(ElevenLabsError::MissingApiKey)
    }

    /// Clone a voice from a single audio sample.
    pub async fn clone_voice(
        &self,
        sample: VoiceSample,
        name: Option<&str>,
    ) -> Result<ClonedVoice, ElevenLabsError> {
        let api_key = self.api_key()?;
        let name = clone_name(name);
        let file_name = sample
            .file_name
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SAMPLE_FILE_NAME.to_string());

        let part = multipart::Part::bytes(sample.bytes)
            .file_name(file_name)
            .mime_str(&sample.content_type)
            .map_err(|e| ElevenLabsError::Request(format!("invalid sample content type: {e}")))?;
        let form = multipart::Form::new()
            .text("name", name.clone())
            .part("files", part);

        let response = self
            .http
            .post(format!("{}/voices/add", self.base_url))
            .header(API_KEY_HEADER, api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ElevenLabsError::Request(format!("voices/add failed: {e}")))?;

        if !response.status().is_success() {
            return Err(upstream_error(response, "Failed to clone voice").await);
        }

        let body: AddVoiceResponse = response
            .json()
            .await
            .map_err(|e| ElevenLabsError::InvalidResponse(e.to_string()))?;
        let voice_id = body
            .voice_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ElevenLabsError::InvalidResponse("Voice ID missing from ElevenLabs".to_string())
            })?;

        info!(voice_id = %voice_id, "ElevenLabs voice cloned");
        Ok(ClonedVoice { voice_id, name })
    }

    /// Synthesize `text` with a cloned voice. Nothing is cached.
    pub async fn text_to_speech(
        &self,
        voice_id: &str,
        text: &str,
    ) -> Result<SynthesizedSpeech, ElevenLabsError> {
        let api_key = self.api_key()?;
        let url = self.speech_url(voice_id)?;

        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, api_key)
            .header(reqwest::header::ACCEPT, DEFAULT_SPEECH_CONTENT_TYPE)
            .json(&TextToSpeechRequest {
                text,
                model_id: &self.model_id,
            })
            .send()
            .await
            .map_err(|e| ElevenLabsError::Request(format!("text-to-speech failed: {e}")))?;

        if !response.status().is_success() {
            return Err(upstream_error(response, "Failed to generate speech").await);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_SPEECH_CONTENT_TYPE)
            .to_string();

        Ok(SynthesizedSpeech {
            content_type,
            response,
        })
    }

    fn speech_url(&self, voice_id: &str) -> Result<url::Url, ElevenLabsError> {
        let mut url = url::Url::parse(&self.base_url)
            .map_err(|e| ElevenLabsError::Request(format!("invalid base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ElevenLabsError::Request("base URL cannot take a path".to_string()))?
            .pop_if_empty()
            .push("text-to-speech")
            .push(voice_id);
        Ok(url)
    }
}

/// Whether a declared media type is an accepted voice sample.
///
/// Parameters such as `;codecs=opus` are ignored.
pub fn is_allowed_sample_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_SAMPLE_TYPES.contains(&essence.as_str())
}

fn clone_name(name: Option<&str>) -> String {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_CLONE_NAME)
        .to_string()
}

async fn upstream_error(response: reqwest::Response, fallback: &str) -> ElevenLabsError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        fallback.to_string()
    } else {
        body
    };
    tracing::warn!(status, message = %message, "ElevenLabs returned an error");
    ElevenLabsError::Upstream { status, message }
}
