// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Voice cloning and speech synthesis through ElevenLabs.

use axum::{
    body::Body,
    extract::{multipart::MultipartError, rejection::JsonRejection, Multipart, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ensure_profile;
use crate::{
    audit_log,
    auth::{Auth, UserIdentity},
    error::ApiError,
    providers::{elevenlabs::is_allowed_sample_type, VoiceSample},
    state::AppState,
    storage::{AuditEventType, UserProfile, UserRepository, VoiceProfile},
};

const AUDIO_FIELD: &str = "audio";
const NAME_FIELD: &str = "name";
const MAX_SPEECH_CHARS: usize = 5_000;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CloneVoiceResponse {
    pub voice_id: String,
    pub name: String,
}

/// Multipart body of `POST /api/voice/clone`, for the OpenAPI document.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct CloneVoiceForm {
    /// `audio/webm`, `audio/wav`, `audio/mpeg` or `audio/mp4`.
    #[schema(value_type = String, format = Binary)]
    audio: Vec<u8>,
    /// Display name, `Echo Voice Clone` when blank.
    name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SpeakRequest {
    /// Defaults to the caller's cloned voice.
    #[serde(default)]
    pub voice_id: Option<String>,
    pub text: String,
}

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::new(err.status(), err.body_text())
}

/// Read the form. The sample's media type is checked before its bytes are read.
async fn read_clone_form(
    mut multipart: Multipart,
    max_upload_bytes: usize,
) -> Result<(VoiceSample, Option<String>), ApiError> {
    let mut sample = None;
    let mut name = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some(AUDIO_FIELD) => {
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::bad_request("Audio file has no content type"))?;
                if !is_allowed_sample_type(&content_type) {
                    return Err(ApiError::bad_request(format!(
                        "Unsupported audio type: {content_type}"
                    )));
                }
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                if bytes.is_empty() {
                    return Err(ApiError::bad_request("Audio file is empty"));
                }
                if bytes.len() > max_upload_bytes {
                    return Err(ApiError::new(
                        StatusCode::PAYLOAD_TOO_LARGE,
                        format!("Audio file exceeds {max_upload_bytes} bytes"),
                    ));
                }
                sample = Some(VoiceSample {
                    bytes: bytes.to_vec(),
                    content_type,
                    file_name,
                });
            }
            Some(NAME_FIELD) => {
                name = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let sample = sample.ok_or_else(|| ApiError::bad_request("No audio file provided"))?;
    Ok((sample, name))
}

/// Clone the caller's voice from one audio sample.
#[utoipa::path(
    post,
    path = "/api/voice/clone",
    tag = "Voice",
    security(("bearer_auth" = [])),
    request_body(content = CloneVoiceForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Voice cloned", body = CloneVoiceResponse),
        (status = 400, description = "Missing or unsupported sample", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized"),
        (status = 413, description = "Sample too large", body = crate::error::ErrorBody),
        (status = 502, description = "ElevenLabs unavailable", body = crate::error::ErrorBody)
    )
)]
pub async fn clone_voice(
    Auth(user): Auth,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<CloneVoiceResponse>, ApiError> {
    let identity = UserIdentity::from(user);
    let (sample, name) = read_clone_form(multipart, state.max_upload_bytes).await?;
    let size = sample.bytes.len();

    let cloned = state.voice.clone_voice(sample, name.as_deref()).await?;

    let voice = VoiceProfile {
        voice_id: Some(cloned.voice_id.clone()),
        voice_name: Some(cloned.name.clone()),
        sample_uploaded: true,
    };
    ensure_profile(
        &state,
        &identity,
        Some(|p: &mut UserProfile| p.voice = Some(voice)),
    )?;

    audit_log!(
        &state.db,
        AuditEventType::VoiceCloned,
        &identity,
        "voice",
        &cloned.voice_id
    );
    tracing::info!(voice_id = %cloned.voice_id, bytes = size, "Stored cloned voice");

    Ok(Json(CloneVoiceResponse {
        voice_id: cloned.voice_id,
        name: cloned.name,
    }))
}

/// Synthesize speech and stream the audio back unchanged.
#[utoipa::path(
    post,
    path = "/api/voice/speak",
    tag = "Voice",
    security(("bearer_auth" = [])),
    request_body = SpeakRequest,
    responses(
        (status = 200, description = "Audio stream in the upstream content type (default audio/mpeg)"),
        (status = 400, description = "Missing text or voice", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "ElevenLabs unavailable", body = crate::error::ErrorBody)
    )
)]
pub async fn speak(
    Auth(user): Auth,
    State(state): State<AppState>,
    payload: Result<Json<SpeakRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let identity = UserIdentity::from(user);

    let text = request.text.trim();
    if text.is_empty() {
        return Err(ApiError::bad_request("text is required"));
    }
    if text.chars().count() > MAX_SPEECH_CHARS {
        return Err(ApiError::bad_request(format!(
            "text must be at most {MAX_SPEECH_CHARS} characters"
        )));
    }

    let requested = request
        .voice_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());
    let voice_id = match requested {
        Some(id) => id,
        None => UserRepository::new(&state.db)
            .find_by_auth_id(&identity.subject)?
            .and_then(|p| p.voice)
            .and_then(|v| v.voice_id)
            .ok_or_else(|| ApiError::bad_request("No voice_id provided and no cloned voice"))?,
    };

    let speech = state.voice.text_to_speech(&voice_id, text).await?;

    audit_log!(
        &state.db,
        AuditEventType::SpeechSynthesized,
        &identity,
        "voice",
        &voice_id
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, speech.content_type)
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from_stream(speech.response.bytes_stream()))
        .map_err(ApiError::internal)
}

#[cfg(test)]
mod tests {
    use crate::storage::{AuditEventType, AuditRepository};
    use crate::test_support::{
        body_bytes, split_json, MockRpc, MockVoiceApi, MultipartForm, TestApp, TEST_API_KEY,
        TEST_AUDIO, TEST_VOICE_ID,
    };
    use axum::http::{header, StatusCode};
    use serde_json::json;

    const SUB: &str = "auth0|speaker";

    fn sample_form(content_type: &str) -> MultipartForm {
        MultipartForm::new()
            .text("name", "  Ada  ")
            .file("audio", "sample.webm", content_type, b"\x1aE\xdf\xa3webm-bytes")
    }

    #[tokio::test]
    async fn clone_stores_voice_on_profile() {
        let app = TestApp::new().await;
        let response = app
            .post_multipart(
                "/api/voice/clone",
                Some(SUB),
                sample_form("audio/webm;codecs=opus"),
            )
            .await;
        let (status, body) = split_json(response).await;

        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["voice_id"], TEST_VOICE_ID);
        assert_eq!(body["name"], "Ada");

        assert_eq!(app.voice_api.last_api_key().as_deref(), Some(TEST_API_KEY));
        assert_eq!(app.voice_api.last_clone_name().as_deref(), Some("Ada"));
        assert!(app
            .voice_api
            .last_sample_content_type()
            .unwrap()
            .starts_with("audio/webm"));

        let voice = app.profile(SUB).unwrap().voice.unwrap();
        assert_eq!(voice.voice_id.as_deref(), Some(TEST_VOICE_ID));
        assert_eq!(voice.voice_name.as_deref(), Some("Ada"));
        assert!(voice.sample_uploaded);
    }

    #[tokio::test]
    async fn unsupported_sample_makes_no_outbound_call() {
        let app = TestApp::new().await;
        for content_type in ["audio/ogg", "video/webm", "text/plain"] {
            let response = app
                .post_multipart("/api/voice/clone", Some(SUB), sample_form(content_type))
                .await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{content_type}");
        }

        let response = app
            .post_multipart(
                "/api/voice/clone",
                Some(SUB),
                MultipartForm::new().text("name", "Ada"),
            )
            .await;
        let (status, body) = split_json(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No audio file provided");

        assert_eq!(app.voice_api.request_count(), 0);
        assert!(app.profile(SUB).is_none());
    }

    #[tokio::test]
    async fn oversized_sample_is_rejected() {
        let mut app = TestApp::new().await;
        app.state.max_upload_bytes = 8;
        let response = app
            .post_multipart("/api/voice/clone", Some(SUB), sample_form("audio/webm"))
            .await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(app.voice_api.request_count(), 0);
    }

    #[tokio::test]
    async fn upstream_status_is_propagated() {
        let voice_api = MockVoiceApi::failing(422, "voice quota exceeded").await;
        let app = TestApp::with_mocks(MockRpc::standard().await, voice_api).await;

        let response = app
            .post_multipart("/api/voice/clone", Some(SUB), sample_form("audio/mpeg"))
            .await;
        let (status, body) = split_json(response).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "voice quota exceeded");
        assert!(app.profile(SUB).is_none());
    }

    #[tokio::test]
    async fn speak_streams_audio_for_stored_voice() {
        let app = TestApp::new().await;
        app.post_multipart("/api/voice/clone", Some(SUB), sample_form("audio/wav"))
            .await;

        let response = app
            .send(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/api/voice/speak")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::AUTHORIZATION, crate::test_support::bearer(SUB))
                    .body(axum::body::Body::from(json!({"text": "hello"}).to_string()))
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
        assert_eq!(body_bytes(response).await, TEST_AUDIO);

        assert_eq!(app.voice_api.last_tts_voice().as_deref(), Some(TEST_VOICE_ID));
        assert_eq!(app.voice_api.last_tts_text().as_deref(), Some("hello"));

        let events = AuditRepository::new(&app.state.db).list_by_user(SUB, 10).unwrap();
        assert_eq!(events[0].event_type, AuditEventType::SpeechSynthesized);
    }

    #[tokio::test]
    async fn speak_validates_input() {
        let app = TestApp::new().await;

        let (status, body) = app
            .post_json("/api/voice/speak", Some(SUB), json!({"text": "hi"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No voice_id provided and no cloned voice");

        let (status, _) = app
            .post_json(
                "/api/voice/speak",
                Some(SUB),
                json!({"voice_id": "v1", "text": "   "}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .post_json(
                "/api/voice/speak",
                Some(SUB),
                json!({"voice_id": "v1", "text": "hi", "speed": 2}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(app.voice_api.request_count(), 0);
    }

    #[tokio::test]
    async fn explicit_voice_needs_no_profile() {
        let app = TestApp::new().await;
        let response = app
            .send(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/api/voice/speak")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::AUTHORIZATION, crate::test_support::bearer(SUB))
                    .body(axum::body::Body::from(
                        json!({"voice_id": "other_voice", "text": "hey"}).to_string(),
                    ))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(app.voice_api.last_tts_voice().as_deref(), Some("other_voice"));
    }
}
