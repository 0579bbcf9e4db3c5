// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Personality quiz results.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ensure_profile;
use crate::{
    audit_log,
    auth::{OptionalAuth, UserIdentity},
    error::ApiError,
    state::AppState,
    storage::{AuditEventType, PersonalityResult, UserProfile},
};

const SAVED_MESSAGE: &str = "Personality results saved successfully!";

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SavePersonalityRequest {
    pub personality_type: String,
    /// Per-dimension scores; must be a JSON object.
    #[schema(value_type = Object)]
    pub dimensions: serde_json::Value,
    pub description: String,
    /// Anonymous quiz session, used only without a bearer token.
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SavePersonalityResponse {
    pub success: bool,
    /// Internal profile id.
    pub user_id: String,
    pub message: String,
}

/// A verified token wins; a demo session is the fallback when enabled.
fn resolve_identity(
    state: &AppState,
    auth: OptionalAuth,
    session_id: Option<&str>,
) -> Result<UserIdentity, ApiError> {
    if let OptionalAuth(Some(user)) = auth {
        return Ok(user.into());
    }
    match session_id {
        Some(session_id) if state.auth_config.demo_sessions => {
            UserIdentity::demo(session_id).map_err(|e| ApiError::bad_request(e.to_string()))
        }
        _ => Err(ApiError::unauthorized("Authentication required")),
    }
}

/// Save the caller's personality result, creating the profile if needed.
#[utoipa::path(
    post,
    path = "/api/personality/save",
    tag = "Personality",
    security((), ("bearer_auth" = [])),
    request_body = SavePersonalityRequest,
    responses(
        (status = 200, description = "Saved", body = SavePersonalityResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorBody),
        (status = 401, description = "No token and no usable session", body = crate::error::ErrorBody)
    )
)]
pub async fn save_personality(
    auth: OptionalAuth,
    State(state): State<AppState>,
    payload: Result<Json<SavePersonalityRequest>, JsonRejection>,
) -> Result<Json<SavePersonalityResponse>, ApiError> {
    let Json(request) = payload?;

    let personality_type = request.personality_type.trim();
    if personality_type.is_empty() {
        return Err(ApiError::bad_request("personalityType is required"));
    }
    if !request.dimensions.is_object() {
        return Err(ApiError::bad_request("dimensions must be an object"));
    }

    let identity = resolve_identity(&state, auth, request.session_id.as_deref())?;

    let result = PersonalityResult {
        personality_type: personality_type.to_string(),
        dimensions: request.dimensions,
        description: request.description,
        completed_at: Utc::now(),
    };
    let profile = ensure_profile(
        &state,
        &identity,
        Some(|p: &mut UserProfile| p.personality = Some(result)),
    )?;

    audit_log!(
        &state.db,
        AuditEventType::PersonalitySaved,
        &identity,
        "profile",
        &profile.id
    );
    tracing::info!(profile_id = %profile.id, demo = identity.is_demo(), "Saved personality result");

    Ok(Json(SavePersonalityResponse {
        success: true,
        user_id: profile.id,
        message: SAVED_MESSAGE.to_string(),
    }))
}
