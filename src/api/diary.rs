// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ensure_profile;
use crate::{
    audit_log,
    auth::{Auth, UserIdentity},
    error::ApiError,
    state::AppState,
    storage::{AuditEventType, DiaryEntry, DiaryRepository, UserProfile, UserRepository},
};

const MAX_ENTRY_CHARS: usize = 10_000;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateDiaryEntryRequest {
    pub content: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DiaryEntriesResponse {
    /// Newest first.
    pub entries: Vec<DiaryEntry>,
    pub total: usize,
}

#[utoipa::path(
    get,
    path = "/api/diary/entries",
    tag = "Diary",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = DiaryEntriesResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_entries(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<DiaryEntriesResponse>, ApiError> {
    let entries = match UserRepository::new(&state.db).find_by_auth_id(&user.user_id)? {
        Some(profile) => DiaryRepository::new(&state.db).list(&profile.id)?,
        None => Vec::new(),
    };
    let total = entries.len();
    Ok(Json(DiaryEntriesResponse { entries, total }))
}

#[utoipa::path(
    post,
    path = "/api/diary/entries",
    tag = "Diary",
    security(("bearer_auth" = [])),
    request_body = CreateDiaryEntryRequest,
    responses(
        (status = 201, body = DiaryEntry),
        (status = 400, description = "Empty or oversized content", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn create_entry(
    Auth(user): Auth,
    State(state): State<AppState>,
    payload: Result<Json<CreateDiaryEntryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DiaryEntry>), ApiError> {
    let Json(request) = payload?;

    let content = request.content.trim();
    if content.is_empty() {
        return Err(ApiError::bad_request("content is required"));
    }
    if content.chars().count() > MAX_ENTRY_CHARS {
        return Err(ApiError::bad_request(format!(
            "content must be at most {MAX_ENTRY_CHARS} characters"
        )));
    }

    let identity = UserIdentity::from(user);
    ensure_profile(&state, &identity, None::<fn(&mut UserProfile)>)?;
    let entry = DiaryRepository::new(&state.db).create(&identity.subject, content)?;

    audit_log!(
        &state.db,
        AuditEventType::DiaryEntryCreated,
        &identity,
        "diary_entry",
        &entry.id
    );
    Ok((StatusCode::CREATED, Json(entry)))
}
