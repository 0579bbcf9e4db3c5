// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Profile and account lifecycle endpoints.
//!
//! Every operation is scoped to the caller's own identity.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    audit_log,
    auth::{Auth, UserIdentity},
    error::ApiError,
    models::{MessageResponse, ProfileResponse},
    state::AppState,
    storage::{AuditEvent, AuditEventType, AuditRepository, UserRepository},
};

const DEFAULT_ACTIVITY_LIMIT: usize = 50;
const MAX_ACTIVITY_LIMIT: usize = 200;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivityQuery {
    /// Maximum number of events (default 50, at most 200).
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityResponse {
    pub events: Vec<AuditEvent>,
}

/// The caller's profile.
#[utoipa::path(
    get,
    path = "/api/user/me",
    tag = "User",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = ProfileResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No profile yet", body = crate::error::ErrorBody)
    )
)]
pub async fn get_profile(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, ApiError> {
    UserRepository::new(&state.db)
        .find_by_auth_id(&user.user_id)?
        .map(|profile| Json(profile.into()))
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// The caller's audit trail, newest first.
#[utoipa::path(
    get,
    path = "/api/user/activity",
    tag = "User",
    security(("bearer_auth" = [])),
    params(ActivityQuery),
    responses(
        (status = 200, body = ActivityResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_activity(
    Auth(user): Auth,
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ActivityResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .min(MAX_ACTIVITY_LIMIT);
    let events = AuditRepository::new(&state.db).list_by_user(&user.user_id, limit)?;
    Ok(Json(ActivityResponse { events }))
}

/// Delete diary entries and reset personality, voice and ledger state.
///
/// Identity columns and `created_at` survive. With nothing left to clear the
/// call is 404, so a repeat reports not-found.
#[utoipa::path(
    post,
    path = "/api/user/clear-data",
    tag = "User",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No profile or nothing to clear", body = crate::error::ErrorBody)
    )
)]
pub async fn clear_data(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    let identity = UserIdentity::from(user);
    let profile = UserRepository::new(&state.db).clear_data(&identity.subject)?;

    audit_log!(
        &state.db,
        AuditEventType::DataCleared,
        &identity,
        "profile",
        &profile.id
    );
    Ok(Json(MessageResponse::ok("All user data cleared successfully")))
}

/// Delete the caller's diary entries and profile.
///
/// The audit trail is kept.
#[utoipa::path(
    post,
    path = "/api/user/delete",
    tag = "User",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No profile", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_account(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    let identity = UserIdentity::from(user);
    UserRepository::new(&state.db).delete(&identity.subject)?;

    audit_log!(&state.db, AuditEventType::AccountDeleted, &identity);
    tracing::info!(subject = %identity.subject, "Account deleted");
    Ok(Json(MessageResponse::ok("Account deleted successfully")))
}
