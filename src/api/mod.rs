// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    audit_log,
    auth::UserIdentity,
    blockchain::{AccountBalance, Cluster, TransactionDetails},
    error::{ApiError, ErrorBody},
    models::{MessageResponse, PersonalityData, ProfileResponse},
    state::AppState,
    storage::{AuditEvent, AuditEventType, DiaryEntry, UserProfile, UserRepository},
};

pub mod blockchain;
pub mod diary;
pub mod health;
pub mod personality;
pub mod user;
pub mod voice;

/// Room for multipart framing and the `name` field on top of the sample.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn router(state: AppState) -> Router {
    let upload_limit = state.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    let api_routes = Router::new()
        .route("/blockchain/commit", post(blockchain::create_commitment))
        .route(
            "/blockchain/commit/confirm",
            post(blockchain::confirm_commitment),
        )
        .route(
            "/blockchain/transaction/{signature}",
            get(blockchain::get_transaction),
        )
        .route("/blockchain/balance/{address}", get(blockchain::get_balance))
        .route("/personality/save", post(personality::save_personality))
        .route("/user/me", get(user::get_profile))
        .route("/user/activity", get(user::list_activity))
        .route("/user/clear-data", post(user::clear_data))
        .route("/user/delete", post(user::delete_account))
        .route(
            "/diary/entries",
            get(diary::list_entries).post(diary::create_entry),
        )
        .route(
            "/voice/clone",
            post(voice::clone_voice).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/voice/speak", post(voice::speak));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(CorsLayer::permissive())
}

/// Get-or-create the caller's profile, optionally mutating it in the same
/// write transaction. A newly created profile is audited.
pub(crate) fn ensure_profile<F>(
    state: &AppState,
    identity: &UserIdentity,
    update: Option<F>,
) -> Result<UserProfile, ApiError>
where
    F: FnOnce(&mut UserProfile),
{
    let (profile, created) =
        UserRepository::new(&state.db).ensure_tracked(&identity.as_new_profile(), update)?;
    if created {
        audit_log!(
            &state.db,
            AuditEventType::ProfileCreated,
            identity,
            "profile",
            &profile.id
        );
    }
    Ok(profile)
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        blockchain::create_commitment,
        blockchain::confirm_commitment,
        blockchain::get_transaction,
        blockchain::get_balance,
        personality::save_personality,
        user::get_profile,
        user::list_activity,
        user::clear_data,
        user::delete_account,
        diary::list_entries,
        diary::create_entry,
        voice::clone_voice,
        voice::speak
    ),
    components(
        schemas(
            ErrorBody,
            MessageResponse,
            ProfileResponse,
            PersonalityData,
            AuditEvent,
            AuditEventType,
            DiaryEntry,
            TransactionDetails,
            AccountBalance,
            Cluster,
            blockchain::CommitRequest,
            blockchain::CommitResponse,
            blockchain::ConfirmCommitRequest,
            blockchain::ConfirmCommitResponse,
            personality::SavePersonalityRequest,
            personality::SavePersonalityResponse,
            user::ActivityResponse,
            diary::CreateDiaryEntryRequest,
            diary::DiaryEntriesResponse,
            voice::CloneVoiceForm,
            voice::CloneVoiceResponse,
            voice::SpeakRequest,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Blockchain", description = "Solana memo commitments"),
        (name = "Personality", description = "Personality quiz results"),
        (name = "User", description = "Profile and account lifecycle"),
        (name = "Diary", description = "Diary entries"),
        (name = "Voice", description = "Voice cloning and speech synthesis")
    )
)]
struct ApiDoc;
