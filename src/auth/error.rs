// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Errors raised while resolving the caller's identity.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization header is required")]
    MissingAuthHeader,

    #[error("Authorization header must be 'Bearer <token>'")]
    InvalidAuthHeader,

    #[error("Token is malformed")]
    MalformedToken,

    #[error("Token signature does not verify against the Auth0 key set")]
    InvalidSignature,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token was not issued by the configured Auth0 tenant")]
    InvalidIssuer,

    #[error("Token is not intended for this API")]
    InvalidAudience,

    #[error("Token is not valid yet")]
    TokenNotYetValid,

    /// Token `kid` is absent from the key set, even after a refresh.
    #[error("No Auth0 signing key matches the token")]
    NoMatchingKey,

    #[error("Auth0 key set unavailable: {0}")]
    JwksUnavailable(String),

    /// A JWK or the HTTP client could not be built.
    #[error("Auth0 key setup failed: {0}")]
    KeySetup(String),

    /// Neither a JWKS nor unverified tokens are configured.
    #[error("Token verification is not configured on this server")]
    VerificationDisabled,
}

#[derive(Serialize)]
struct AuthErrorBody {
    success: bool,
    error: String,
    error_code: &'static str,
}

impl AuthError {
    /// Stable machine-readable code returned next to the message.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidIssuer => "invalid_issuer",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::NoMatchingKey => "no_matching_key",
            AuthError::JwksUnavailable(_) => "jwks_unavailable",
            AuthError::KeySetup(_) => "key_setup_failed",
            AuthError::VerificationDisabled => "verification_disabled",
        }
    }

    /// Server-side failures are 500; anything the caller sent wrong is 401.
    pub fn status_code(&self) -> StatusCode {
        if self.is_server_fault() {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::UNAUTHORIZED
        }
    }

    fn is_server_fault(&self) -> bool {
        matches!(
            self,
            AuthError::JwksUnavailable(_) | AuthError::KeySetup(_) | AuthError::VerificationDisabled
        )
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_server_fault() {
            tracing::error!(error = %self, "Identity resolution failed on the server side");
        } else {
            tracing::debug!(code = self.error_code(), "Rejected caller token");
        }
        let body = AuthErrorBody {
            success: false,
            error: self.to_string(),
            error_code: self.error_code(),
        };
        (status, Json(body)).into_response()
    }
}
