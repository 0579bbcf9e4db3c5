// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{AuthError, JwksManager};
use crate::blockchain::{SolanaClient, SolanaClientError};
use crate::config::{AppConfig, AuthSettings};
use crate::providers::{ElevenLabsClient, ElevenLabsError};
use crate::storage::{DbError, EchoDatabase};

/// Token verification settings.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// JWKS manager; `None` when no issuer is configured.
    pub jwks: Option<JwksManager>,
    /// Expected issuer (`iss` claim).
    pub issuer: Option<String>,
    /// Expected audience (`aud` claim).
    pub audience: Option<String>,
    /// Accept unsigned claims when no JWKS is configured.
    pub allow_unverified_tokens: bool,
    /// Let personality save fall back to a client session id.
    pub demo_sessions: bool,
}

impl AuthConfig {
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, AuthError> {
        let jwks = settings
            .jwks_url
            .as_deref()
            .map(JwksManager::new)
            .transpose()?;

        Ok(Self {
            jwks,
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
            allow_unverified_tokens: settings.allow_unverified_tokens,
            demo_sessions: settings.demo_sessions,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("database: {0}")]
    Database(#[from] DbError),
    #[error("auth: {0}")]
    Auth(#[from] AuthError),
    #[error("solana: {0}")]
    Solana(#[from] SolanaClientError),
    #[error("voice: {0}")]
    Voice(#[from] ElevenLabsError),
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<EchoDatabase>,
    pub auth_config: AuthConfig,
    pub ledger: Arc<SolanaClient>,
    pub voice: Arc<ElevenLabsClient>,
    /// Largest accepted voice sample.
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(db: EchoDatabase, ledger: SolanaClient, voice: ElevenLabsClient) -> Self {
        Self {
            db: Arc::new(db),
            auth_config: AuthConfig::default(),
            ledger: Arc::new(ledger),
            voice: Arc::new(voice),
            max_upload_bytes: crate::config::DEFAULT_VOICE_MAX_UPLOAD_BYTES,
        }
    }

    /// Open the database and build every client from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, StateError> {
        let db = EchoDatabase::open(&config.database_path)?;
        let ledger = SolanaClient::new(config.cluster, config.solana_rpc_url.clone())?;
        let voice = ElevenLabsClient::new(&config.voice)?;
        let auth_config = AuthConfig::from_settings(&config.auth)?;

        if !voice.is_configured() {
            tracing::warn!("ELEVENLABS_API_KEY is not set; voice endpoints will fail");
        }

        Ok(Self::new(db, ledger, voice)
            .with_auth_config(auth_config)
            .with_max_upload_bytes(config.voice.max_upload_bytes))
    }

    pub fn with_auth_config(mut self, auth_config: AuthConfig) -> Self {
        self.auth_config = auth_config;
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}
