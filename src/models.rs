// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Response types shared by several endpoints. Request bodies live next to
//! their handlers in [`crate::api`].
//!
//! The stored profile groups personality, voice and ledger state into
//! optional sub-records; [`ProfileResponse`] flattens them back into the
//! column view clients expect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::{PersonalityResult, UserProfile};

// =============================================================================
// Generic Responses
// =============================================================================

/// `{ "success": true, "message": ... }`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

// =============================================================================
// Profile
// =============================================================================

/// Personality result as stored in `personality_data`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersonalityData {
    #[serde(rename = "type")]
    pub personality_type: String,
    #[schema(value_type = Object)]
    pub dimensions: serde_json::Value,
    pub description: String,
    pub completed_at: DateTime<Utc>,
}

impl From<PersonalityResult> for PersonalityData {
    fn from(result: PersonalityResult) -> Self {
        Self {
            personality_type: result.personality_type,
            dimensions: result.dimensions,
            description: result.description,
            completed_at: result.completed_at,
        }
    }
}

/// The caller's profile.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub id: String,
    pub auth0_id: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub assistant_id: Option<String>,
    pub thread_id: Option<String>,
    pub personality_completed: bool,
    pub personality_type: Option<String>,
    pub personality_data: Option<PersonalityData>,
    pub voice_id: Option<String>,
    pub voice_name: Option<String>,
    pub voice_sample_uploaded: bool,
    pub wallet_address: Option<String>,
    /// Signature of the confirmed commitment transaction.
    pub solana_tx_hash: Option<String>,
    pub blockchain_committed_at: Option<DateTime<Utc>>,
    pub diary_entry_count: u32,
}

impl From<UserProfile> for ProfileResponse {
    fn from(profile: UserProfile) -> Self {
        let personality_completed = profile.personality_completed();
        let personality_type = profile
            .personality
            .as_ref()
            .map(|p| p.personality_type.clone());
        let (voice_id, voice_name, voice_sample_uploaded) = match profile.voice {
            Some(voice) => (voice.voice_id, voice.voice_name, voice.sample_uploaded),
            None => (None, None, false),
        };
        let (wallet_address, solana_tx_hash, blockchain_committed_at) = match profile.blockchain {
            Some(c) => (
                Some(c.wallet_address),
                Some(c.tx_signature),
                Some(c.committed_at),
            ),
            None => (None, None, None),
        };

        Self {
            id: profile.id,
            auth0_id: profile.auth0_id,
            email: profile.email,
            name: profile.name,
            picture: profile.picture,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
            assistant_id: profile.assistant_id,
            thread_id: profile.thread_id,
            personality_completed,
            personality_type,
            personality_data: profile.personality.map(PersonalityData::from),
            voice_id,
            voice_name,
            voice_sample_uploaded,
            wallet_address,
            solana_tx_hash,
            blockchain_committed_at,
            diary_entry_count: profile.diary_entry_count,
        }
    }
}
