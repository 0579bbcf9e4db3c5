// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Solana commitment endpoints.
//!
//! Committing is two calls. `commit` returns an unsigned memo transaction for
//! the user's wallet to sign and submit; `commit/confirm` checks the landed
//! transaction on the ledger and records it on the profile. The server never
//! sees a private key.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use base64ct::{Base64, Encoding};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use utoipa::ToSchema;

use super::ensure_profile;
use crate::{
    audit_log,
    auth::{Auth, UserIdentity},
    blockchain::{
        build_commitment_transaction, serialize_transaction, AccountBalance, CommitmentPayload,
        ContentDigest, TransactionDetails,
    },
    error::ApiError,
    state::AppState,
    storage::{AuditEvent, AuditEventType, AuditRepository, BlockchainCommitment, UserProfile},
};

/// Request to prepare a commitment transaction.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CommitRequest {
    /// Base58 address of the wallet that signs and pays.
    pub wallet_address: String,
    /// Digest string, or the answers themselves (digested server-side).
    #[schema(value_type = Object)]
    pub personality_answers: ContentDigest,
    /// Digest string, or the entries themselves (digested server-side).
    #[schema(value_type = Object)]
    pub diary_entries: ContentDigest,
    /// Optional; committed as `not-provided` when absent or blank.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub voice_data: Option<ContentDigest>,
}

/// Unsigned transaction ready for the wallet.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommitResponse {
    pub success: bool,
    /// Base64 wire transaction with empty signature slots.
    pub transaction: String,
    pub blockhash: String,
    pub last_valid_block_height: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_fee_lamports: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfirmCommitRequest {
    pub wallet_address: String,
    pub signature: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmCommitResponse {
    pub success: bool,
    pub signature: String,
    pub explorer_url: String,
}

fn parse_wallet(raw: &str) -> Result<Pubkey, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid wallet address"))
}

fn parse_signature(raw: &str) -> Result<Signature, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid transaction signature"))
}

/// Build the unsigned commitment transaction.
#[utoipa::path(
    post,
    path = "/api/blockchain/commit",
    tag = "Blockchain",
    security(("bearer_auth" = [])),
    request_body = CommitRequest,
    responses(
        (status = 200, description = "Unsigned transaction", body = CommitResponse),
        (status = 400, description = "Invalid address or content", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Solana RPC unavailable", body = crate::error::ErrorBody)
    )
)]
pub async fn create_commitment(
    Auth(user): Auth,
    State(state): State<AppState>,
    payload: Result<Json<CommitRequest>, JsonRejection>,
) -> Result<Json<CommitResponse>, ApiError> {
    let Json(request) = payload?;
    let identity = UserIdentity::from(user);

    // Everything the client sent is validated before any ledger or storage access.
    let wallet = parse_wallet(&request.wallet_address)?;
    let personality_hash = request
        .personality_answers
        .resolve("personalityAnswers")
        .map_err(ApiError::bad_request)?;
    let diary_hash = request
        .diary_entries
        .resolve("diaryEntries")
        .map_err(ApiError::bad_request)?;
    let voice_hash = match request.voice_data {
        Some(digest) if !digest.is_blank() => {
            Some(digest.resolve("voiceData").map_err(ApiError::bad_request)?)
        }
        _ => None,
    };

    let profile = ensure_profile(&state, &identity, None::<fn(&mut UserProfile)>)?;
    let memo = CommitmentPayload::new(
        profile.id,
        profile.email,
        personality_hash,
        diary_hash,
        voice_hash,
        Utc::now().timestamp_millis(),
    );

    let latest = state.ledger.get_latest_blockhash().await?;
    let transaction = build_commitment_transaction(&wallet, &memo, &latest.blockhash);
    let wire = serialize_transaction(&transaction)?;

    let estimated_fee_lamports = match state.ledger.get_fee_for_message(&transaction.message).await
    {
        Ok(fee) => Some(fee),
        Err(e) => {
            tracing::warn!(error = %e, "Fee estimate unavailable");
            None
        }
    };

    audit_log!(
        &state.db,
        AuditEventType::CommitmentPrepared,
        &identity,
        "wallet",
        wallet.to_string()
    );
    tracing::info!(wallet = %wallet, bytes = wire.len(), "Prepared commitment transaction");

    Ok(Json(CommitResponse {
        success: true,
        transaction: Base64::encode_string(&wire),
        blockhash: latest.blockhash.to_string(),
        last_valid_block_height: latest.last_valid_block_height,
        estimated_fee_lamports,
    }))
}

/// Record a landed commitment transaction on the caller's profile.
///
/// The signature must exist on the ledger, have succeeded, have been paid for
/// by the given wallet and carry a memo instruction.
#[utoipa::path(
    post,
    path = "/api/blockchain/commit/confirm",
    tag = "Blockchain",
    security(("bearer_auth" = [])),
    request_body = ConfirmCommitRequest,
    responses(
        (status = 200, description = "Commitment recorded", body = ConfirmCommitResponse),
        (status = 400, description = "Invalid or unverifiable transaction", body = crate::error::ErrorBody),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Solana RPC unavailable", body = crate::error::ErrorBody)
    )
)]
pub async fn confirm_commitment(
    Auth(user): Auth,
    State(state): State<AppState>,
    payload: Result<Json<ConfirmCommitRequest>, JsonRejection>,
) -> Result<Json<ConfirmCommitResponse>, ApiError> {
    let Json(request) = payload?;
    let identity = UserIdentity::from(user);

    let wallet_address = request.wallet_address.trim().to_string();
    let signature = request.signature.trim().to_string();
    if wallet_address.is_empty() || signature.is_empty() {
        return Err(ApiError::bad_request(
            "walletAddress and signature are required",
        ));
    }
    let wallet = parse_wallet(&wallet_address)?;
    let parsed = parse_signature(&signature)?;

    let details = match state.ledger.get_transaction(&parsed).await? {
        Some(details) => details,
        None => {
            reject_confirmation(&state, &identity, &signature, "not found");
            return Err(ApiError::bad_request("Transaction not found on chain"));
        }
    };
    if !details.success {
        reject_confirmation(&state, &identity, &signature, "failed on chain");
        return Err(ApiError::bad_request("Transaction failed on chain"));
    }
    if details.fee_payer != wallet.to_string() {
        reject_confirmation(&state, &identity, &signature, "fee payer mismatch");
        return Err(ApiError::bad_request(
            "Transaction was not paid for by this wallet",
        ));
    }
    if !details.has_memo {
        reject_confirmation(&state, &identity, &signature, "no memo instruction");
        return Err(ApiError::bad_request(
            "Transaction does not carry a commitment memo",
        ));
    }

    let commitment = BlockchainCommitment {
        wallet_address,
        tx_signature: signature.clone(),
        committed_at: Utc::now(),
    };
    ensure_profile(
        &state,
        &identity,
        Some(|p: &mut UserProfile| p.blockchain = Some(commitment)),
    )?;

    audit_log!(
        &state.db,
        AuditEventType::CommitmentConfirmed,
        &identity,
        "transaction",
        &signature
    );
    tracing::info!(signature = %signature, slot = details.slot, "Commitment confirmed");

    Ok(Json(ConfirmCommitResponse {
        success: true,
        signature,
        explorer_url: details.explorer_url,
    }))
}

fn reject_confirmation(state: &AppState, identity: &UserIdentity, signature: &str, reason: &str) {
    tracing::warn!(signature, reason, "Rejected commitment confirmation");
    let event = AuditEvent::new(AuditEventType::CommitmentConfirmed)
        .with_user(&identity.subject)
        .with_resource("transaction", signature)
        .failed(reason);
    if let Err(e) = AuditRepository::new(&state.db).log(&event) {
        tracing::warn!(error = %e, "Failed to write audit event");
    }
}

/// Look up a transaction on the configured cluster.
#[utoipa::path(
    get,
    path = "/api/blockchain/transaction/{signature}",
    tag = "Blockchain",
    security(("bearer_auth" = [])),
    params(("signature" = String, Path, description = "Base58 transaction signature")),
    responses(
        (status = 200, body = TransactionDetails),
        (status = 400, description = "Malformed signature", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown to the cluster", body = crate::error::ErrorBody),
        (status = 502, description = "Solana RPC unavailable", body = crate::error::ErrorBody)
    )
)]
pub async fn get_transaction(
    Auth(_user): Auth,
    State(state): State<AppState>,
    Path(signature): Path<String>,
) -> Result<Json<TransactionDetails>, ApiError> {
    let signature = parse_signature(&signature)?;

    state
        .ledger
        .get_transaction(&signature)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Transaction not found"))
}

/// Native SOL balance of an address.
#[utoipa::path(
    get,
    path = "/api/blockchain/balance/{address}",
    tag = "Blockchain",
    security(("bearer_auth" = [])),
    params(("address" = String, Path, description = "Base58 account address")),
    responses(
        (status = 200, body = AccountBalance),
        (status = 400, description = "Malformed address", body = crate::error::ErrorBody),
        (status = 502, description = "Solana RPC unavailable", body = crate::error::ErrorBody)
    )
)]
pub async fn get_balance(
    Auth(_user): Auth,
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<AccountBalance>, ApiError> {
    let wallet = parse_wallet(&address)?;
    Ok(Json(state.ledger.get_balance(&wallet).await?))
}
