// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Commitment memo construction.
//!
//! A commitment transaction carries two instructions:
//!
//! 1. an SPL Memo instruction whose data is the JSON [`CommitmentPayload`],
//!    signed by the user's wallet;
//! 2. a system transfer of [`UNIQUENESS_TRANSFER_LAMPORTS`] from the wallet
//!    to itself, so that two identical memos never produce the same
//!    transaction.
//!
//! The payload shape is read back by anyone inspecting the ledger. Field
//! order and names are fixed.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use solana_hash::Hash;
use solana_instruction::Instruction;
use solana_message::Message;
use solana_pubkey::Pubkey;
use solana_system_interface::instruction::transfer;
use solana_transaction::Transaction;

use super::types::PACKET_DATA_SIZE;

/// Schema version written into every memo.
pub const COMMITMENT_VERSION: &str = "1.0";

/// Voice digest placeholder when the user has no voice sample.
pub const VOICE_NOT_PROVIDED: &str = "not-provided";

/// Self-transfer amount. Net zero for the wallet apart from the fee.
pub const UNIQUENESS_TRANSFER_LAMPORTS: u64 = 1000;

/// Longest digest string accepted verbatim from a client.
pub const MAX_DIGEST_LEN: usize = 128;

#[derive(Debug, thiserror::Error)]
pub enum CommitmentError {
    #[error("failed to encode transaction: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("transaction is {0} bytes, limit is {PACKET_DATA_SIZE}")]
    TooLarge(usize),
}

/// Memo payload committed on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentPayload {
    pub user_id: String,
    pub email: String,
    pub personality_hash: String,
    pub diary_hash: String,
    pub voice_hash: String,
    /// Unix milliseconds.
    pub timestamp: i64,
    pub version: String,
}

impl CommitmentPayload {
    pub fn new(
        user_id: impl Into<String>,
        email: impl Into<String>,
        personality_hash: impl Into<String>,
        diary_hash: impl Into<String>,
        voice_hash: Option<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            personality_hash: personality_hash.into(),
            diary_hash: diary_hash.into(),
            voice_hash: voice_hash.unwrap_or_else(|| VOICE_NOT_PROVIDED.to_string()),
            timestamp,
            version: COMMITMENT_VERSION.to_string(),
        }
    }

    /// Compact JSON bytes written as memo data.
    pub fn to_memo_bytes(&self) -> Vec<u8> {
        // Plain strings and integers only; serialization cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Client-supplied content for a commitment.
///
/// A string is taken as a digest computed by the client. Any other JSON
/// value is digested here.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ContentDigest {
    Digest(String),
    Content(serde_json::Value),
}

impl ContentDigest {
    /// `null` or a blank string, which optional fields treat as absent.
    pub fn is_blank(&self) -> bool {
        match self {
            ContentDigest::Digest(raw) => raw.trim().is_empty(),
            ContentDigest::Content(value) => value.is_null(),
        }
    }

    /// Resolve to the digest string stored in the memo.
    pub fn resolve(&self, field: &str) -> Result<String, String> {
        match self {
            ContentDigest::Digest(raw) => {
                let digest = raw.trim();
                if digest.is_empty() {
                    Err(format!("{field} must not be empty"))
                } else if digest.len() > MAX_DIGEST_LEN {
                    Err(format!("{field} must be at most {MAX_DIGEST_LEN} characters"))
                } else {
                    Ok(digest.to_string())
                }
            }
            ContentDigest::Content(serde_json::Value::Null) => {
                Err(format!("{field} is required"))
            }
            ContentDigest::Content(value) => Ok(sha256_json_hex(value)),
        }
    }
}

/// Lowercase hex SHA-256 of the compact JSON form (object keys sorted).
pub fn sha256_json_hex(value: &serde_json::Value) -> String {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    hex::encode(Sha256::digest(&bytes))
}

/// The memo and self-transfer instructions paid for by `wallet`.
pub fn commitment_instructions(wallet: &Pubkey, payload: &CommitmentPayload) -> [Instruction; 2] {
    [
        spl_memo::build_memo(&payload.to_memo_bytes(), &[wallet]),
        transfer(wallet, wallet, UNIQUENESS_TRANSFER_LAMPORTS),
    ]
}

/// Build the unsigned commitment transaction paid for by `wallet`.
///
/// Signature slots are zeroed for the wallet to fill in.
pub fn build_commitment_transaction(
    wallet: &Pubkey,
    payload: &CommitmentPayload,
    recent_blockhash: &Hash,
) -> Transaction {
    let message = Message::new_with_blockhash(
        &commitment_instructions(wallet, payload),
        Some(wallet),
        recent_blockhash,
    );
    Transaction::new_unsigned(message)
}

/// Wire bytes of a transaction, bounded by the cluster's packet size.
pub fn serialize_transaction(transaction: &Transaction) -> Result<Vec<u8>, CommitmentError> {
    let bytes = bincode::serialize(transaction)?;
    if bytes.len() > PACKET_DATA_SIZE {
        return Err(CommitmentError::TooLarge(bytes.len()));
    }
    Ok(bytes)
}
