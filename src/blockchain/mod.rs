// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Solana integration for on-chain data commitments.
//!
//! This module provides functionality for:
//! - Building unsigned memo transactions for the user's wallet to sign
//! - Querying blockhashes, fees, balances and transaction status over RPC

pub mod client;
pub mod memo;
pub mod types;

pub use client::{SolanaClient, SolanaClientError};
pub use memo::{
    build_commitment_transaction, serialize_transaction, CommitmentError, CommitmentPayload,
    ContentDigest,
};
pub use types::*;
