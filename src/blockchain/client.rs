// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Solana RPC client for the commitment flow.

use std::time::Duration;

use serde_json::json;
use solana_commitment_config::CommitmentConfig;
use solana_message::Message;
use solana_pubkey::Pubkey;
use solana_rpc_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::{config::RpcTransactionConfig, request::RpcRequest};
use solana_signature::Signature;
use solana_transaction_status_client_types::{
    EncodedConfirmedTransactionWithStatusMeta, UiTransactionEncoding,
};

use super::types::*;

const RPC_TIMEOUT: Duration = Duration::from_secs(15);

/// Solana RPC client.
pub struct SolanaClient {
    cluster: Cluster,
    rpc_url: String,
    rpc: RpcClient,
}

impl SolanaClient {
    /// Create a new client for the given cluster and endpoint.
    pub fn new(cluster: Cluster, rpc_url: impl Into<String>) -> Result<Self, SolanaClientError> {
        let rpc_url = rpc_url.into();
        url::Url::parse(&rpc_url).map_err(|e| SolanaClientError::InvalidRpcUrl(e.to_string()))?;

        let rpc = RpcClient::new_with_timeout_and_commitment(
            rpc_url.clone(),
            RPC_TIMEOUT,
            CommitmentConfig::confirmed(),
        );

        Ok(Self {
            cluster,
            rpc_url,
            rpc,
        })
    }

    /// Create a client against the cluster's public endpoint.
    pub fn for_cluster(cluster: Cluster) -> Result<Self, SolanaClientError> {
        Self::new(cluster, cluster.rpc_url())
    }

    pub fn cluster(&self) -> Cluster {
        self.cluster
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Fetch a recent blockhash at `confirmed` commitment.
    pub async fn get_latest_blockhash(&self) -> Result<LatestBlockhash, SolanaClientError> {
        let (blockhash, last_valid_block_height) = self
            .rpc
            .get_latest_blockhash_with_commitment(CommitmentConfig::confirmed())
            .await
            .map_err(|e| SolanaClientError::Rpc(e.to_string()))?;

        Ok(LatestBlockhash {
            blockhash,
            last_valid_block_height,
        })
    }

    /// Fee the cluster would charge for a message.
    ///
    /// Fails when the node cannot price it, for example on an expired blockhash.
    pub async fn get_fee_for_message(&self, message: &Message) -> Result<u64, SolanaClientError> {
        self.rpc
            .get_fee_for_message(message)
            .await
            .map_err(|e| SolanaClientError::Rpc(e.to_string()))
    }

    /// Native balance in lamports.
    pub async fn get_balance(&self, address: &Pubkey) -> Result<AccountBalance, SolanaClientError> {
        let lamports = self
            .rpc
            .get_balance(address)
            .await
            .map_err(|e| SolanaClientError::Rpc(e.to_string()))?;

        Ok(AccountBalance {
            address: address.to_string(),
            cluster: self.cluster,
            lamports,
            sol: format_sol(lamports),
        })
    }

    /// Look up a transaction by signature. `None` if the node does not know it.
    pub async fn get_transaction(
        &self,
        signature: &Signature,
    ) -> Result<Option<TransactionDetails>, SolanaClientError> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };

        tracing::debug!(%signature, "Solana getTransaction");

        // `getTransaction` answers `null` for unknown signatures, which the
        // typed helper reports as a decode error.
        let response: Option<EncodedConfirmedTransactionWithStatusMeta> = self
            .rpc
            .send(
                RpcRequest::GetTransaction,
                json!([signature.to_string(), config]),
            )
            .await
            .map_err(|e| SolanaClientError::Rpc(e.to_string()))?;

        response
            .map(|tx| self.describe(signature, tx))
            .transpose()
    }

    fn describe(
        &self,
        signature: &Signature,
        tx: EncodedConfirmedTransactionWithStatusMeta,
    ) -> Result<TransactionDetails, SolanaClientError> {
        let decoded = tx.transaction.transaction.decode().ok_or_else(|| {
            SolanaClientError::InvalidResponse("undecodable transaction".to_string())
        })?;
        let account_keys = decoded.message.static_account_keys();
        let fee_payer = account_keys.first().ok_or_else(|| {
            SolanaClientError::InvalidResponse("transaction has no account keys".to_string())
        })?;
        let has_memo = decoded.message.instructions().iter().any(|ix| {
            account_keys
                .get(usize::from(ix.program_id_index))
                .is_some_and(is_memo_program)
        });

        let (success, fee_lamports) = match &tx.transaction.meta {
            Some(meta) => (meta.err.is_none(), meta.fee),
            None => (false, 0),
        };
        let signature = signature.to_string();

        Ok(TransactionDetails {
            explorer_url: self.cluster.explorer_tx_url(&signature),
            signature,
            slot: tx.slot,
            block_time: tx.block_time,
            fee_lamports,
            success,
            fee_payer: fee_payer.to_string(),
            has_memo,
        })
    }
}

/// Either version of the SPL Memo program.
fn is_memo_program(program_id: &Pubkey) -> bool {
    *program_id == spl_memo::id() || *program_id == spl_memo::v1::id()
}

/// Solana client errors.
#[derive(Debug, thiserror::Error)]
pub enum SolanaClientError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Unexpected RPC response: {0}")]
    InvalidResponse(String),
}
