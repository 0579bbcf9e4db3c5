// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use solana_hash::Hash;
use utoipa::ToSchema;

/// Lamports per SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Maximum serialized transaction size accepted by the cluster.
pub const PACKET_DATA_SIZE: usize = 1232;

/// Solana cluster the service commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Cluster {
    MainnetBeta,
    Testnet,
    Devnet,
}

impl Cluster {
    /// Public JSON-RPC endpoint.
    pub fn rpc_url(&self) -> &'static str {
        match self {
            Cluster::MainnetBeta => "https://api.mainnet-beta.solana.com",
            Cluster::Testnet => "https://api.testnet.solana.com",
            Cluster::Devnet => "https://api.devnet.solana.com",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Cluster::MainnetBeta => "mainnet-beta",
            Cluster::Testnet => "testnet",
            Cluster::Devnet => "devnet",
        }
    }

    /// Solana Explorer link for a transaction signature.
    pub fn explorer_tx_url(&self, signature: &str) -> String {
        match self {
            Cluster::MainnetBeta => format!("https://explorer.solana.com/tx/{signature}"),
            other => format!(
                "https://explorer.solana.com/tx/{signature}?cluster={}",
                other.as_str()
            ),
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cluster {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet-beta" | "mainnet" => Ok(Cluster::MainnetBeta),
            "testnet" => Ok(Cluster::Testnet),
            "devnet" => Ok(Cluster::Devnet),
            other => Err(format!(
                "unknown cluster `{other}` (expected mainnet-beta, testnet or devnet)"
            )),
        }
    }
}

/// Latest blockhash with its expiry height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestBlockhash {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// On-ledger status of a transaction.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetails {
    pub signature: String,
    pub slot: u64,
    /// Unix seconds, when the node reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_time: Option<i64>,
    pub fee_lamports: u64,
    pub success: bool,
    /// First account key of the message.
    pub fee_payer: String,
    /// Whether any instruction invokes the SPL Memo program.
    pub has_memo: bool,
    pub explorer_url: String,
}

/// Native balance of an account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub address: String,
    pub cluster: Cluster,
    pub lamports: u64,
    /// Balance in SOL with nine decimals.
    pub sol: String,
}

/// Format lamports as SOL with full precision.
pub fn format_sol(lamports: u64) -> String {
    let whole = lamports / LAMPORTS_PER_SOL;
    let frac = lamports % LAMPORTS_PER_SOL;
    format!("{whole}.{frac:09}")
}
