// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Echo - Personal Data Service
//!
//! Stores a user's personality result, diary entries and cloned voice, and
//! lets the user anchor digests of that data on Solana with a memo
//! transaction signed by their own wallet.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Auth0 JWT verification and caller identity
//! - `blockchain` - Solana memo transactions and RPC client
//! - `providers` - ElevenLabs voice cloning and speech synthesis
//! - `storage` - Embedded profile database (redb) and audit log

pub mod api;
pub mod auth;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod models;
pub mod providers;
pub mod state;
pub mod storage;

#[cfg(test)]
mod test_support;
