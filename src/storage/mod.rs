// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state lives in a single embedded redb file (see
//! [`database::EchoDatabase`]). Typed access goes through the repositories in
//! [`repository`]; the audit trail lives in [`audit`].
//!
//! ## Storage Layout
//!
//! ```text
//! {ECHO_DATA_DIR}/
//!   echo.redb
//!     users            profile id -> UserProfile
//!     identity_index   auth0_id   -> profile id
//!     diary_entries    profile|!ts|id -> DiaryEntry
//!     audit_events     subject|!ts|id -> AuditEvent
//! ```

pub mod audit;
pub mod database;
pub mod repository;

pub use audit::{AuditEvent, AuditEventType, AuditRepository};
pub use database::{DbError, DbResult, EchoDatabase};
pub use repository::{
    BlockchainCommitment, DiaryEntry, DiaryRepository, NewUserProfile, PersonalityResult,
    UserProfile, UserRepository, VoiceProfile,
};
