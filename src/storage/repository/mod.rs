// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the profile database.
//!
//! Each repository borrows the [`EchoDatabase`](crate::storage::EchoDatabase)
//! and wraps every mutation in its own write transaction.

pub mod diary;
pub mod users;

pub use diary::{DiaryEntry, DiaryRepository};
pub use users::{
    BlockchainCommitment, NewUserProfile, PersonalityResult, UserProfile, UserRepository,
    VoiceProfile,
};
