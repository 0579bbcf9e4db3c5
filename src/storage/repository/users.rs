// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User profile repository.
//!
//! Profiles are keyed by an internal UUID and reachable through the unique
//! identity index (`auth0_id`). Grouped state (personality, voice, blockchain
//! commitment) is stored as optional sub-records so partial states cannot be
//! written.

use chrono::{DateTime, Utc};
use redb::{ReadableTable, Table};
use serde::{Deserialize, Serialize};

use crate::storage::database::{
    make_prefix, make_prefix_end, DbError, DbResult, EchoDatabase, DIARY_ENTRIES,
    IDENTITY_INDEX, USERS,
};

/// Result of the personality quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityResult {
    pub personality_type: String,
    pub dimensions: serde_json::Value,
    pub description: String,
    pub completed_at: DateTime<Utc>,
}

/// Cloned voice linked to the profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub voice_id: Option<String>,
    pub voice_name: Option<String>,
    pub sample_uploaded: bool,
}

/// Confirmed on-chain commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockchainCommitment {
    pub wallet_address: String,
    pub tx_signature: String,
    pub committed_at: DateTime<Utc>,
}

/// Stored user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub auth0_id: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub assistant_id: Option<String>,
    pub thread_id: Option<String>,
    pub personality: Option<PersonalityResult>,
    pub voice: Option<VoiceProfile>,
    pub blockchain: Option<BlockchainCommitment>,
    pub diary_entry_count: u32,
}

/// Identity columns for a profile that may not exist yet.
#[derive(Debug, Clone, Copy)]
pub struct NewUserProfile<'a> {
    pub auth0_id: &'a str,
    pub email: &'a str,
    pub name: Option<&'a str>,
    pub picture: Option<&'a str>,
}

impl UserProfile {
    fn create(new: &NewUserProfile<'_>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            auth0_id: new.auth0_id.to_string(),
            email: new.email.to_string(),
            name: new.name.map(str::to_string),
            picture: new.picture.map(str::to_string),
            created_at: now,
            updated_at: now,
            assistant_id: None,
            thread_id: None,
            personality: None,
            voice: None,
            blockchain: None,
            diary_entry_count: 0,
        }
    }

    /// Reset every mutable column, keeping identity columns.
    pub fn clear_mutable_state(&mut self) {
        self.assistant_id = None;
        self.thread_id = None;
        self.personality = None;
        self.voice = None;
        self.blockchain = None;
        self.diary_entry_count = 0;
        self.updated_at = Utc::now();
    }

    /// Whether any mutable column holds user data.
    pub fn has_user_data(&self) -> bool {
        self.assistant_id.is_some()
            || self.thread_id.is_some()
            || self.personality.is_some()
            || self.voice.is_some()
            || self.blockchain.is_some()
            || self.diary_entry_count > 0
    }

    pub fn personality_completed(&self) -> bool {
        self.personality.is_some()
    }
}

pub(crate) fn load_profile_by_auth(
    users: &impl ReadableTable<&'static str, &'static [u8]>,
    index: &impl ReadableTable<&'static str, &'static str>,
    auth0_id: &str,
) -> DbResult<Option<UserProfile>> {
    let Some(profile_id) = index.get(auth0_id)?.map(|v| v.value().to_string()) else {
        return Ok(None);
    };
    let bytes = users
        .get(profile_id.as_str())?
        .map(|v| v.value().to_vec())
        .ok_or_else(|| {
            DbError::Inconsistent(format!("identity {auth0_id} points to missing profile {profile_id}"))
        })?;
    Ok(Some(serde_json::from_slice(&bytes)?))
}

pub(crate) fn store_profile(
    users: &mut Table<&'static str, &'static [u8]>,
    profile: &UserProfile,
) -> DbResult<()> {
    let json = serde_json::to_vec(profile)?;
    users.insert(profile.id.as_str(), json.as_slice())?;
    Ok(())
}

/// Remove every diary entry owned by `profile_id`. Returns the count removed.
fn purge_diary(
    diary: &mut Table<&'static [u8], &'static [u8]>,
    profile_id: &str,
) -> DbResult<usize> {
    let start = make_prefix(profile_id);
    let end = make_prefix_end(profile_id);

    let keys: Vec<Vec<u8>> = diary
        .range(start.as_slice()..end.as_slice())?
        .map(|entry| entry.map(|(k, _)| k.value().to_vec()))
        .collect::<Result<_, _>>()?;

    for key in &keys {
        diary.remove(key.as_slice())?;
    }
    Ok(keys.len())
}

/// Repository for user profiles.
pub struct UserRepository<'a> {
    db: &'a EchoDatabase,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a EchoDatabase) -> Self {
        Self { db }
    }

    /// Look up a profile by internal id.
    pub fn get(&self, id: &str) -> DbResult<Option<UserProfile>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Look up a profile by identity provider subject.
    pub fn find_by_auth_id(&self, auth0_id: &str) -> DbResult<Option<UserProfile>> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(USERS)?;
        let index = read_txn.open_table(IDENTITY_INDEX)?;
        load_profile_by_auth(&users, &index, auth0_id)
    }

    /// Return the profile for `new.auth0_id`, creating it if missing.
    pub fn ensure(&self, new: &NewUserProfile<'_>) -> DbResult<UserProfile> {
        self.ensure_inner(new, None::<fn(&mut UserProfile)>)
            .map(|(profile, _)| profile)
    }

    /// Get-or-create then mutate, in one write transaction.
    pub fn ensure_and_update<F>(&self, new: &NewUserProfile<'_>, update: F) -> DbResult<UserProfile>
    where
        F: FnOnce(&mut UserProfile),
    {
        self.ensure_inner(new, Some(update)).map(|(profile, _)| profile)
    }

    /// Like [`Self::ensure_and_update`], also reporting whether the profile
    /// was created by this call.
    pub fn ensure_tracked<F>(
        &self,
        new: &NewUserProfile<'_>,
        update: Option<F>,
    ) -> DbResult<(UserProfile, bool)>
    where
        F: FnOnce(&mut UserProfile),
    {
        self.ensure_inner(new, update)
    }

    fn ensure_inner<F>(
        &self,
        new: &NewUserProfile<'_>,
        update: Option<F>,
    ) -> DbResult<(UserProfile, bool)>
    where
        F: FnOnce(&mut UserProfile),
    {
        let write_txn = self.db.begin_write()?;
        let (profile, created) = {
            let mut users = write_txn.open_table(USERS)?;
            let mut index = write_txn.open_table(IDENTITY_INDEX)?;

            let (mut profile, created) = match load_profile_by_auth(&users, &index, new.auth0_id)? {
                Some(existing) => (existing, false),
                None => {
                    let fresh = UserProfile::create(new);
                    index.insert(new.auth0_id, fresh.id.as_str())?;
                    tracing::info!(profile_id = %fresh.id, "Created user profile");
                    (fresh, true)
                }
            };

            let mut dirty = created;
            if let Some(update) = update {
                update(&mut profile);
                profile.updated_at = Utc::now();
                dirty = true;
            }

            if dirty {
                store_profile(&mut users, &profile)?;
            }
            (profile, created)
        };
        write_txn.commit()?;
        Ok((profile, created))
    }

    /// Mutate an existing profile.
    pub fn update<F>(&self, auth0_id: &str, update: F) -> DbResult<UserProfile>
    where
        F: FnOnce(&mut UserProfile),
    {
        let write_txn = self.db.begin_write()?;
        let profile = {
            let mut users = write_txn.open_table(USERS)?;
            let index = write_txn.open_table(IDENTITY_INDEX)?;

            let mut profile = load_profile_by_auth(&users, &index, auth0_id)?
                .ok_or_else(|| DbError::NotFound(format!("User {auth0_id}")))?;
            update(&mut profile);
            profile.updated_at = Utc::now();
            store_profile(&mut users, &profile)?;
            profile
        };
        write_txn.commit()?;
        Ok(profile)
    }

    /// Delete the user's diary entries and reset the profile's mutable columns.
    ///
    /// Both steps commit together or not at all. A profile with nothing left
    /// to clear is `NotFound`, so a repeated call reports not-found.
    pub fn clear_data(&self, auth0_id: &str) -> DbResult<UserProfile> {
        let write_txn = self.db.begin_write()?;
        let (profile, removed) = {
            let mut users = write_txn.open_table(USERS)?;
            let index = write_txn.open_table(IDENTITY_INDEX)?;
            let mut diary = write_txn.open_table(DIARY_ENTRIES)?;

            let mut profile = load_profile_by_auth(&users, &index, auth0_id)?
                .ok_or_else(|| DbError::NotFound(format!("User {auth0_id}")))?;

            let removed = purge_diary(&mut diary, &profile.id)?;
            if removed == 0 && !profile.has_user_data() {
                return Err(DbError::NotFound(format!("User data for {auth0_id}")));
            }
            profile.clear_mutable_state();
            store_profile(&mut users, &profile)?;
            (profile, removed)
        };
        write_txn.commit()?;

        tracing::info!(profile_id = %profile.id, diary_entries = removed, "Cleared user data");
        Ok(profile)
    }

    /// Delete the user's diary entries and the profile itself.
    pub fn delete(&self, auth0_id: &str) -> DbResult<()> {
        let write_txn = self.db.begin_write()?;
        let (profile_id, removed) = {
            let mut users = write_txn.open_table(USERS)?;
            let mut index = write_txn.open_table(IDENTITY_INDEX)?;
            let mut diary = write_txn.open_table(DIARY_ENTRIES)?;

            let profile = load_profile_by_auth(&users, &index, auth0_id)?
                .ok_or_else(|| DbError::NotFound(format!("User {auth0_id}")))?;

            let removed = purge_diary(&mut diary, &profile.id)?;
            users.remove(profile.id.as_str())?;
            index.remove(auth0_id)?;
            (profile.id, removed)
        };
        write_txn.commit()?;

        tracing::info!(profile_id = %profile_id, diary_entries = removed, "Deleted user profile");
        Ok(())
    }
}
