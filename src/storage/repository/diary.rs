// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Diary entry repository.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::users::{load_profile_by_auth, store_profile};
use crate::storage::database::{
    make_prefix, make_prefix_end, make_scoped_key, DbError, DbResult, EchoDatabase,
    DIARY_ENTRIES, IDENTITY_INDEX, USERS,
};

/// A stored diary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DiaryEntry {
    pub id: String,
    /// Owning profile id.
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

pub struct DiaryRepository<'a> {
    db: &'a EchoDatabase,
}

impl<'a> DiaryRepository<'a> {
    pub fn new(db: &'a EchoDatabase) -> Self {
        Self { db }
    }

    /// Append an entry for the given identity and bump the profile's entry count.
    pub fn create(&self, auth0_id: &str, content: &str) -> DbResult<DiaryEntry> {
        let write_txn = self.db.begin_write()?;
        let entry = {
            let mut users = write_txn.open_table(USERS)?;
            let index = write_txn.open_table(IDENTITY_INDEX)?;
            let mut diary = write_txn.open_table(DIARY_ENTRIES)?;

            let mut profile = load_profile_by_auth(&users, &index, auth0_id)?
                .ok_or_else(|| DbError::NotFound(format!("User {auth0_id}")))?;

            let entry = DiaryEntry {
                id: uuid::Uuid::new_v4().to_string(),
                user_id: profile.id.clone(),
                content: content.to_string(),
                created_at: Utc::now(),
            };
            let key = make_scoped_key(&profile.id, entry.created_at.timestamp_micros(), &entry.id);
            let json = serde_json::to_vec(&entry)?;
            diary.insert(key.as_slice(), json.as_slice())?;

            profile.diary_entry_count = profile.diary_entry_count.saturating_add(1);
            profile.updated_at = entry.created_at;
            store_profile(&mut users, &profile)?;
            entry
        };
        write_txn.commit()?;
        Ok(entry)
    }

    /// All entries of a profile, newest first.
    pub fn list(&self, profile_id: &str) -> DbResult<Vec<DiaryEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DIARY_ENTRIES)?;

        let start = make_prefix(profile_id);
        let end = make_prefix_end(profile_id);

        let mut entries = Vec::new();
        for item in table.range(start.as_slice()..end.as_slice())? {
            let (_, value) = item?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        Ok(entries)
    }
}
