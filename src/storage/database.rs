// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded profile database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: profile id → serialized UserProfile
//! - `identity_index`: external identity (`auth0_id`) → profile id
//! - `diary_entries`: composite key (profile_id|!timestamp|entry_id) → serialized DiaryEntry
//! - `audit_events`: composite key (subject|!timestamp|event_id) → serialized AuditEvent
//!
//! Every multi-table mutation (diary insert plus entry count, clear, delete)
//! runs inside a single write transaction.

use std::path::Path;

use redb::{
    Database, ReadTransaction, ReadableDatabase, TableDefinition, WriteTransaction,
};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: profile id → UserProfile (JSON bytes).
pub(crate) const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Unique index: identity provider subject → profile id.
pub(crate) const IDENTITY_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("identity_index");

/// Diary entries keyed for newest-first prefix scans per profile.
pub(crate) const DIARY_ENTRIES: TableDefinition<&[u8], &[u8]> =
    TableDefinition::new("diary_entries");

/// Audit trail keyed for newest-first prefix scans per subject.
pub(crate) const AUDIT_EVENTS: TableDefinition<&[u8], &[u8]> =
    TableDefinition::new("audit_events");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("inconsistent data: {0}")]
    Inconsistent(String),
}

pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Composite Keys
// =============================================================================

/// Build `owner | inverted_timestamp_be | id`.
///
/// The inverted timestamp makes a forward scan return newest entries first.
pub(crate) fn make_scoped_key(owner: &str, timestamp_micros: i64, id: &str) -> Vec<u8> {
    let inverted = u64::MAX - timestamp_micros.max(0) as u64;
    let mut key = Vec::with_capacity(owner.len() + 1 + 8 + 1 + id.len());
    key.extend_from_slice(owner.as_bytes());
    key.push(b'|');
    key.extend_from_slice(&inverted.to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(id.as_bytes());
    key
}

/// Lower bound for all keys of `owner`.
pub(crate) fn make_prefix(owner: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(owner.len() + 1);
    prefix.extend_from_slice(owner.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Upper bound for all keys of `owner` (prefix plus 0xFF padding).
pub(crate) fn make_prefix_end(owner: &str) -> Vec<u8> {
    let mut end = make_prefix(owner);
    end.extend_from_slice(&[0xFF; 20]);
    end
}

// =============================================================================
// EchoDatabase
// =============================================================================

/// Embedded ACID database holding all persisted Echo state.
pub struct EchoDatabase {
    db: Database,
}

impl EchoDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(IDENTITY_INDEX)?;
            let _ = write_txn.open_table(DIARY_ENTRIES)?;
            let _ = write_txn.open_table(AUDIT_EVENTS)?;
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "Opened profile database");
        Ok(Self { db })
    }

    pub(crate) fn begin_read(&self) -> DbResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    pub(crate) fn begin_write(&self) -> DbResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Readiness probe: a read transaction can open the primary table.
    pub fn check(&self) -> DbResult<()> {
        let read_txn = self.begin_read()?;
        let _ = read_txn.open_table(USERS)?;
        Ok(())
    }
}
