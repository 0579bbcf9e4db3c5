// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for data-changing operations.
//!
//! Profile changes, voice cloning, ledger commitments and destructive account
//! operations are appended to the `audit_events` table, keyed per subject so a
//! user's activity can be listed newest first.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::database::{
    make_prefix, make_prefix_end, make_scoped_key, DbResult, EchoDatabase, AUDIT_EVENTS,
};

/// Subject used for events not tied to a user.
const SYSTEM_SUBJECT: &str = "system";

/// Types of auditable events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Profile events
    ProfileCreated,
    PersonalitySaved,
    DiaryEntryCreated,

    // Voice events
    VoiceCloned,
    SpeechSynthesized,

    // Ledger events
    CommitmentPrepared,
    CommitmentConfirmed,

    // Account lifecycle
    DataCleared,
    AccountDeleted,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// Identity that triggered the event (if known).
    pub user_id: Option<String>,
    /// Resource affected (profile id, voice id, signature, ...).
    pub resource_id: Option<String>,
    /// Resource type (profile, voice, transaction, ...).
    pub resource_type: Option<String>,
    /// Additional details as JSON.
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error message if operation failed.
    pub error: Option<String>,
}

impl AuditEvent {
    /// Create a new audit event.
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            user_id: None,
            resource_id: None,
            resource_type: None,
            details: None,
            success: true,
            error: None,
        }
    }

    /// Set the user ID.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the resource.
    pub fn with_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Add details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// Repository for audit events.
pub struct AuditRepository<'a> {
    db: &'a EchoDatabase,
}

impl<'a> AuditRepository<'a> {
    /// Create a new audit repository.
    pub fn new(db: &'a EchoDatabase) -> Self {
        Self { db }
    }

    /// Append an audit event.
    pub fn log(&self, event: &AuditEvent) -> DbResult<()> {
        let subject = event.user_id.as_deref().unwrap_or(SYSTEM_SUBJECT);
        let key = make_scoped_key(subject, event.timestamp.timestamp_micros(), &event.event_id);
        let json = serde_json::to_vec(event)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(AUDIT_EVENTS)?;
            table.insert(key.as_slice(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Most recent events for a subject, newest first.
    pub fn list_by_user(&self, user_id: &str, limit: usize) -> DbResult<Vec<AuditEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUDIT_EVENTS)?;

        let start = make_prefix(user_id);
        let end = make_prefix_end(user_id);

        let mut events = Vec::new();
        for item in table.range(start.as_slice()..end.as_slice())? {
            if events.len() >= limit {
                break;
            }
            let (_, value) = item?;
            events.push(serde_json::from_slice(value.value())?);
        }
        Ok(events)
    }
}

/// Helper macro for logging audit events.
///
/// Failures are logged and never fail the request.
#[macro_export]
macro_rules! audit_log {
    (@write $db:expr, $event:expr) => {{
        let repo = $crate::storage::AuditRepository::new($db);
        if let Err(e) = repo.log(&$event) {
            tracing::warn!(error = %e, "Failed to write audit event");
        }
    }};
    ($db:expr, $event_type:expr, $identity:expr) => {{
        let event = $crate::storage::AuditEvent::new($event_type).with_user(&$identity.subject);
        $crate::audit_log!(@write $db, event);
    }};
    ($db:expr, $event_type:expr, $identity:expr, $resource_type:expr, $resource_id:expr) => {{
        let event = $crate::storage::AuditEvent::new($event_type)
            .with_user(&$identity.subject)
            .with_resource($resource_type, $resource_id);
        $crate::audit_log!(@write $db, event);
    }};
}
