// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The identity every handler works with.
//!
//! A [`UserIdentity`] comes either from a verified bearer token or, for the
//! personality quiz only, from a client session id when demo sessions are
//! enabled. Storage is always keyed by [`UserIdentity::subject`].

use crate::storage::NewUserProfile;

use super::AuthenticatedUser;

const DEMO_SUBJECT_PREFIX: &str = "demo_";
const DEMO_EMAIL_DOMAIN: &str = "echo.ai";
const DEMO_DISPLAY_NAME: &str = "Demo User";
const MAX_SESSION_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionIdError {
    #[error("sessionId must not be empty")]
    Empty,
    #[error("sessionId must be at most {MAX_SESSION_ID_LEN} characters")]
    TooLong,
    #[error("sessionId may only contain letters, digits, '-' and '_'")]
    InvalidCharacter,
}

/// Resolved caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    /// Stored as the profile's `auth0_id`.
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl UserIdentity {
    /// Synthetic identity for an anonymous quiz session.
    pub fn demo(session_id: &str) -> Result<Self, SessionIdError> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(SessionIdError::Empty);
        }
        if session_id.len() > MAX_SESSION_ID_LEN {
            return Err(SessionIdError::TooLong);
        }
        if !session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(SessionIdError::InvalidCharacter);
        }

        Ok(Self {
            subject: format!("{DEMO_SUBJECT_PREFIX}{session_id}"),
            email: format!("demo-{session_id}@{DEMO_EMAIL_DOMAIN}"),
            name: Some(DEMO_DISPLAY_NAME.to_string()),
            picture: None,
        })
    }

    pub fn is_demo(&self) -> bool {
        self.subject.starts_with(DEMO_SUBJECT_PREFIX)
    }

    /// Identity columns for get-or-create.
    pub fn as_new_profile(&self) -> NewUserProfile<'_> {
        NewUserProfile {
            auth0_id: &self.subject,
            email: &self.email,
            name: self.name.as_deref(),
            picture: self.picture.as_deref(),
        }
    }
}

impl From<AuthenticatedUser> for UserIdentity {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            subject: user.user_id,
            email: user.email.unwrap_or_default(),
            name: user.name,
            picture: user.picture,
        }
    }
}
