// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Auth0 JWT authentication for the Echo API.
//!
//! ## Auth Flow
//!
//! 1. The frontend signs the user in with Auth0
//! 2. The frontend sends `Authorization: Bearer <Auth0 JWT>`
//! 3. The server:
//!    - Fetches the tenant JWKS via HTTPS (cached)
//!    - Verifies JWT signature, expiry, issuer, audience
//!    - Extracts `sub` (stored as the profile's `auth0_id`), email, name
//!      and picture
//! 4. Handlers turn the result into a [`UserIdentity`]
//!
//! Clock skew tolerance is 60 seconds.

pub mod claims;
pub mod error;
pub mod extractor;
pub mod identity;
pub mod jwks;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::{Auth, OptionalAuth};
pub use identity::{SessionIdError, UserIdentity};
pub use jwks::JwksManager;
