// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated session: token store, profile mirror, and the session
//! state machine.
//!
//! The access token lives only in process memory ([`token::TokenStore`]).
//! The durable session artifact is a cookie managed by reqwest's cookie
//! store — it is never readable by crate consumers. Only a lightweight user
//! profile is mirrored to disk, and only for display fallback.

pub mod jar;
pub mod persist;
pub mod session;
pub mod token;

use serde::{Deserialize, Serialize};

/// Last-known identity for the signed-in user.
///
/// Authority rests with a live access token; this profile alone never makes
/// `is_authenticated` true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    /// Role identifier: "admin", "teacher", "student", etc.
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    Anonymous,
    Authenticating,
    Authenticated,
    Refreshing,
}

// -- Auth endpoint wire types --------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IntrospectResponse {
    pub user: UserProfile,
}
