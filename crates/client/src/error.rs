// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the session and realtime layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors surfaced to callers of the client API.
#[derive(Debug)]
pub enum ClientError {
    /// Login rejected: wrong email/password. No session state was changed.
    InvalidCredentials,
    /// The request was denied even after one refresh-and-replay cycle.
    Unauthorized,
    /// The durable session artifact is gone: the session has been cleared
    /// and a `SessionEvent::Expired` was emitted.
    SessionExpired,
    /// The backend answered with a non-auth error envelope.
    Backend { status: u16, code: String, message: String },
    /// Network/transport failure. Never retried by the HTTP layer.
    Transport(String),
    /// The request exceeded its fixed timeout.
    Timeout,
}

impl ClientError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::Backend { .. } => "BACKEND_ERROR",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Timeout => "TIMEOUT",
        }
    }

    /// True for the errors that participate in the refresh protocol.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::SessionExpired)
    }

    /// Map a reqwest failure into the taxonomy.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend { status, code, message } => {
                write!(f, "backend error {status} ({code}): {message}")
            }
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            _ => f.write_str(self.as_str()),
        }
    }
}

impl std::error::Error for ClientError {}

/// Top-level error response envelope used by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error body with machine-readable code and human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Decode a backend error body into a [`ClientError::Backend`].
///
/// Falls back to the raw text when the body is not the standard envelope.
pub fn backend_error(status: u16, body: &str) -> ClientError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(resp) => ClientError::Backend {
            status,
            code: resp.error.code,
            message: resp.error.message,
        },
        Err(_) => ClientError::Backend {
            status,
            code: "UNKNOWN".to_owned(),
            message: body.to_owned(),
        },
    }
}
