// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime wire format: outgoing client frames and incoming server events.

use serde::{Deserialize, Serialize};

/// Frames sent to the realtime endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientFrame {
    JoinRoom { room: String },
    LeaveRoom { room: String },
    SendMessage { room: String, message: OutgoingMessage },
    MarkRead { room: String, message_id: String },
}

/// Kind of chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Voice,
}

/// A message authored by this client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Client-generated id, echoed back by the server for reconciliation.
    pub id: String,
    pub kind: MessageKind,
    pub body: String,
    /// Kind-specific metadata (e.g. voice duration, attachment info).
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl OutgoingMessage {
    pub fn new(kind: MessageKind, body: impl Into<String>, metadata: serde_json::Value) -> Self {
        Self { id: uuid::Uuid::new_v4().to_string(), kind, body: body.into(), metadata }
    }
}

/// Events received from the realtime endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum RealtimeEvent {
    Message { room: String, message: IncomingMessage },
    Notification { id: String, title: String, body: String },
    RoomHistory { room: String, messages: Vec<IncomingMessage> },
}

/// A message delivered by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: String,
    pub sender_id: String,
    pub kind: MessageKind,
    pub body: String,
    /// Server receive time as epoch milliseconds.
    #[serde(default)]
    pub sent_at: u64,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

/// Decode an incoming text frame. Unknown or malformed frames are dropped.
pub fn decode_frame(text: &str) -> Option<RealtimeEvent> {
    match serde_json::from_str(text) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::debug!(err = %e, "ignoring unrecognized realtime frame");
            None
        }
    }
}

/// Build the realtime connection URL for a user, attaching the bearer token
/// as a query parameter when present.
pub fn build_connect_url(realtime_base: &str, user_id: &str, token: Option<&str>) -> String {
    let mut url = format!("{realtime_base}/realtime?userId={user_id}");
    if let Some(token) = token {
        url.push_str(&format!("&token={token}"));
    }
    url
}
