// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session event hub and subscription guard.
//!
//! AuthSession owns one broadcast channel of [`SessionEvent`]s. Every change
//! to the session is a transition on this channel — consumers (the realtime
//! auth watcher, cross-tab sync, UI redirect logic) subscribe here instead of
//! inspecting storage side effects.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::auth::UserProfile;

/// Events emitted by the session layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A login completed and a live token is in place.
    Login { user: UserProfile },
    /// The session was cleared by an explicit logout.
    Logout,
    /// A refresh produced a new access token. The session identity is
    /// unchanged; lifecycle watchers take no action on this.
    Refreshed,
    /// The durable session artifact is invalid: the session was cleared and
    /// the UI should route to the login screen.
    Expired,
}

/// Broadcast hub for session events.
pub struct SessionEvents {
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self { event_tx }
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Emit an event. Send errors (no subscribers) are ignored.
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a spawned event-handler task.
///
/// Dropping the guard aborts the handler, so a subscriber torn down with its
/// owning component can never fire afterwards or leak across reconnects.
pub struct Subscription {
    handle: tokio::task::JoinHandle<()>,
}

impl Subscription {
    pub fn new(handle: tokio::task::JoinHandle<()>) -> Self {
        Self { handle }
    }

    /// Explicitly end the subscription. Equivalent to dropping the guard.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawn a handler task over a broadcast receiver and return its guard.
///
/// Lagged receivers skip ahead; the task ends when the channel closes.
pub fn subscribe_with<T, F>(mut rx: broadcast::Receiver<T>, mut handler: F) -> Subscription
where
    T: Clone + Send + 'static,
    F: FnMut(T) + Send + 'static,
{
    let handle = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => handler(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!(skipped = n, "event subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
    Subscription::new(handle)
}
