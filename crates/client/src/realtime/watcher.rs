// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auth-linked connection lifecycle.
//!
//! Watches the session event channel and drives the realtime connection:
//! a login connects, a logout or expiry disconnects. Session events are
//! transitions by construction, so the watcher cannot thrash on repeated
//! polls or re-renders.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::events::SessionEvent;
use crate::realtime::RealtimeConnection;

/// The slice of the connection the watcher needs. Split out so the watcher
/// is testable without a socket.
///
/// Operations are awaited by the watcher loop, so a login followed by a
/// logout always executes connect before disconnect — they never race.
pub trait ConnectionControl: Send + Sync {
    fn request_connect(&self, user_id: &str) -> impl Future<Output = ()> + Send;
    fn request_disconnect(&self) -> impl Future<Output = ()> + Send;
}

impl ConnectionControl for Arc<RealtimeConnection> {
    async fn request_connect(&self, user_id: &str) {
        self.connect(user_id).await;
    }

    async fn request_disconnect(&self) {
        self.disconnect().await;
    }
}

/// Spawn the watcher task. Ends on cancellation or channel close.
pub fn spawn_auth_watcher<C>(
    mut events_rx: broadcast::Receiver<SessionEvent>,
    control: C,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()>
where
    C: ConnectionControl + 'static,
{
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = events_rx.recv() => event,
            };
            match event {
                Ok(SessionEvent::Login { user }) => {
                    tracing::debug!(user_id = %user.id, "auth watcher: connecting realtime");
                    control.request_connect(&user.id).await;
                }
                Ok(SessionEvent::Logout) | Ok(SessionEvent::Expired) => {
                    tracing::debug!("auth watcher: disconnecting realtime");
                    control.request_disconnect().await;
                }
                Ok(SessionEvent::Refreshed) => {
                    // Identity unchanged; the connection stays as it is.
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!(skipped = n, "auth watcher lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
