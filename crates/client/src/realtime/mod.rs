// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime connection: lifecycle, bounded retry with cooldown, rooms,
//! and typed event fan-out.
//!
//! One socket per process. The run loop owns every retry and cooldown timer;
//! `disconnect` always wins by cancelling the loop's token, which also kills
//! any pending retry sleep.

pub mod retry;
pub mod watcher;
pub mod wire;

use std::sync::Arc;
use std::time::Instant;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::events::{subscribe_with, Subscription};
use crate::realtime::retry::{Backoff, Gate, RetryPolicy};
use crate::realtime::wire::{
    build_connect_url, decode_frame, ClientFrame, MessageKind, OutgoingMessage, RealtimeEvent,
};

/// Connection status pages may display. Never thrown at callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// State for the currently active (or connecting) socket.
struct ActiveConn {
    user_id: String,
    cancel: CancellationToken,
    outbound: mpsc::UnboundedSender<ClientFrame>,
}

/// Why the pump loop ended.
enum PumpEnd {
    Cancelled,
    Dropped,
}

/// The realtime connection manager.
pub struct RealtimeConnection {
    config: ClientConfig,
    token_rx: watch::Receiver<Option<String>>,
    status_tx: watch::Sender<ConnectionStatus>,
    events_tx: broadcast::Sender<RealtimeEvent>,
    policy: Mutex<RetryPolicy>,
    active: Mutex<Option<ActiveConn>>,
    last_connect: Mutex<Option<Instant>>,
}

impl RealtimeConnection {
    pub fn new(config: ClientConfig, token_rx: watch::Receiver<Option<String>>) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        let (events_tx, _) = broadcast::channel(256);
        let policy = RetryPolicy::new(
            config.reconnect_ceiling,
            config.reconnect_delay(),
            config.cooldown(),
        );
        Self {
            config,
            token_rx,
            status_tx,
            events_tx,
            policy: Mutex::new(policy),
            active: Mutex::new(None),
            last_connect: Mutex::new(None),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status_tx.borrow()
    }

    /// Watch status transitions.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    /// Subscribe to incoming realtime events.
    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.events_tx.subscribe()
    }

    /// Subscribe with a handler; the returned guard unsubscribes on drop.
    pub fn subscribe_with<F>(&self, handler: F) -> Subscription
    where
        F: FnMut(RealtimeEvent) + Send + 'static,
    {
        subscribe_with(self.events_tx.subscribe(), handler)
    }

    /// Open (or keep) the connection for a user.
    ///
    /// No-op when already connected/connecting for the same user, inside the
    /// debounce window, or inside a cooldown window.
    pub async fn connect(self: &Arc<Self>, user_id: &str) {
        let now = Instant::now();

        {
            let active = self.active.lock().await;
            if let Some(conn) = active.as_ref() {
                if conn.user_id == user_id && !conn.cancel.is_cancelled() {
                    return;
                }
            }
        }

        // Coalesce bursts of connect calls into one attempt.
        {
            let mut last = self.last_connect.lock().await;
            if last.is_some_and(|t| now.duration_since(t) < self.config.connect_debounce()) {
                return;
            }
            *last = Some(now);
        }

        {
            let mut policy = self.policy.lock().await;
            if let Gate::CoolingDown { remaining } = policy.check(now) {
                tracing::debug!(
                    remaining_ms = remaining.as_millis() as u64,
                    "realtime connect refused, in cooldown"
                );
                return;
            }
        }

        // A different user's socket gets torn down first.
        {
            let mut active = self.active.lock().await;
            if let Some(old) = active.take() {
                old.cancel.cancel();
            }

            let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
            let cancel = CancellationToken::new();
            *active = Some(ActiveConn {
                user_id: user_id.to_owned(),
                cancel: cancel.clone(),
                outbound: outbound_tx,
            });

            let conn = Arc::clone(self);
            let uid = user_id.to_owned();
            tokio::spawn(async move {
                conn.run_loop(uid, outbound_rx, cancel).await;
            });
        }
    }

    /// Tear everything down. Always wins: cancels the run loop (and with it
    /// any pending retry sleep), resets the retry policy, and is never
    /// treated as an error.
    pub async fn disconnect(&self) {
        let conn = self.active.lock().await.take();
        if let Some(conn) = conn {
            conn.cancel.cancel();
        }
        self.policy.lock().await.reset();
        let _ = self.status_tx.send_replace(ConnectionStatus::Disconnected);
        tracing::debug!("realtime disconnected");
    }

    pub async fn join_room(&self, room: &str) -> Result<(), ClientError> {
        self.send_frame(ClientFrame::JoinRoom { room: room.to_owned() }).await
    }

    pub async fn leave_room(&self, room: &str) -> Result<(), ClientError> {
        self.send_frame(ClientFrame::LeaveRoom { room: room.to_owned() }).await
    }

    pub async fn mark_read(&self, room: &str, message_id: &str) -> Result<(), ClientError> {
        self.send_frame(ClientFrame::MarkRead {
            room: room.to_owned(),
            message_id: message_id.to_owned(),
        })
        .await
    }

    /// Send a chat message; returns the client-generated message id.
    pub async fn send_message(
        &self,
        room: &str,
        kind: MessageKind,
        body: &str,
        metadata: serde_json::Value,
    ) -> Result<String, ClientError> {
        let message = OutgoingMessage::new(kind, body, metadata);
        let id = message.id.clone();
        self.send_frame(ClientFrame::SendMessage { room: room.to_owned(), message }).await?;
        Ok(id)
    }

    async fn send_frame(&self, frame: ClientFrame) -> Result<(), ClientError> {
        let active = self.active.lock().await;
        let Some(conn) = active.as_ref() else {
            return Err(ClientError::Transport("realtime connection is not open".to_owned()));
        };
        conn.outbound
            .send(frame)
            .map_err(|_| ClientError::Transport("realtime connection closed".to_owned()))
    }

    /// Connection supervisor: attempt, pump, back off, repeat.
    async fn run_loop(
        self: Arc<Self>,
        user_id: String,
        mut outbound_rx: mpsc::UnboundedReceiver<ClientFrame>,
        cancel: CancellationToken,
    ) {
        loop {
            if cancel.is_cancelled() {
                break;
            }

            let attempt = {
                let mut policy = self.policy.lock().await;
                match policy.check(Instant::now()) {
                    Gate::Allow => {
                        policy.on_attempt();
                        policy.retry_count()
                    }
                    Gate::CoolingDown { .. } => break,
                }
            };

            let _ = self.status_tx.send_replace(ConnectionStatus::Connecting);
            let token = self.token_rx.borrow().clone();
            let url = build_connect_url(&self.config.realtime_base(), &user_id, token.as_deref());

            let connected = tokio::select! {
                _ = cancel.cancelled() => break,
                result = tokio::time::timeout(
                    self.config.connect_timeout(),
                    tokio_tungstenite::connect_async(&url),
                ) => match result {
                    Ok(Ok((ws, _))) => Some(ws),
                    Ok(Err(e)) => {
                        tracing::debug!(%user_id, attempt, err = %e, "realtime connect failed");
                        None
                    }
                    Err(_) => {
                        tracing::debug!(%user_id, attempt, "realtime connect timed out");
                        None
                    }
                },
            };

            if let Some(ws) = connected {
                self.policy.lock().await.on_success();
                let _ = self.status_tx.send_replace(ConnectionStatus::Connected);
                tracing::info!(%user_id, "realtime connected");

                match self.pump(ws, &mut outbound_rx, &cancel).await {
                    PumpEnd::Cancelled => break,
                    PumpEnd::Dropped => {
                        tracing::debug!(%user_id, "realtime connection dropped");
                    }
                }
            }

            let _ = self.status_tx.send_replace(ConnectionStatus::Error);
            let backoff = self.policy.lock().await.on_failure(Instant::now());
            match backoff {
                Backoff::RetryAfter(delay) => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Backoff::CooldownUntil(_) => {
                    tracing::warn!(
                        %user_id,
                        cooldown_ms = self.config.cooldown_ms,
                        "realtime retries exhausted, entering cooldown"
                    );
                    break;
                }
            }
        }

        // Loop over: park as disconnected unless a newer connection took over.
        let mut active = self.active.lock().await;
        if cancel.is_cancelled() {
            let superseded = active.as_ref().is_some_and(|conn| !conn.cancel.is_cancelled());
            if !superseded {
                let _ = self.status_tx.send_replace(ConnectionStatus::Disconnected);
            }
        } else {
            // Exited on our own (cooldown): drop the registration so a
            // connect after the window can start fresh.
            active.take();
            let _ = self.status_tx.send_replace(ConnectionStatus::Disconnected);
        }
    }

    /// Pump the open socket: forward outbound frames, decode inbound events.
    async fn pump(
        &self,
        ws: tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        outbound_rx: &mut mpsc::UnboundedReceiver<ClientFrame>,
        cancel: &CancellationToken,
    ) -> PumpEnd {
        let (mut write, mut read) = ws.split();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return PumpEnd::Cancelled,

                frame = outbound_rx.recv() => {
                    let Some(frame) = frame else { return PumpEnd::Cancelled };
                    let text = match serde_json::to_string(&frame) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!(err = %e, "failed to encode outbound frame");
                            continue;
                        }
                    };
                    if write.send(Message::Text(text.into())).await.is_err() {
                        return PumpEnd::Dropped;
                    }
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(event) = decode_frame(&text) {
                                // Ignore send errors (no subscribers).
                                let _ = self.events_tx.send(event);
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => return PumpEnd::Dropped,
                        Some(Err(e)) => {
                            tracing::debug!(err = %e, "realtime read error");
                            return PumpEnd::Dropped;
                        }
                        _ => {} // ping/pong/binary ignored
                    }
                }
            }
        }
    }
}
