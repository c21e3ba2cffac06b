// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Campus client: session and realtime-connection layer for the school
//! administration dashboard.
//!
//! Page components stay out of this crate; they consume four seams:
//! [`auth::session::AuthSession`] for login/logout, [`http::HttpClient`] for
//! data calls with transparent token recovery, [`realtime::RealtimeConnection`]
//! for chat/notifications, and the session event channel for redirects.

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod realtime;

use std::sync::{Arc, Once};

use tokio_util::sync::CancellationToken;

use crate::auth::session::AuthSession;
use crate::config::ClientConfig;
use crate::http::HttpClient;
use crate::realtime::watcher::spawn_auth_watcher;
use crate::realtime::RealtimeConnection;

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls. reqwest is built
/// with `rustls-no-provider`, so a provider must be in place before the
/// first `Client` is constructed. Safe to call repeatedly; only the first
/// call has effect.
pub(crate) fn ensure_crypto_provider() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// The composed client stack.
///
/// Built once at application start and torn down at application end — an
/// explicit instance with a lifecycle, not a module-level singleton. All
/// background tasks (periodic refresh, auth watcher, realtime run loop) hang
/// off one cancellation token.
pub struct Services {
    auth: Arc<AuthSession>,
    http: HttpClient,
    realtime: Arc<RealtimeConnection>,
    shutdown: CancellationToken,
}

impl Services {
    /// Build the stack and run startup restore (one silent refresh).
    pub async fn start(config: ClientConfig) -> anyhow::Result<Self> {
        let auth = Arc::new(AuthSession::new(config.clone())?);
        let http = HttpClient::new(&config, Arc::clone(&auth))?;
        let realtime =
            Arc::new(RealtimeConnection::new(config, auth.token_store().subscribe()));

        let shutdown = CancellationToken::new();

        // Subscribe the watcher before restore so a restored session's login
        // event opens the socket.
        spawn_auth_watcher(
            auth.events().subscribe(),
            Arc::clone(&realtime),
            shutdown.clone(),
        );

        auth.restore().await;
        auth.spawn_refresh_task(shutdown.clone());

        Ok(Self { auth, http, realtime, shutdown })
    }

    pub fn auth(&self) -> &Arc<AuthSession> {
        &self.auth
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn realtime(&self) -> &Arc<RealtimeConnection> {
        &self.realtime
    }

    /// Tear down every background task and close the socket.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.realtime.disconnect().await;
        tracing::debug!("client services shut down");
    }
}
