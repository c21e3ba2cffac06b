// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session state machine: login, logout, single-flight refresh, restore.
//!
//! AuthSession owns the only writer to [`TokenStore`] and the session event
//! channel. The durable session artifact is a cookie held by this module's
//! dedicated reqwest client, backed by a [`FileJar`] under the state dir so
//! it survives a process restart — refresh and logout ride on it implicitly,
//! and it is never exposed to callers. The refresh call deliberately bypasses
//! the recovering HTTP client so an expired token can never recurse into
//! another refresh.

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::auth::jar::FileJar;
use crate::auth::persist::{self, MirroredProfile};
use crate::auth::token::TokenStore;
use crate::auth::{AuthState, IntrospectResponse, LoginRequest, TokenResponse, UserProfile};
use crate::config::{state_dir, ClientConfig};
use crate::error::{backend_error, ClientError};
use crate::events::{SessionEvent, SessionEvents};

/// Shared pending-result handle for an in-flight refresh.
type RefreshFuture = Shared<BoxFuture<'static, bool>>;

/// The authenticated session.
pub struct AuthSession {
    config: ClientConfig,
    /// Dedicated client for the auth endpoints. Carries the session cookie.
    http: reqwest::Client,
    /// Durable artifact storage shared with `http`.
    jar: Arc<FileJar>,
    store: TokenStore,
    user: RwLock<Option<UserProfile>>,
    state: RwLock<AuthState>,
    events: SessionEvents,
    /// At most one refresh is logically active; concurrent callers clone
    /// this shared future and observe the same outcome.
    refresh_gate: Mutex<Option<RefreshFuture>>,
    mirror_path: PathBuf,
}

impl AuthSession {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        crate::ensure_crypto_provider();
        let dir = state_dir(&config);
        let jar = Arc::new(FileJar::open(dir.join("cookies.json")));
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .cookie_provider(Arc::clone(&jar))
            .build()?;
        let mirror_path = dir.join("profile.json");
        Ok(Self {
            config,
            http,
            jar,
            store: TokenStore::new(),
            user: RwLock::new(None),
            state: RwLock::new(AuthState::Anonymous),
            events: SessionEvents::new(),
            refresh_gate: Mutex::new(None),
            mirror_path,
        })
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.store
    }

    pub fn events(&self) -> &SessionEvents {
        &self.events
    }

    pub async fn state(&self) -> AuthState {
        *self.state.read().await
    }

    pub async fn current_user(&self) -> Option<UserProfile> {
        self.user.read().await.clone()
    }

    /// True iff both a live token and an identity are present.
    pub async fn is_authenticated(&self) -> bool {
        self.store.get().is_some() && self.user.read().await.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Authenticate with email/password.
    ///
    /// The token is only committed after introspection succeeds, so a failure
    /// anywhere leaves the session exactly as it was — never partially
    /// authenticated.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ClientError> {
        *self.state.write().await = AuthState::Authenticating;
        match self.do_login(email, password).await {
            Ok(user) => {
                *self.state.write().await = AuthState::Authenticated;
                tracing::info!(user_id = %user.id, "login succeeded");
                self.events.emit(SessionEvent::Login { user: user.clone() });
                Ok(user)
            }
            Err(e) => {
                // Roll the transient state back; nothing else was touched.
                let mut state = self.state.write().await;
                *state = if self.is_authenticated().await {
                    AuthState::Authenticated
                } else {
                    AuthState::Anonymous
                };
                Err(e)
            }
        }
    }

    async fn do_login(&self, email: &str, password: &str) -> Result<UserProfile, ClientError> {
        let resp = self
            .http
            .post(self.url("/auth/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(ClientError::from_transport)?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ClientError::InvalidCredentials);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(backend_error(status.as_u16(), &body));
        }

        let token: TokenResponse =
            resp.json().await.map_err(ClientError::from_transport)?;
        let user = self.introspect(&token.access_token).await?;

        self.store.set(Some(token.access_token));
        *self.user.write().await = Some(user.clone());
        self.save_mirror(&user);
        Ok(user)
    }

    /// Fetch the identity behind a bearer token.
    async fn introspect(&self, token: &str) -> Result<UserProfile, ClientError> {
        let resp = self
            .http
            .post(self.url("/auth/introspect"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(ClientError::from_transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(backend_error(status.as_u16(), &body));
        }
        let body: IntrospectResponse =
            resp.json().await.map_err(ClientError::from_transport)?;
        Ok(body.user)
    }

    /// End the session. Never fails from the caller's perspective: the
    /// backend call is best-effort, local state is always cleared.
    pub async fn logout(&self) {
        if let Some(token) = self.store.get() {
            let result =
                self.http.post(self.url("/auth/logout")).bearer_auth(token).send().await;
            if let Err(e) = result {
                tracing::debug!(err = %e, "backend logout failed, clearing locally anyway");
            }
        }
        self.clear_session().await;
        self.events.emit(SessionEvent::Logout);
        tracing::info!("logged out");
    }

    async fn clear_session(&self) {
        self.store.set(None);
        *self.user.write().await = None;
        *self.state.write().await = AuthState::Anonymous;
        self.jar.clear();
        persist::clear(&self.mirror_path);
    }

    /// Exchange the durable artifact for a new access token.
    ///
    /// Single-flight: while one refresh is in flight no second network call
    /// is issued; every concurrent caller awaits the same shared future and
    /// gets the same boolean.
    pub async fn refresh(self: &Arc<Self>) -> bool {
        let fut = {
            let mut gate = self.refresh_gate.lock().await;
            if let Some(fut) = gate.as_ref() {
                fut.clone()
            } else {
                let session = Arc::clone(self);
                let fut: RefreshFuture = async move {
                    let ok = session.do_refresh().await;
                    session.refresh_gate.lock().await.take();
                    ok
                }
                .boxed()
                .shared();
                *gate = Some(fut.clone());
                fut
            }
        };
        fut.await
    }

    async fn do_refresh(&self) -> bool {
        let had_session = self.store.get().is_some() || self.user.read().await.is_some();
        if had_session {
            *self.state.write().await = AuthState::Refreshing;
        }

        match self.request_refresh().await {
            Ok(token) => {
                self.store.set(Some(token));
                if self.user.read().await.is_some() {
                    *self.state.write().await = AuthState::Authenticated;
                }
                tracing::debug!("access token refreshed");
                self.events.emit(SessionEvent::Refreshed);
                true
            }
            Err(e) => {
                tracing::warn!(err = %e, "token refresh failed");
                if had_session {
                    self.clear_session().await;
                    self.events.emit(SessionEvent::Expired);
                } else {
                    // Startup probe: nothing to expire. Drop the rejected
                    // artifact but keep the mirror for display fallback.
                    self.store.set(None);
                    *self.state.write().await = AuthState::Anonymous;
                    self.jar.clear();
                }
                false
            }
        }
    }

    async fn request_refresh(&self) -> Result<String, ClientError> {
        let resp = self
            .http
            .post(self.url("/auth/refresh"))
            .send()
            .await
            .map_err(ClientError::from_transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(backend_error(status.as_u16(), &body));
        }
        let token: TokenResponse =
            resp.json().await.map_err(ClientError::from_transport)?;
        Ok(token.access_token)
    }

    /// Startup restore: one silent refresh, then identity recovery.
    ///
    /// On refresh failure the mirrored profile is loaded for display only —
    /// without a live token `is_authenticated` stays false.
    pub async fn restore(self: &Arc<Self>) {
        if self.refresh().await {
            if self.user.read().await.is_none() {
                let Some(token) = self.store.get() else { return };
                match self.introspect(&token).await {
                    Ok(user) => {
                        *self.user.write().await = Some(user.clone());
                        *self.state.write().await = AuthState::Authenticated;
                        self.save_mirror(&user);
                        tracing::info!(user_id = %user.id, "session restored");
                        self.events.emit(SessionEvent::Login { user });
                    }
                    Err(e) => {
                        tracing::warn!(err = %e, "introspection failed after restore");
                        self.store.set(None);
                        *self.state.write().await = AuthState::Anonymous;
                        self.load_mirror_fallback().await;
                    }
                }
            }
        } else {
            self.load_mirror_fallback().await;
        }
    }

    /// Display-only fallback: surface the mirrored profile without a token.
    async fn load_mirror_fallback(&self) {
        if let Ok(mirror) = persist::load(&self.mirror_path) {
            tracing::debug!(user_id = %mirror.user.id, "restore fell back to mirrored profile");
            *self.user.write().await = Some(mirror.user);
        }
    }

    fn save_mirror(&self, user: &UserProfile) {
        if let Err(e) = persist::save(&self.mirror_path, &MirroredProfile::new(user.clone())) {
            tracing::warn!(err = %e, "failed to persist mirrored profile");
        }
    }

    /// Proactive refresh loop: refreshes on a fixed interval while
    /// authenticated, so reactive 401 recovery stays the fallback path.
    pub fn spawn_refresh_task(self: &Arc<Self>, cancel: CancellationToken) {
        let session = Arc::clone(self);
        let interval = self.config.refresh_interval();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                if session.is_authenticated().await {
                    let _ = session.refresh().await;
                }
            }
        });
    }
}
