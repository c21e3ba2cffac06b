// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client with transparent, single-flight 401 recovery.
//!
//! Every request carries the current bearer token. On a 401 the client joins
//! the session's single refresh (concurrent failures all await one shared
//! outcome) and replays the original request exactly once with the new token.
//! Non-auth failures pass through untouched. The refresh call itself goes
//! through [`AuthSession`]'s dedicated client, so this path cannot recurse.

use std::sync::Arc;

use reqwest::{Method, StatusCode};

use crate::auth::session::AuthSession;
use crate::config::ClientConfig;
use crate::error::{backend_error, ClientError};

/// HTTP wrapper for the school backend's REST endpoints.
pub struct HttpClient {
    base_url: String,
    inner: reqwest::Client,
    auth: Arc<AuthSession>,
}

impl HttpClient {
    pub fn new(config: &ClientConfig, auth: Arc<AuthSession>) -> anyhow::Result<Self> {
        crate::ensure_crypto_provider();
        let inner =
            reqwest::Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self { base_url: config.base_url.clone(), inner, auth })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn build(
        &self,
        method: &Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> reqwest::RequestBuilder {
        let mut req = self.inner.request(method.clone(), self.url(path));
        if let Some(token) = self.auth.token_store().get() {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        req
    }

    /// Issue a request with transparent auth recovery.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, ClientError> {
        let resp = self
            .build(&method, path, body.as_ref())
            .send()
            .await
            .map_err(ClientError::from_transport)?;

        if resp.status() != StatusCode::UNAUTHORIZED {
            return decode(resp).await;
        }

        // Authorization failure: join the (possibly already in-flight)
        // refresh, then replay once. Whatever the replay returns is final —
        // a second 401 is surfaced, never refreshed again.
        tracing::debug!(%method, path, "request unauthorized, refreshing");
        if !self.auth.refresh().await {
            return Err(ClientError::SessionExpired);
        }

        let retry = self
            .build(&method, path, body.as_ref())
            .send()
            .await
            .map_err(ClientError::from_transport)?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }
        decode(retry).await
    }

    pub async fn get(&self, path: &str) -> Result<serde_json::Value, ClientError> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, ClientError> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, ClientError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<serde_json::Value, ClientError> {
        self.request(Method::DELETE, path, None).await
    }
}

/// Decode a terminal response: JSON body on success, taxonomy error otherwise.
async fn decode(resp: reqwest::Response) -> Result<serde_json::Value, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(backend_error(status.as_u16(), &body));
    }
    let bytes = resp.bytes().await.map_err(ClientError::from_transport)?;
    if bytes.is_empty() {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Transport(e.to_string()))
}
