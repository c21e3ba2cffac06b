// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mock school backend for integration tests.
//!
//! Serves the auth endpoints plus one data endpoint on an ephemeral port,
//! with counters the tests assert against. The durable session artifact is a
//! real cookie, so reqwest's cookie store is exercised end to end.

// Shared across test crates; not every crate uses every knob.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

pub const GOOD_PASSWORD: &str = "correct-horse";
const SESSION_COOKIE: &str = "campus_session";

/// Mutable backend state shared with the tests.
pub struct Backend {
    /// The bearer token the data/introspect endpoints currently accept.
    pub valid_token: Mutex<String>,
    token_seq: AtomicU32,
    pub login_calls: AtomicU32,
    pub refresh_calls: AtomicU32,
    pub data_calls: AtomicU32,
    /// Whether /auth/refresh succeeds.
    pub refresh_ok: AtomicBool,
    /// Whether /auth/refresh insists on seeing the session cookie.
    pub require_cookie: AtomicBool,
    /// Whether /auth/introspect rejects every token.
    pub introspect_fails: AtomicBool,
    /// Whether /auth/logout answers 500.
    pub logout_fails: AtomicBool,
    /// Whether /api/students rejects every token (always 401).
    pub reject_all_data: AtomicBool,
    /// Artificial delay inside /auth/refresh, to widen the expiry window.
    pub refresh_delay_ms: AtomicU64,
}

impl Backend {
    fn new() -> Self {
        Self {
            valid_token: Mutex::new(String::new()),
            token_seq: AtomicU32::new(0),
            login_calls: AtomicU32::new(0),
            refresh_calls: AtomicU32::new(0),
            data_calls: AtomicU32::new(0),
            refresh_ok: AtomicBool::new(true),
            require_cookie: AtomicBool::new(false),
            introspect_fails: AtomicBool::new(false),
            logout_fails: AtomicBool::new(false),
            reject_all_data: AtomicBool::new(false),
            refresh_delay_ms: AtomicU64::new(0),
        }
    }

    fn mint(&self) -> String {
        let n = self.token_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let token = format!("tok-{n}");
        *self.valid_token.lock().unwrap() = token.clone();
        token
    }

    /// Invalidate the current token without minting a new one, simulating
    /// server-side expiry.
    pub fn expire_token(&self) {
        *self.valid_token.lock().unwrap() = "rotated-away".to_owned();
    }

    fn accepts(&self, headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {}", self.valid_token.lock().unwrap());
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected)
    }
}

/// Start the mock backend; returns its base URL and shared state.
pub async fn start_backend() -> (String, Arc<Backend>) {
    let backend = Arc::new(Backend::new());
    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/introspect", post(introspect))
        .route("/auth/logout", post(logout))
        .route("/api/students", get(students))
        .with_state(Arc::clone(&backend));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), backend)
}

fn error_body(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({ "error": { "code": code, "message": message } })
}

fn has_session_cookie(headers: &HeaderMap) -> bool {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(SESSION_COOKIE))
}

async fn login(
    State(backend): State<Arc<Backend>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    backend.login_calls.fetch_add(1, Ordering::SeqCst);
    if body["password"] != GOOD_PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(error_body("INVALID_CREDENTIALS", "wrong email or password")),
        )
            .into_response();
    }
    let token = backend.mint();
    (
        [(header::SET_COOKIE, format!("{SESSION_COOKIE}=artifact-1; Path=/; HttpOnly"))],
        Json(serde_json::json!({ "access_token": token })),
    )
        .into_response()
}

async fn refresh(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    backend.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = backend.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let cookie_ok =
        !backend.require_cookie.load(Ordering::SeqCst) || has_session_cookie(&headers);
    if !backend.refresh_ok.load(Ordering::SeqCst) || !cookie_ok {
        return (
            StatusCode::UNAUTHORIZED,
            Json(error_body("REFRESH_EXHAUSTED", "session artifact invalid")),
        )
            .into_response();
    }
    let token = backend.mint();
    Json(serde_json::json!({ "access_token": token })).into_response()
}

async fn introspect(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    if backend.introspect_fails.load(Ordering::SeqCst) || !backend.accepts(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(error_body("UNAUTHORIZED", "bad token")))
            .into_response();
    }
    Json(serde_json::json!({
        "user": {
            "id": "u-17",
            "email": "t.okafor@school.example",
            "role": "teacher",
            "school_id": "sch-3",
            "display_name": "T. Okafor"
        }
    }))
    .into_response()
}

async fn logout(State(backend): State<Arc<Backend>>) -> Response {
    if backend.logout_fails.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(error_body("INTERNAL", "boom")))
            .into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn students(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    backend.data_calls.fetch_add(1, Ordering::SeqCst);
    if backend.reject_all_data.load(Ordering::SeqCst) || !backend.accepts(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(error_body("UNAUTHORIZED", "token expired")))
            .into_response();
    }
    Json(serde_json::json!({ "students": [ { "id": "s-1", "name": "Ada" } ] }))
        .into_response()
}
