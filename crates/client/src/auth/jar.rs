// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed cookie jar for the durable session artifact.
//!
//! reqwest's default jar is in-memory, so the session cookie would die with
//! the process and startup restore could never work across restarts. This
//! jar mirrors cookies to a JSON file under the state dir and reloads them
//! on construction. Only host-scoped name=value pairs are kept; the session
//! cookie carries no attributes the client needs to honor beyond that.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use reqwest::header::HeaderValue;
use reqwest::Url;

use crate::auth::persist;

/// host -> cookie name -> cookie value
type CookieMap = HashMap<String, HashMap<String, String>>;

pub struct FileJar {
    path: PathBuf,
    cookies: Mutex<CookieMap>,
}

impl FileJar {
    /// Open the jar, loading any previously saved cookies. A missing or
    /// unreadable file starts empty.
    pub fn open(path: PathBuf) -> Self {
        let cookies: CookieMap = std::fs::read_to_string(&path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default();
        Self { path, cookies: Mutex::new(cookies) }
    }

    /// Drop every cookie and remove the backing file.
    pub fn clear(&self) {
        if let Ok(mut cookies) = self.cookies.lock() {
            cookies.clear();
        }
        persist::clear(&self.path);
    }

    fn save(&self, cookies: &CookieMap) {
        match serde_json::to_string_pretty(cookies) {
            Ok(json) => {
                if let Err(e) = persist::write_atomic(&self.path, &json) {
                    tracing::warn!(err = %e, "failed to persist cookie jar");
                }
            }
            Err(e) => tracing::warn!(err = %e, "failed to encode cookie jar"),
        }
    }
}

impl reqwest::cookie::CookieStore for FileJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let Some(host) = url.host_str() else { return };
        let Ok(mut cookies) = self.cookies.lock() else { return };

        for header in cookie_headers {
            let Ok(text) = header.to_str() else { continue };
            // "name=value; Path=/; HttpOnly" — only the first pair matters.
            let Some(pair) = text.split(';').next() else { continue };
            let Some((name, value)) = pair.split_once('=') else { continue };
            let (name, value) = (name.trim(), value.trim());
            if name.is_empty() {
                continue;
            }
            let host_cookies = cookies.entry(host.to_owned()).or_default();
            if value.is_empty() {
                // An empty value is the server clearing the cookie.
                host_cookies.remove(name);
            } else {
                host_cookies.insert(name.to_owned(), value.to_owned());
            }
        }
        self.save(&cookies);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let host = url.host_str()?;
        let cookies = self.cookies.lock().ok()?;
        let host_cookies = cookies.get(host)?;
        if host_cookies.is_empty() {
            return None;
        }
        let joined = host_cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&joined).ok()
    }
}
