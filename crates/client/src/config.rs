// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration with environment overrides.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the campus client stack.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend HTTP base URL (no trailing slash).
    pub base_url: String,
    /// Realtime endpoint base URL. Derived from `base_url` when unset.
    pub realtime_url: Option<String>,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Socket connect-attempt timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Proactive token refresh interval in milliseconds.
    pub refresh_interval_ms: u64,
    /// Delay between realtime reconnection attempts in milliseconds.
    pub reconnect_delay_ms: u64,
    /// Consecutive failed attempts before entering cooldown.
    pub reconnect_ceiling: u32,
    /// Cooldown window after the ceiling is reached, in milliseconds.
    pub cooldown_ms: u64,
    /// Window within which repeated `connect` calls coalesce, in milliseconds.
    pub connect_debounce_ms: u64,
    /// Directory for the mirrored profile. Resolved via env when unset.
    pub state_dir: Option<PathBuf>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            realtime_url: None,
            request_timeout_ms: 25_000,
            connect_timeout_ms: 25_000,
            refresh_interval_ms: 480_000, // 8 min, inside a 15-min token lifetime
            reconnect_delay_ms: 3_000,
            reconnect_ceiling: 3,
            cooldown_ms: 60_000,
            connect_debounce_ms: 300,
            state_dir: None,
        }
    }

    /// Apply `CAMPUS_*` environment overrides on top of the current values.
    pub fn from_env(base_url: impl Into<String>) -> Self {
        let mut config = Self::new(base_url);
        if let Ok(url) = std::env::var("CAMPUS_REALTIME_URL") {
            config.realtime_url = Some(url);
        }
        if let Some(ms) = env_parse("CAMPUS_REQUEST_TIMEOUT_MS") {
            config.request_timeout_ms = ms;
        }
        if let Some(ms) = env_parse("CAMPUS_CONNECT_TIMEOUT_MS") {
            config.connect_timeout_ms = ms;
        }
        if let Some(ms) = env_parse("CAMPUS_REFRESH_INTERVAL_MS") {
            config.refresh_interval_ms = ms;
        }
        if let Some(ms) = env_parse("CAMPUS_RECONNECT_DELAY_MS") {
            config.reconnect_delay_ms = ms;
        }
        if let Some(n) = env_parse("CAMPUS_RECONNECT_CEILING") {
            config.reconnect_ceiling = n;
        }
        if let Some(ms) = env_parse("CAMPUS_COOLDOWN_MS") {
            config.cooldown_ms = ms;
        }
        if let Some(ms) = env_parse("CAMPUS_CONNECT_DEBOUNCE_MS") {
            config.connect_debounce_ms = ms;
        }
        config
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn connect_debounce(&self) -> Duration {
        Duration::from_millis(self.connect_debounce_ms)
    }

    /// Realtime base URL: explicit override, or `base_url` with the scheme
    /// swapped to ws(s).
    pub fn realtime_base(&self) -> String {
        if let Some(ref url) = self.realtime_url {
            return url.clone();
        }
        if self.base_url.starts_with("https://") {
            self.base_url.replacen("https://", "wss://", 1)
        } else {
            self.base_url.replacen("http://", "ws://", 1)
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Resolve the state directory for mirrored profile data.
///
/// Checks the config, then `CAMPUS_STATE_DIR`, then `$XDG_STATE_HOME/campus`,
/// then `$HOME/.local/state/campus`.
pub fn state_dir(config: &ClientConfig) -> PathBuf {
    if let Some(ref dir) = config.state_dir {
        return dir.clone();
    }
    if let Ok(dir) = std::env::var("CAMPUS_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("campus");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/campus");
    }
    PathBuf::from(".campus")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn realtime_base_swaps_scheme() {
        let config = ClientConfig::new("https://api.school.example");
        assert_eq!(config.realtime_base(), "wss://api.school.example");

        let config = ClientConfig::new("http://localhost:4000");
        assert_eq!(config.realtime_base(), "ws://localhost:4000");
    }

    #[test]
    fn realtime_base_prefers_override() {
        let mut config = ClientConfig::new("http://localhost:4000");
        config.realtime_url = Some("ws://rt.school.example".to_owned());
        assert_eq!(config.realtime_base(), "ws://rt.school.example");
    }

    // The only test in this binary that touches the process environment,
    // so it cannot race with a concurrent reader.
    #[test]
    fn from_env_covers_every_documented_override() {
        let vars = [
            ("CAMPUS_REALTIME_URL", "ws://rt.school.example"),
            ("CAMPUS_REQUEST_TIMEOUT_MS", "1001"),
            ("CAMPUS_CONNECT_TIMEOUT_MS", "1002"),
            ("CAMPUS_REFRESH_INTERVAL_MS", "1003"),
            ("CAMPUS_RECONNECT_DELAY_MS", "1004"),
            ("CAMPUS_RECONNECT_CEILING", "7"),
            ("CAMPUS_COOLDOWN_MS", "1005"),
            ("CAMPUS_CONNECT_DEBOUNCE_MS", "1006"),
        ];
        for (key, value) in vars {
            std::env::set_var(key, value);
        }

        let config = ClientConfig::from_env("http://localhost:4000");
        for (key, _) in vars {
            std::env::remove_var(key);
        }

        assert_eq!(config.realtime_url.as_deref(), Some("ws://rt.school.example"));
        assert_eq!(config.request_timeout_ms, 1001);
        assert_eq!(config.connect_timeout_ms, 1002);
        assert_eq!(config.refresh_interval_ms, 1003);
        assert_eq!(config.reconnect_delay_ms, 1004);
        assert_eq!(config.reconnect_ceiling, 7);
        assert_eq!(config.cooldown_ms, 1005);
        assert_eq!(config.connect_debounce_ms, 1006);
    }

    #[test]
    fn explicit_state_dir_wins() {
        let mut config = ClientConfig::new("http://localhost:4000");
        config.state_dir = Some(PathBuf::from("/tmp/campus-test"));
        assert_eq!(state_dir(&config), PathBuf::from("/tmp/campus-test"));
    }
}
