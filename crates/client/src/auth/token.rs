// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory access token slot with synchronous visibility.

use tokio::sync::watch;

/// Holds the current access token.
///
/// Built on a `watch` channel: `set` publishes synchronously, so a request
/// issued immediately afterwards reads the new value — there is no stale-read
/// window. AuthSession is the only writer; everything else reads or
/// subscribes. The token is an opaque string and is never validated here.
pub struct TokenStore {
    tx: watch::Sender<Option<String>>,
}

impl TokenStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Current token, if any.
    pub fn get(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    /// Replace the token. `None` clears it.
    pub fn set(&self, token: Option<String>) {
        // send_replace delivers even with no active receivers.
        let _ = self.tx.send_replace(token);
    }

    /// Watch for token changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_is_visible_to_next_read() {
        let store = TokenStore::new();
        assert_eq!(store.get(), None);

        store.set(Some("tok-1".to_owned()));
        assert_eq!(store.get(), Some("tok-1".to_owned()));

        store.set(Some("tok-2".to_owned()));
        assert_eq!(store.get(), Some("tok-2".to_owned()));

        store.set(None);
        assert_eq!(store.get(), None);
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let store = TokenStore::new();
        let mut rx = store.subscribe();

        store.set(Some("tok-1".to_owned()));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Some("tok-1".to_owned()));
    }
}
