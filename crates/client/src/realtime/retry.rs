// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry/cooldown state machine for the realtime connection.
//!
//! Pure and clock-parameterized: callers pass `Instant`s in and schedule the
//! returned delays themselves, so the policy is testable without a socket or
//! a timer. Only the connection owns an instance; nothing else mutates it.

use std::time::{Duration, Instant};

/// Decision for a prospective connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Attempt allowed.
    Allow,
    /// In cooldown; no attempt until the remaining window passes.
    CoolingDown { remaining: Duration },
}

/// Decision after a failed attempt or unexpected drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Schedule exactly one reconnection attempt after this delay.
    RetryAfter(Duration),
    /// Ceiling reached: refuse attempts until the given instant.
    CooldownUntil(Instant),
}

/// Bounded-retry policy: a fixed delay between attempts, a ceiling on
/// consecutive failures, then a cooldown window that resets the counter
/// once it elapses.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    ceiling: u32,
    retry_delay: Duration,
    cooldown: Duration,
    retry_count: u32,
    cooldown_until: Option<Instant>,
}

impl RetryPolicy {
    pub fn new(ceiling: u32, retry_delay: Duration, cooldown: Duration) -> Self {
        Self { ceiling, retry_delay, cooldown, retry_count: 0, cooldown_until: None }
    }

    /// Gate a prospective attempt. A cooldown window that has passed resets
    /// the counter and admits the attempt.
    pub fn check(&mut self, now: Instant) -> Gate {
        if let Some(until) = self.cooldown_until {
            if now < until {
                return Gate::CoolingDown { remaining: until - now };
            }
            self.cooldown_until = None;
            self.retry_count = 0;
        }
        Gate::Allow
    }

    /// Record that an attempt is being made.
    pub fn on_attempt(&mut self) {
        self.retry_count += 1;
    }

    /// Record a successful connect.
    pub fn on_success(&mut self) {
        self.retry_count = 0;
        self.cooldown_until = None;
    }

    /// Record a failed attempt or unexpected drop and decide what follows.
    pub fn on_failure(&mut self, now: Instant) -> Backoff {
        if self.retry_count >= self.ceiling {
            let until = now + self.cooldown;
            self.cooldown_until = Some(until);
            Backoff::CooldownUntil(until)
        } else {
            Backoff::RetryAfter(self.retry_delay)
        }
    }

    /// Manual disconnect: clear the counter and any cooldown.
    pub fn reset(&mut self) {
        self.retry_count = 0;
        self.cooldown_until = None;
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn in_cooldown(&self, now: Instant) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
