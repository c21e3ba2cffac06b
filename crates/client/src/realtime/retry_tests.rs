// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const DELAY: Duration = Duration::from_secs(3);
const COOLDOWN: Duration = Duration::from_secs(60);

fn policy() -> RetryPolicy {
    RetryPolicy::new(3, DELAY, COOLDOWN)
}

#[test]
fn failures_below_ceiling_retry_after_fixed_delay() {
    let mut p = policy();
    let now = Instant::now();

    for _ in 0..2 {
        assert_eq!(p.check(now), Gate::Allow);
        p.on_attempt();
        assert_eq!(p.on_failure(now), Backoff::RetryAfter(DELAY));
    }
    assert_eq!(p.retry_count(), 2);
}

#[test]
fn third_failure_enters_cooldown() {
    let mut p = policy();
    let now = Instant::now();

    for _ in 0..3 {
        assert_eq!(p.check(now), Gate::Allow);
        p.on_attempt();
        p.on_failure(now);
    }

    assert!(p.in_cooldown(now));
    match p.check(now) {
        Gate::CoolingDown { remaining } => assert!(remaining <= COOLDOWN),
        Gate::Allow => panic!("attempt admitted during cooldown"),
    }
}

#[test]
fn cooldown_refuses_until_window_passes_then_resets_counter() {
    let mut p = policy();
    let start = Instant::now();

    for _ in 0..3 {
        p.on_attempt();
        p.on_failure(start);
    }

    // Just inside the window: still refused.
    let inside = start + COOLDOWN - Duration::from_millis(1);
    assert!(matches!(p.check(inside), Gate::CoolingDown { .. }));

    // Window elapsed: admitted, counter back to zero.
    let after = start + COOLDOWN;
    assert_eq!(p.check(after), Gate::Allow);
    assert_eq!(p.retry_count(), 0);
    assert!(!p.in_cooldown(after));
}

#[test]
fn success_resets_counter_and_cooldown() {
    let mut p = policy();
    let now = Instant::now();

    p.on_attempt();
    p.on_failure(now);
    p.on_attempt();
    p.on_success();

    assert_eq!(p.retry_count(), 0);
    assert_eq!(p.check(now), Gate::Allow);
}

#[test]
fn manual_reset_clears_cooldown() {
    let mut p = policy();
    let now = Instant::now();

    for _ in 0..3 {
        p.on_attempt();
        p.on_failure(now);
    }
    assert!(p.in_cooldown(now));

    p.reset();
    assert!(!p.in_cooldown(now));
    assert_eq!(p.retry_count(), 0);
    assert_eq!(p.check(now), Gate::Allow);
}
