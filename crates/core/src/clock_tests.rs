// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fake_clock_starts_at_fixed_epoch() {
    let clock = FakeClock::new();
    assert_eq!(clock.epoch_secs(), 1_000_000);
}

#[test]
fn fake_clock_advance() {
    let clock = FakeClock::new();
    clock.advance(Duration::from_secs(60));
    assert_eq!(clock.epoch_secs(), 1_000_060);
}

#[test]
fn fake_clock_set_epoch() {
    let clock = FakeClock::new();
    clock.set_epoch_secs(42);
    assert_eq!(clock.epoch_secs(), 42);
}

#[test]
fn fake_clock_clones_share_state() {
    let clock = FakeClock::new();
    let other = clock.clone();
    clock.advance(Duration::from_secs(10));
    assert_eq!(other.epoch_secs(), 1_000_010);
}

#[test]
fn system_clock_is_past_2020() {
    let clock = SystemClock;
    assert!(clock.epoch_secs() > 1_577_836_800);
}
