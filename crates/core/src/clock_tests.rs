// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_epoch_is_monotonic_enough() {
    let clock = SystemClock;
    let first = clock.epoch_ms();
    let second = clock.epoch_ms();
    assert!(second >= first);
    // Sanity: we are well past 2020.
    assert!(first > 1_577_836_800_000);
}

#[test]
fn fake_clock_is_frozen_until_advanced() {
    let clock = FakeClock::new();
    assert_eq!(clock.epoch_ms(), 1_000_000);
    assert_eq!(clock.now(), clock.now());
}

#[test]
fn advance_moves_instant_and_epoch_together() {
    let clock = FakeClock::new();
    let before = clock.now();

    clock.advance(Duration::from_secs(5));

    assert_eq!(clock.now().duration_since(before), Duration::from_secs(5));
    assert_eq!(clock.epoch_ms(), 1_005_000);
}

#[test]
fn set_epoch_ms_pins_the_wall_clock() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(42);
    assert_eq!(clock.epoch_ms(), 42);
}

#[test]
fn clones_observe_the_same_time() {
    let clock = FakeClock::new();
    let observer = clock.clone();
    clock.advance(Duration::from_millis(1500));
    assert_eq!(observer.epoch_ms(), 1_001_500);
}
