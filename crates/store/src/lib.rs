// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable state store for the Tether engine.
//!
//! Single SQLite database holding runs, steps, step results and the
//! cloud-sync queue. Every mutation commits before the call returns;
//! readers never observe half-written transitions.

mod schema;
mod store;

pub use store::{StateStore, Stats, StoreError};
