// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Argument extraction shared by all handlers.
//!
//! Missing or wrongly typed keys are contract violations: the attempt
//! fails without retry and the executor asks the cloud to regenerate args.

use serde_json::{Map, Value};
use tether_core::EngineError;

pub type ArgMap = Map<String, Value>;

/// Required string argument.
pub fn require_str<'a>(args: &'a ArgMap, key: &str) -> Result<&'a str, EngineError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::contract(format!("missing or non-string arg: {key}")))
}

/// Optional string argument.
pub fn opt_str<'a>(args: &'a ArgMap, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

/// Optional unsigned integer argument.
pub fn opt_u64(args: &ArgMap, key: &str) -> Option<u64> {
    args.get(key).and_then(Value::as_u64)
}

/// Optional signed integer argument.
pub fn opt_i64(args: &ArgMap, key: &str) -> Option<i64> {
    args.get(key).and_then(Value::as_i64)
}

/// Optional boolean argument.
pub fn opt_bool(args: &ArgMap, key: &str) -> Option<bool> {
    args.get(key).and_then(Value::as_bool)
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
