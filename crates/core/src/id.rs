// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier newtypes and generation.
//!
//! Identifiers are opaque strings assigned elsewhere (the cloud for runs,
//! the engine for processes and input requests). [`define_id!`] stamps out
//! a string newtype per kind so they cannot be mixed up in signatures.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Truncation to a display prefix, safe on multi-byte text.
pub trait ShortId {
    /// At most `len` characters from the front.
    fn short(&self, len: usize) -> &str;
}

impl ShortId for str {
    fn short(&self, len: usize) -> &str {
        match self.char_indices().nth(len) {
            Some((cut, _)) => &self[..cut],
            None => self,
        }
    }
}

/// Stamp out a string-backed identifier type.
///
/// The generated type carries `new()`, `as_str()` and `short()`, derefs
/// to `str`, displays as its inner value, and round-trips through serde
/// as a bare string.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$attr:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            /// Shortened prefix for log lines and titles.
            pub fn short(&self, len: usize) -> &str {
                $crate::id::ShortId::short(self.0.as_str(), len)
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                self.as_str()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

/// Source of fresh identifiers.
pub trait IdGen: Clone + Send + Sync {
    fn next(&self) -> String;
}

/// Random v4 UUIDs; the production generator.
#[derive(Clone, Copy, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic generator for tests: `x-0001`, `x-0002`, ...
///
/// Clones share the counter, so ids stay unique across tasks.
#[derive(Clone)]
pub struct CountingIdGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl CountingIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl IdGen for CountingIdGen {
    fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{:04}", self.prefix, n)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
