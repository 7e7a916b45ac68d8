// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Placeholder substitution.
//!
//! Step content may carry tokens like `<NAME_PLACEHOLDER>` standing for
//! "the output of an earlier step". Before an `fs.write` dispatch, every
//! such token is replaced with the stdout of the most recent completed
//! step that produced output. With no prior output the token is left
//! unresolved; the step then usually fails and adaptive retry takes over.

use regex::Regex;
use std::sync::OnceLock;

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)] // literal pattern, checked by tests
        Regex::new(r"<[A-Z][A-Z0-9_]*PLACEHOLDER>").unwrap()
    })
}

/// Replace placeholder tokens in `content` with `last_output`.
///
/// Returns the resolved content and whether any token was substituted.
pub fn resolve_placeholders(content: &str, last_output: Option<&str>) -> (String, bool) {
    let re = pattern();
    if !re.is_match(content) {
        return (content.to_string(), false);
    }
    let Some(output) = last_output else {
        return (content.to_string(), false);
    };
    let replacement = output.trim_end_matches('\n');
    let resolved = re.replace_all(content, replacement).into_owned();
    (resolved, true)
}

#[cfg(test)]
#[path = "placeholder_tests.rs"]
mod tests;
