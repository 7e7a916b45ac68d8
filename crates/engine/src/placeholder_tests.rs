// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn substitutes_with_prior_output() {
    let (resolved, substituted) =
        resolve_placeholders("hello <NAME_PLACEHOLDER>", Some("world"));
    assert_eq!(resolved, "hello world");
    assert!(substituted);
}

#[test]
fn strips_trailing_newline_from_output() {
    let (resolved, _) = resolve_placeholders("v=<VALUE_PLACEHOLDER>;", Some("42\n"));
    assert_eq!(resolved, "v=42;");
}

#[test]
fn no_prior_output_leaves_token_unresolved() {
    let (resolved, substituted) = resolve_placeholders("hello <NAME_PLACEHOLDER>", None);
    assert_eq!(resolved, "hello <NAME_PLACEHOLDER>");
    assert!(!substituted);
}

#[test]
fn replaces_every_occurrence() {
    let (resolved, _) = resolve_placeholders(
        "<A_PLACEHOLDER> and <OTHER_PLACEHOLDER>",
        Some("x"),
    );
    assert_eq!(resolved, "x and x");
}

#[parameterized(
    plain_text = { "no tokens here" },
    lowercase = { "hello <name_placeholder>" },
    html_tag = { "<HTML><BODY>" },
    empty = { "" },
)]
fn non_tokens_pass_through(content: &str) {
    let (resolved, substituted) = resolve_placeholders(content, Some("out"));
    assert_eq!(resolved, content);
    assert!(!substituted);
}
