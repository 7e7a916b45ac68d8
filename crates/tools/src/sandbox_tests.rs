// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tether_core::ErrorKind;
use yare::parameterized;

fn sandbox() -> (Sandbox, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    (Sandbox::with_home(dir.path()), dir)
}

#[test]
fn tilde_expands_to_home() {
    let (sandbox, dir) = sandbox();
    let resolved = sandbox.resolve("~/notes/t.txt").unwrap();
    assert_eq!(
        resolved,
        std::fs::canonicalize(dir.path()).unwrap().join("notes/t.txt")
    );
}

#[test]
fn bare_tilde_is_home() {
    let (sandbox, dir) = sandbox();
    let resolved = sandbox.resolve("~").unwrap();
    assert_eq!(resolved, std::fs::canonicalize(dir.path()).unwrap());
}

#[parameterized(
    appuser = { "/home/appuser/Desktop/note.txt", "Desktop/note.txt" },
    generic_linux = { "/home/user/docs/a.md", "docs/a.md" },
    generic_mac = { "/Users/user/docs/a.md", "docs/a.md" },
    windows = { "C:\\Users\\user\\docs\\a.md", "docs/a.md" },
    appuser_root = { "/home/appuser", "" },
)]
fn placeholder_prefixes_remap_under_home(input: &str, tail: &str) {
    let (sandbox, dir) = sandbox();
    let resolved = sandbox.resolve(input).unwrap();
    let home = std::fs::canonicalize(dir.path()).unwrap();
    let expected = if tail.is_empty() { home } else { home.join(tail) };
    assert_eq!(resolved, expected);
}

#[test]
fn relative_paths_land_under_home() {
    let (sandbox, dir) = sandbox();
    let resolved = sandbox.resolve("projects/app/main.rs").unwrap();
    assert_eq!(
        resolved,
        std::fs::canonicalize(dir.path())
            .unwrap()
            .join("projects/app/main.rs")
    );
}

#[parameterized(
    etc_passwd = { "/etc/passwd" },
    tmp = { "/tmp/evil" },
    traversal = { "~/../../etc/passwd" },
    dotdot_absolute = { "/home/user/../../etc/shadow" },
    root = { "/" },
)]
fn outside_paths_are_denied(input: &str) {
    let (sandbox, _dir) = sandbox();
    let err = sandbox.resolve(input).unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);
}

#[test]
fn dotdot_inside_home_is_fine() {
    let (sandbox, dir) = sandbox();
    let resolved = sandbox.resolve("~/a/b/../c.txt").unwrap();
    assert_eq!(
        resolved,
        std::fs::canonicalize(dir.path()).unwrap().join("a/c.txt")
    );
}

#[test]
fn empty_path_is_contract_violation() {
    let (sandbox, _dir) = sandbox();
    assert_eq!(
        sandbox.resolve("").unwrap_err().kind,
        ErrorKind::ContractViolation
    );
}

#[cfg(unix)]
#[test]
fn symlink_escaping_home_is_denied() {
    let (sandbox, dir) = sandbox();
    let outside = tempfile::tempdir().unwrap();
    let link = dir.path().join("escape");
    std::os::unix::fs::symlink(outside.path(), &link).unwrap();

    let err = sandbox.resolve("~/escape/secret.txt").unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccessDenied);
}

#[test]
fn existing_file_resolves_canonically() {
    let (sandbox, dir) = sandbox();
    std::fs::write(dir.path().join("real.txt"), "x").unwrap();
    let resolved = sandbox.resolve("~/real.txt").unwrap();
    assert!(resolved.ends_with("real.txt"));
    assert!(resolved.is_absolute());
}
