// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool-name normalization.
//!
//! The cloud emits historical aliases for several tools; a closed map
//! resolves them to canonical names. Unknown names pass through unchanged
//! so the dispatcher can reject them with a clear error.

/// Resolve a tool-name alias to its canonical name.
pub fn canonical_name(name: &str) -> &str {
    match name {
        // shell
        "shell_exec" | "shell.command" | "command" | "bash" | "run_command" => "shell.exec",

        // filesystem
        "write_file" | "file.write" | "create_file" => "fs.write",
        "read_file" | "file.read" => "fs.read",
        "append_file" | "file.append" => "fs.append",
        "list_files" | "file.list" | "list_directory" => "fs.list",
        "delete_file" | "file.delete" => "fs.delete",
        "search_files" | "file.search" => "fs.search",
        "find_files" | "file.find" => "fs.find",

        // web
        "fetch" | "http.fetch" | "http_request" => "web.fetch",

        // browser
        "browser_open" | "open_url" => "browser.open",
        "browser_fill" => "browser.fill",
        "browser_click" => "browser.click",
        "browser_get_text" => "browser.get_text",
        "browser_screenshot" => "browser.screenshot",

        // desktop
        "screenshot" | "desktop_screenshot" => "desktop.screenshot",
        "desktop_click" => "desktop.click",
        "desktop_type" | "type_text" => "desktop.type",
        "hotkey" | "desktop_hotkey" => "desktop.hotkey",
        "list_windows" => "desktop.window_list",
        "focus_window" => "desktop.window_focus",
        "resize_window" => "desktop.window_resize",
        "clipboard_read" => "desktop.clipboard_read",
        "clipboard_write" => "desktop.clipboard_write",

        // scripted app actions
        "open_safari" | "safari_navigate" => "safari.navigate",
        "create_note" | "notes_create" => "notes.create",
        "send_mail" | "mail_send" => "mail.send",
        "create_event" | "calendar_event" => "calendar.create_event",
        "create_reminder" | "reminders_create" => "reminders.create",
        "reveal_in_finder" | "finder_reveal" => "finder.reveal",
        "create_contact" => "contacts.create",

        // long-lived processes
        "start_process" | "process.start" => "system.start_process",
        "monitor_process" | "process.monitor" => "system.monitor_process",
        "stop_process" | "process.stop" => "system.stop_process",

        // reasoning / interaction
        "reasoning" | "reason" => "think",
        "ask_user" | "prompt_user" => "user_input",

        other => other,
    }
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
