// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Harness contract: arguments, check-integrity, progress on stdout.

use serde_json::json;

use crate::prelude::*;

#[test]
fn check_integrity_passes_without_a_step_file() {
    kktool().args(&["check-integrity"]).passes();
}

#[test]
fn help_shows_usage() {
    kktool().args(&["--help"]).passes().stdout_has("Usage:").stdout_has("--step-file");
}

#[test]
fn get_commands_lists_what_the_tool_supports() {
    let work = Workdir::new();
    let step = work.step(json!({"tool": "shell", "cmd": "true"}));

    let out = kktool().arg("-s").arg(&step).args(&["get_commands"]).passes();
    let last = out.last_progress();
    assert_eq!(last["status"], "done");
    assert_eq!(last["commands"], json!(["run"]));
}

#[test]
fn module_flag_overrides_the_step_tool() {
    let work = Workdir::new();
    let step = work.step(json!({"tool": "shell", "count": 3}));

    let out = kktool().arg("-s").arg(&step).args(&["-m", "rndtest", "get_commands"]).passes();
    assert_eq!(out.last_progress()["commands"], json!(["collect_tests", "run_tests"]));
}

#[test]
fn unknown_tool_reports_an_exception() {
    let work = Workdir::new();
    let step = work.step(json!({"tool": "no-such-tool"}));

    let out = kktool().arg("-s").arg(&step).args(&["run"]).fails();
    let last = out.last_progress();
    assert_eq!(last["status"], "error");
    assert_eq!(last["reason"], "exception");
}

#[test]
fn missing_step_file_fails() {
    kktool().args(&["run"]).fails().stderr_has("missing --step-file");
}

#[test]
fn unknown_command_fails() {
    let work = Workdir::new();
    let step = work.step(json!({"tool": "shell", "cmd": "true"}));
    kktool().arg("-s").arg(&step).args(&["explode"]).fails();
}
