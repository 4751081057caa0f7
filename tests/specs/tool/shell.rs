// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shell tool run end to end through `kktool`.

use serde_json::json;

use crate::prelude::*;

#[test]
fn successful_command_reports_done() {
    let work = Workdir::new();
    let step = work.step(json!({"tool": "shell", "cmd": "touch made-by-step", "cwd": work.path()}));

    let out = kktool().arg("-s").arg(&step).args(&["run"]).passes();
    assert_eq!(out.last_progress()["status"], "done");
    assert!(work.path().join("made-by-step").exists());
}

#[test]
fn non_zero_exit_is_a_retcode_error() {
    let work = Workdir::new();
    let step = work.step(json!({"tool": "shell", "cmd": "exit 4"}));

    let out = kktool().arg("-s").arg(&step).args(&["run"]).passes();
    let last = out.last_progress();
    assert_eq!(last["status"], "error");
    assert_eq!(last["reason"], "retcode");
    assert_eq!(last["retcode"], 4);
}

#[test]
fn step_timeout_is_reported() {
    let work = Workdir::new();
    let step = work.step(json!({"tool": "shell", "cmd": "sleep 30", "timeout": 1}));

    let out = kktool().arg("-s").arg(&step).args(&["run"]).passes();
    let last = out.last_progress();
    assert_eq!(last["status"], "error");
    assert_eq!(last["retcode"], 10000);
}

#[test]
fn masked_field_never_reaches_stderr() {
    let work = Workdir::new();
    let step = work.step(json!({
        "tool": "shell",
        "cmd": "echo token=s3cr3t-value",
        "token": "s3cr3t-value",
        "fields_masked": ["token"],
    }));

    kktool()
        .arg("-s")
        .arg(&step)
        .args(&["run"])
        .env("RUST_LOG", "debug")
        .passes()
        .stderr_has("token=******")
        .stderr_lacks("s3cr3t-value")
        .stdout_lacks("s3cr3t-value");
}
