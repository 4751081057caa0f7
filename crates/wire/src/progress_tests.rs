// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kk_core::TestStatus;
use serde_json::json;

#[test]
fn in_progress_uses_dashed_keys() {
    let batch = Batch {
        test_results: vec![TestCaseResult::new("a::t1", TestStatus::Passed)],
        ..Batch::default()
    };
    let v = serde_json::to_value(Progress::InProgress(batch)).unwrap();
    assert_eq!(v["status"], "in-progress");
    assert_eq!(v["test-results"][0]["test"], "a::t1");
    assert!(v.get("issues").is_none());
}

#[test]
fn bare_in_progress_parses_to_empty_batch() {
    let p: Progress = serde_json::from_value(json!({"status": "in-progress"})).unwrap();
    assert_eq!(p, Progress::InProgress(Batch::default()));
    assert!(!p.is_terminal());
}

#[test]
fn done_carries_commands() {
    let p: Progress =
        serde_json::from_value(json!({"status": "done", "commands": ["run", "run_tests"]})).unwrap();
    assert_eq!(
        p,
        Progress::Done { commands: Some(vec![Command::Run, Command::RunTests]), tests: None }
    );
}

#[test]
fn error_becomes_step_result() {
    let p: Progress = serde_json::from_value(json!({
        "status": "error", "reason": "retcode", "retcode": 2, "msg": "cmd exited with non-zero retcode: 2"
    }))
    .unwrap();
    let r = p.into_result().unwrap();
    assert!(r.is_error());
    assert_eq!(r.retcode, Some(2));
    assert_eq!(r.reason, Some(FailReason::Retcode));
}

#[test]
fn unknown_status_is_rejected() {
    assert!(serde_json::from_value::<Progress>(json!({"status": "finished"})).is_err());
}

#[test]
fn step_result_maps_back_to_progress() {
    assert_eq!(Progress::from(StepResult::done()), Progress::done());
    let p = Progress::from(StepResult::timeout());
    assert_eq!(
        p,
        Progress::Error { reason: FailReason::Timeout, retcode: Some(10000), msg: None }
    );
}

#[test]
fn batch_len_counts_all_kinds() {
    let batch = Batch {
        artifacts: vec![Artifact { path: "a".into(), size: 1 }],
        data: vec![json!({"k": 1}), json!(2)],
        ..Batch::default()
    };
    assert_eq!(batch.len(), 3);
    assert!(Batch::default().is_empty());
}
