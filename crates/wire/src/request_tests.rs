// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kk_core::{Issue, TestCaseResult, TestStatus};
use serde_json::json;

fn req(message: Message) -> Value {
    serde_json::to_value(Request { address: "10.0.0.5".into(), message }).unwrap()
}

#[test]
fn get_job_is_tagged_by_msg() {
    assert_eq!(req(Message::GetJob { last_seen: None }), json!({"address": "10.0.0.5", "msg": "get-job"}));
}

#[test]
fn terminal_step_result_is_nested_under_result() {
    let v = req(Message::StepResult {
        job_id: 4,
        step_index: 1,
        result: StepReport::from(StepResult::timeout()),
    });
    assert_eq!(v["msg"], "step-result");
    assert_eq!(v["job_id"], 4);
    assert_eq!(v["step_index"], 1);
    assert_eq!(v["result"], json!({"status": "error", "reason": "timeout", "retcode": 10000}));
}

#[test]
fn progress_report_flattens_batch() {
    let batch = Batch {
        test_results: vec![TestCaseResult::new("t", TestStatus::Passed)],
        issues: vec![Issue {
            path: "a.py".into(),
            line: 1,
            column: 0,
            message: "m".into(),
            symbol: "s".into(),
            kind: "error".into(),
            url: None,
        }],
        ..Batch::default()
    };
    let v = serde_json::to_value(StepReport::batch(batch)).unwrap();
    assert_eq!(v["status"], "in-progress");
    assert_eq!(v["test-results"].as_array().map(Vec::len), Some(1));
    assert_eq!(v["issues"].as_array().map(Vec::len), Some(1));
}

#[test]
fn request_roundtrips_through_json() {
    let original = Request {
        address: "a".into(),
        message: Message::DispatchTests { job_id: 1, step_index: 0, tests: vec!["x".into()] },
    };
    let back: Request = serde_json::from_value(serde_json::to_value(&original).unwrap()).unwrap();
    assert_eq!(back, original);
}

#[yare::parameterized(
    host_info = { Message::HostInfo { info: HostInfo::default() }, "host-info" },
    get_job = { Message::GetJob { last_seen: None }, "get-job" },
    keep_alive = { Message::KeepAlive { job_id: 1 }, "keep-alive" },
    dispatch = { Message::DispatchTests { job_id: 1, step_index: 0, tests: vec![] }, "dispatch-tests" },
)]
fn message_names_match_tags(message: Message, name: &str) {
    assert_eq!(message.name(), name);
    assert_eq!(req(message)["msg"], name);
}

#[test]
fn done_report_is_terminal() {
    assert!(StepReport::from(StepResult::done()).is_terminal());
    assert!(!StepReport::in_progress().is_terminal());
}
