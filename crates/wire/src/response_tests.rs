// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    empty_body = { b"" },
    empty_object = { b"{}" },
    empty_job = { br#"{"job": {}}"# },
    null_job = { br#"{"job": null}"# },
)]
fn no_work(body: &[u8]) {
    let r = Response::parse(body).unwrap();
    assert!(r.job.is_none());
    assert!(!r.cancel);
}

#[test]
fn job_under_key() {
    let body = br#"{"job": {"id": 3, "deadline": 1700000000.5, "steps": [{"tool": "shell", "cmd": "ls"}]}, "cfg": {"clickhouse_addr": "ch:9001"}}"#;
    let r = Response::parse(body).unwrap();
    let job = r.job.unwrap();
    assert_eq!(job.id, 3);
    assert_eq!(job.steps[0].str_field("cmd"), Some("ls"));
    assert_eq!(r.cfg.unwrap()["clickhouse_addr"], "ch:9001");
}

#[test]
fn bare_job_document() {
    let body = br#"{"id": 8, "steps": []}"#;
    let r = Response::parse(body).unwrap();
    assert_eq!(r.job.map(|j| j.id), Some(8));
}

#[test]
fn cancel_and_tests_flags() {
    let r = Response::parse(br#"{"cancel": true, "tests": ["a", "b"]}"#).unwrap();
    assert!(r.cancel);
    assert_eq!(r.tests, Some(vec!["a".to_string(), "b".to_string()]));
}

#[test]
fn garbage_is_an_error() {
    assert!(Response::parse(b"<html>").is_err());
}
