// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use kk_core::Settings;

use super::*;
use crate::MemorySink;

#[test]
fn numeric_entries_become_values() {
    let result = collect("perf".into(), Path::new("perf.json"), r#"{"fps": 59.5, "frames": 1200}"#);
    assert_eq!(result.status, TestStatus::Passed);
    assert_eq!(result.values["fps"].value, 59.5);
    assert_eq!(result.values["frames"].value, 1200.0);
}

#[test]
fn non_numeric_entries_are_skipped() {
    let result = collect("perf".into(), Path::new("perf.json"), r#"{"fps": 30, "label": "nightly"}"#);
    assert_eq!(result.status, TestStatus::Passed);
    assert_eq!(result.values.keys().collect::<Vec<_>>(), vec!["fps"]);
}

#[test]
fn unparseable_file_is_an_error_result() {
    let result = collect("perf".into(), Path::new("perf.json"), "fps=30");
    assert_eq!(result.status, TestStatus::Error);
    assert_eq!(result.msg.as_deref(), Some("cannot parse perf.json file"));
}

#[tokio::test]
async fn one_result_per_listed_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.json"), r#"{"speed": 3}"#).unwrap();

    let step = Step::new("values_collect")
        .with("cwd", dir.path().to_string_lossy().to_string())
        .with(
            "files",
            serde_json::json!([{"name": "a.json", "namespace": "bench"}, {"name": "missing.json"}]),
        );
    let sink = MemorySink::new();
    let mut handle = sink.clone();
    let mut out = Collector::new(&mut handle);
    let outcome =
        ValuesCollect.run_tests(&Context::new(Settings::default()), &step, &mut out).await.unwrap();
    out.finish().await.unwrap();

    assert!(outcome.is_ok());
    let results = sink.test_results();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].test, "bench");
    assert_eq!(results[0].values["speed"].value, 3.0);
    assert_eq!(results[1].test, "missing.json");
    assert_eq!(results[1].status, TestStatus::Error);
    assert!(results[1].msg.as_deref().unwrap_or("").starts_with("missing "));
}

#[tokio::test]
async fn files_field_is_required() {
    let sink = MemorySink::new();
    let mut handle = sink.clone();
    let mut out = Collector::new(&mut handle);
    let err = ValuesCollect
        .run_tests(&Context::new(Settings::default()), &Step::new("values_collect"), &mut out)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("files"), "{err}");
}
