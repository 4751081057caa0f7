// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use kk_core::TestStatus;
use proptest::prelude::*;

use super::*;
use crate::MemorySink;

fn result(i: usize) -> TestCaseResult {
    TestCaseResult::new(format!("t{i}"), TestStatus::Passed)
}

#[tokio::test]
async fn full_batches_go_out_as_they_fill() {
    let sink = MemorySink::new();
    let mut handle = sink.clone();
    let mut out = Collector::new(&mut handle);
    for i in 0..250 {
        out.report(result(i)).await.unwrap();
    }
    assert_eq!(sink.batch_sizes(), vec![100, 100]);
    assert_eq!(out.finish().await.unwrap(), 250);
    assert_eq!(sink.batch_sizes(), vec![100, 100, 50]);
}

#[tokio::test]
async fn finish_without_records_sends_nothing() {
    let sink = MemorySink::new();
    let mut handle = sink.clone();
    let out: Collector<'_, Issue> = Collector::new(&mut handle);
    assert_eq!(out.finish().await.unwrap(), 0);
    assert!(sink.messages().is_empty());
}

#[tokio::test]
async fn elapsed_period_flushes_early() {
    let sink = MemorySink::new();
    let mut handle = sink.clone();
    let mut out = Collector::with_limits(&mut handle, 100, Duration::ZERO);
    out.report(Artifact { path: "a".into(), size: 1 }).await.unwrap();
    out.report(Artifact { path: "b".into(), size: 2 }).await.unwrap();
    out.finish().await.unwrap();
    assert_eq!(sink.batch_sizes(), vec![1, 1]);
    assert_eq!(sink.artifacts().len(), 2);
}

#[tokio::test]
async fn data_records_use_the_data_key() {
    let sink = MemorySink::new();
    let mut handle = sink.clone();
    let mut out = Collector::new(&mut handle);
    out.report(serde_json::json!({"k": 1})).await.unwrap();
    out.finish().await.unwrap();
    let line = String::from_utf8(kk_wire::encode_line(&sink.messages()[0]).unwrap()).unwrap();
    assert_eq!(line, "{\"status\":\"in-progress\",\"data\":[{\"k\":1}]}\n");
}

#[tokio::test]
async fn closed_sink_surfaces_on_next_flush() {
    let sink = MemorySink::new();
    sink.fail_after(1);
    let mut handle = sink.clone();
    let mut out = Collector::with_limits(&mut handle, 1, FLUSH_PERIOD);
    out.report(result(0)).await.unwrap();
    let err = out.report(result(1)).await.unwrap_err();
    assert!(err.is_sink_closed());
}

proptest! {
    #[test]
    fn batch_count_is_bounded(m in 0usize..700) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let sink = MemorySink::new();
        rt.block_on(async {
            let mut handle = sink.clone();
            let mut out = Collector::new(&mut handle);
            for i in 0..m {
                out.report(result(i)).await.unwrap();
            }
            out.finish().await.unwrap();
        });
        let sizes = sink.batch_sizes();
        prop_assert_eq!(sizes.iter().sum::<usize>(), m);
        prop_assert!(sizes.len() >= m.div_ceil(BATCH_LIMIT));
        prop_assert!(sizes.len() <= m);
        prop_assert!(sizes.iter().all(|s| *s <= BATCH_LIMIT));
    }
}
