// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicU32, Ordering};

fn fast() -> Backoff {
    Backoff { initial: Duration::from_millis(1), max_delay: Duration::from_millis(5), ..Backoff::default() }
}

#[yare::parameterized(
    first = { 0, 200 },
    second = { 1, 600 },
    third = { 2, 1800 },
    capped = { 3, 3000 },
    far = { 30, 3000 },
)]
fn ceilings(n: u32, ms: u64) {
    assert_eq!(Backoff::default().ceiling(n), Duration::from_millis(ms));
}

#[test]
fn delay_stays_within_jitter_window() {
    let b = Backoff::default();
    for n in 0..4 {
        let d = b.delay(n);
        assert!(d >= b.ceiling(n) / 2 && d <= b.ceiling(n), "{d:?} for try {n}");
    }
}

#[tokio::test]
async fn retries_transient_errors_up_to_tries() {
    let calls = AtomicU32::new(0);
    let r: Result<(), String> = fast()
        .retry("test", |_| true, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("down".to_string())
        })
        .await;
    assert_eq!(r, Err("down".into()));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn permanent_errors_are_not_retried() {
    let calls = AtomicU32::new(0);
    let r: Result<(), String> = fast()
        .retry("test", |_| false, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("bad request".to_string())
        })
        .await;
    assert!(r.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn succeeds_after_a_failure() {
    let calls = AtomicU32::new(0);
    let r: Result<u32, String> = fast()
        .retry("test", |_| true, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 { Err("flaky".to_string()) } else { Ok(n) }
        })
        .await;
    assert_eq!(r, Ok(1));
}
