// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixtures and proptest strategies for tests in this and other crates.

use proptest::prelude::*;

use crate::job::{ExecutorKind, Job};
use crate::result::{TestCaseResult, TestStatus};
use crate::step::Step;

/// Shell step running `cmd`.
pub fn shell_step(cmd: &str) -> Step {
    Step::new("shell").with("cmd", cmd)
}

/// Local job with the given steps, indices already assigned.
pub fn job_with_steps(id: u64, steps: Vec<Step>) -> Job {
    let mut job = Job {
        id,
        deadline: None,
        timeout: Some(600),
        executor: ExecutorKind::Local,
        steps,
        flow_id: Some(1),
        run_id: Some(1),
        branch_id: None,
        flow_kind: None,
        trigger_data: None,
        secrets: Vec::new(),
        cleanup: false,
    };
    for (idx, step) in job.steps.iter_mut().enumerate() {
        step.index = idx;
    }
    job
}

pub fn arb_test_status() -> impl Strategy<Value = TestStatus> {
    prop_oneof![
        Just(TestStatus::Passed),
        Just(TestStatus::Failed),
        Just(TestStatus::Error),
        Just(TestStatus::Disabled),
    ]
}

/// Results with unique names `t0..tN`.
pub fn arb_test_results(max: usize) -> impl Strategy<Value = Vec<TestCaseResult>> {
    prop::collection::vec(arb_test_status(), 0..max).prop_map(|statuses| {
        statuses
            .into_iter()
            .enumerate()
            .map(|(i, s)| TestCaseResult::new(format!("t{i}"), s))
            .collect()
    })
}
