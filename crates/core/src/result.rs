// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step outcomes and the records tools stream while they run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Return code reported when a command is killed for exceeding its timeout.
pub const TIMEOUT_RETCODE: i32 = 10000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Done,
    Error,
}

crate::simple_display! {
    StepStatus {
        Done => "done",
        Error => "error",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailReason {
    Retcode,
    Exception,
    Timeout,
    Cancelled,
    JobTimeout,
    NoTests,
}

crate::simple_display! {
    FailReason {
        Retcode => "retcode",
        Exception => "exception",
        Timeout => "timeout",
        Cancelled => "cancelled",
        JobTimeout => "job-timeout",
        NoTests => "no-tests",
    }
}

/// Terminal outcome of a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retcode: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    /// Whole seconds, rounded to nearest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

impl StepResult {
    pub fn done() -> Self {
        Self { status: StepStatus::Done, retcode: None, reason: None, msg: None, duration: None }
    }

    pub fn error(reason: FailReason, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        Self {
            status: StepStatus::Error,
            retcode: None,
            reason: Some(reason),
            msg: (!msg.is_empty()).then_some(msg),
            duration: None,
        }
    }

    /// Map a tool's `(ret, msg)` pair to a result.
    pub fn from_retcode(retcode: i32, msg: impl Into<String>) -> Self {
        match retcode {
            0 => Self::done(),
            TIMEOUT_RETCODE => Self::timeout(),
            code => {
                let mut r = Self::error(FailReason::Retcode, msg);
                r.retcode = Some(code);
                r
            }
        }
    }

    pub fn timeout() -> Self {
        let mut r = Self::error(FailReason::Timeout, "");
        r.retcode = Some(TIMEOUT_RETCODE);
        r
    }

    pub fn cancelled() -> Self {
        Self::error(FailReason::Cancelled, "")
    }

    pub fn exception(msg: impl Into<String>) -> Self {
        Self::error(FailReason::Exception, msg)
    }

    pub fn with_duration(mut self, duration: std::time::Duration) -> Self {
        self.duration = Some(duration.as_secs_f64().round() as u64);
        self
    }

    pub fn is_error(&self) -> bool {
        self.status == StepStatus::Error
    }
}

/// Test-case status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum TestStatus {
    NotRun,
    Passed,
    Failed,
    Error,
    Disabled,
    Unsupported,
}

impl From<u8> for TestStatus {
    fn from(v: u8) -> Self {
        match v {
            1 => TestStatus::Passed,
            2 => TestStatus::Failed,
            3 => TestStatus::Error,
            4 => TestStatus::Disabled,
            5 => TestStatus::Unsupported,
            _ => TestStatus::NotRun,
        }
    }
}

impl From<TestStatus> for u8 {
    fn from(s: TestStatus) -> u8 {
        match s {
            TestStatus::NotRun => 0,
            TestStatus::Passed => 1,
            TestStatus::Failed => 2,
            TestStatus::Error => 3,
            TestStatus::Disabled => 4,
            TestStatus::Unsupported => 5,
        }
    }
}

/// A measured value attached to a test result.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValueStats {
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stddev: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cv: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<f64>,
}

impl ValueStats {
    /// A single observation.
    pub fn single(value: f64) -> Self {
        Self { value, iterations: Some(1), ..Self::default() }
    }

    /// Summary statistics over repeated measurements; `value` is the mean.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mean = sorted.iter().sum::<f64>() / n;
        let mid = sorted.len() / 2;
        let median =
            if sorted.len() % 2 == 0 { (sorted[mid - 1] + sorted[mid]) / 2.0 } else { sorted[mid] };
        let min = sorted[0];
        let max = sorted[sorted.len() - 1];
        let variance = if sorted.len() > 1 {
            sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)
        } else {
            0.0
        };
        let stddev = variance.sqrt();

        // Most frequent value; ties go to the smallest.
        let mut mode = sorted[0];
        let mut best = 0;
        let mut run = 0;
        for (i, x) in sorted.iter().enumerate() {
            run = if i > 0 && sorted[i - 1] == *x { run + 1 } else { 1 };
            if run > best {
                best = run;
                mode = *x;
            }
        }

        Some(Self {
            value: mean,
            iterations: Some(samples.len() as u64),
            median: Some(median),
            min: Some(min),
            max: Some(max),
            range: Some(max - min),
            stddev: Some(stddev),
            variance: Some(variance),
            cv: (mean != 0.0).then(|| stddev / mean * 100.0),
            mode: Some(mode),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseResult {
    #[serde(default)]
    pub cmd: String,
    pub test: String,
    pub status: TestStatus,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, ValueStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl TestCaseResult {
    pub fn new(test: impl Into<String>, status: TestStatus) -> Self {
        Self { cmd: String::new(), test: test.into(), status, values: BTreeMap::new(), msg: None }
    }

    pub fn with_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.cmd = cmd.into();
        self
    }

    pub fn with_value(mut self, name: impl Into<String>, value: ValueStats) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub path: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
    pub symbol: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Issue {
    /// Key the server deduplicates re-sent issues by.
    pub fn dedup_key(&self) -> (String, u32, u32, String) {
        (self.path.clone(), self.line, self.column, self.symbol.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: String,
    pub size: u64,
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
