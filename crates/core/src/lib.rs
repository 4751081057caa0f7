// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kk-core: data model and shared plumbing for the Kraken agent and tool harness

pub mod macros;

pub mod cache;
pub mod clock;
pub mod context;
pub mod job;
pub mod log_entry;
pub mod mask;
pub mod package;
pub mod result;
pub mod retry;
pub mod step;
pub mod vars;

pub use cache::{tar_name, CacheMeta};
pub use clock::{Clock, FakeClock, SystemClock};
pub use context::{Context, Settings};
pub use job::{ExecutorKind, Job};
pub use log_entry::{LogContext, LogEntry, LogFields, LogLevel};
pub use mask::{MaskRegistry, SecretPosition, MASK};
pub use package::{ObjectUri, ToolPackage, UriError};
pub use result::{
    Artifact, FailReason, Issue, StepResult, StepStatus, TestCaseResult, TestStatus, ValueStats,
    TIMEOUT_RETCODE,
};
pub use retry::Backoff;
pub use step::{Command, FieldError, Step, StepState};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
