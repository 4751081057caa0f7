// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kk-agent: the Kraken worker daemon.
//!
//! [`Agent`] registers with the dispatcher and polls it for jobs. Each job
//! goes to a [`JobRunner`], which walks the steps in order; a [`StepRunner`]
//! drives one step through the tool commands via a [`Harness`], relaying
//! streamed records through an [`Uploader`] and sending keep-alives while
//! the tool runs.

pub mod config;
mod control;
mod dispatch;
pub mod env;
mod error;
mod harness;
pub mod host;
mod job;
pub mod logging;
pub mod shipper;
mod step;
mod uploader;

pub use config::{AgentConfig, Cli};
pub use control::{Agent, LoopOptions};
pub use dispatch::{Dispatcher, HttpDispatcher};
pub use error::{AgentError, ConfigError, DispatchError, HarnessError};
pub use harness::{BuiltinHarness, Harness, Invocation, ProcessHarness, ToolLocator, ToolSource};
pub use job::{JobOutcome, JobRunner, JobStatus};
pub use step::StepRunner;
pub use uploader::{UploadStats, Uploader};

#[cfg(any(test, feature = "test-support"))]
pub use dispatch::FakeDispatcher;
