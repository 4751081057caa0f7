// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kk-tools: the tool harness.
//!
//! A [`Tool`] answers the harness commands (`get_commands`, `run`,
//! `run_tests`...). [`session::execute`] runs one command against one step
//! and streams [`kk_wire::Progress`] lines into a [`ProgressSink`], batching
//! streamed records through a [`Collector`].

mod collector;
mod error;
pub mod logging;
mod registry;
pub mod session;
mod sink;
mod tool;
pub mod tools;

pub use collector::{Collector, Record, BATCH_LIMIT, FLUSH_PERIOD};
pub use error::ToolError;
pub use registry::Registry;
pub use sink::{ChannelSink, ProgressSink, StdoutSink, TcpSink};
pub use tool::{Outcome, Tool};

#[cfg(any(test, feature = "test-support"))]
pub use sink::MemorySink;
