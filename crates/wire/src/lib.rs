// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire formats spoken by the agent.
//!
//! - Agent to dispatcher: JSON documents POSTed to `/backend`, tagged by `msg`.
//! - Harness to agent: one JSON object per `\n`-terminated line over TCP,
//!   tagged by `status`.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod progress;
mod request;
mod response;
mod wire;

pub use progress::{Batch, Progress};
pub use request::{HostInfo, Message, ReportStatus, Request, StepReport};
pub use response::Response;
pub use wire::{decode_line, encode_line, read_line, write_line, ProtocolError, MAX_LINE};
