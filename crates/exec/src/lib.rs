// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kk-exec: run a shell command under supervision.
//!
//! Output (stdout and stderr merged) is spooled to a temporary file and read
//! back in small chunks while the child runs, so a chatty child can never
//! block on a full pipe. The supervisor enforces a timeout, polls an
//! optional callback for cooperative cancellation, and traces output with
//! secrets masked.

mod decode;
mod error;
mod options;
mod quote;
mod run;

pub use decode::{LineBuffer, OutputDecoder};
pub use error::ExecError;
pub use options::ExecOptions;
pub use quote::quote;
pub use run::{run, run_with, ExecOutcome};
