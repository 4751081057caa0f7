// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in tools.

use std::path::PathBuf;

use kk_core::{Context, Step};
use kk_exec::ExecOptions;

use crate::error::ToolError;

mod artifacts;
mod cache;
mod cloc;
mod data;
mod git;
mod gotest;
mod junit;
mod lint;
mod pytest;
mod rndtest;
mod shell;
mod values;

pub use artifacts::Artifacts;
pub use cache::Cache;
pub use cloc::Cloc;
pub use data::Data;
pub use git::Git;
pub use gotest::GoTest;
pub use junit::JunitCollect;
pub use lint::{NgLint, PyLint};
pub use pytest::PyTest;
pub use rndtest::RndTest;
pub use shell::Shell;
pub use values::ValuesCollect;

/// Execute options from the step's `cwd`, `env` and `timeout`, stopped
/// with the context.
pub(crate) fn exec_options(cx: &Context, step: &Step) -> ExecOptions {
    let mut opts = ExecOptions::default()
        .env(step.env())
        .timeout(step.timeout_or_default())
        .cancel(cx.cancel_token().clone());
    if let Some(cwd) = step.cwd() {
        opts = opts.cwd(cx.expand(cwd));
    }
    opts
}

/// Directory relative step paths resolve against.
pub(crate) fn work_dir(cx: &Context, step: &Step) -> Result<PathBuf, ToolError> {
    let here = std::env::current_dir()?;
    Ok(match step.cwd() {
        Some(cwd) => here.join(cx.expand(cwd)),
        None => here,
    })
}

/// Non-zero exit of a wrapped program, in the words the server shows.
pub(crate) fn exited(program: &str, retcode: i32) -> crate::Outcome {
    tracing::error!(program, retcode, "exited with non-zero retcode");
    crate::Outcome::failed(retcode, format!("{program} exited with non-zero retcode"))
}
