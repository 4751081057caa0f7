// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use kk_core::{Command, Context, Step, TIMEOUT_RETCODE};

use super::exec_options;
use crate::{Outcome, Tool, ToolError};

/// Runs `cmd` through `sh -c`.
pub struct Shell;

#[async_trait]
impl Tool for Shell {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn commands(&self) -> &'static [Command] {
        &[Command::Run]
    }

    async fn run(&self, cx: &Context, step: &Step) -> Result<Outcome, ToolError> {
        let cmd = step.require_str("cmd")?;
        let opts = exec_options(cx, step).out_prefix("");
        let out = kk_exec::run(cmd, &opts).await?;
        Ok(match out.retcode {
            0 => Outcome::ok(),
            TIMEOUT_RETCODE => Outcome::failed(
                TIMEOUT_RETCODE,
                format!("cmd timed out after {}s", step.timeout_or_default().as_secs()),
            ),
            rc if out.stopped => Outcome::failed(rc, "cmd was stopped"),
            rc => Outcome::failed(rc, format!("cmd exited with non-zero retcode: {rc}")),
        })
    }
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
