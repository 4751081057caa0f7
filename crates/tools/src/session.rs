// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One harness command, start to terminal message.

use kk_core::{Command, Context, FailReason, Step};
use kk_wire::Progress;

use crate::collector::Collector;
use crate::error::ToolError;
use crate::sink::ProgressSink;
use crate::tool::{Outcome, Tool};

/// Run `command` of `tool` on `step`, streaming into `sink`.
///
/// Exactly one terminal message (`done` or `error`) is sent last. A tool
/// failure becomes `reason=exception`; only a broken sink is returned as an
/// error, since nothing more can be reported then.
pub async fn execute(
    cx: &Context,
    tool: &dyn Tool,
    command: Command,
    step: &Step,
    sink: &mut dyn ProgressSink,
) -> Result<(), ToolError> {
    tracing::info!(tool = tool.name(), %command, step = %step.label(), "run step tool");

    let terminal = match dispatch(cx, tool, command, step, sink).await {
        Ok(msg) => msg,
        Err(e) if e.is_sink_closed() => return Err(e),
        Err(e) => {
            tracing::error!(tool = tool.name(), %command, error = %e, "tool interrupted by error");
            Progress::Error { reason: FailReason::Exception, retcode: None, msg: Some(e.to_string()) }
        }
    };

    if let Progress::Error { reason, retcode, .. } = &terminal {
        tracing::info!(tool = tool.name(), %command, %reason, ?retcode, "step tool failed");
    } else {
        tracing::info!(tool = tool.name(), %command, "step tool done");
    }
    sink.send(&terminal).await
}

async fn dispatch(
    cx: &Context,
    tool: &dyn Tool,
    command: Command,
    step: &Step,
    sink: &mut dyn ProgressSink,
) -> Result<Progress, ToolError> {
    if command != Command::GetCommands && !tool.commands().contains(&command) {
        return Err(ToolError::unsupported(tool.name(), command));
    }
    let outcome = match command {
        Command::GetCommands => {
            return Ok(Progress::Done { commands: Some(tool.commands().to_vec()), tests: None });
        }
        Command::CollectTests => {
            let tests = tool.collect_tests(cx, step).await?;
            tracing::info!(count = tests.len(), "collected tests");
            return Ok(Progress::Done { commands: None, tests: Some(tests) });
        }
        Command::Run => tool.run(cx, step).await?,
        Command::RunTests => {
            let mut out = Collector::new(sink);
            let outcome = tool.run_tests(cx, step, &mut out).await?;
            finish(out, outcome).await?
        }
        Command::RunAnalysis => {
            let mut out = Collector::new(sink);
            let outcome = tool.run_analysis(cx, step, &mut out).await?;
            finish(out, outcome).await?
        }
        Command::RunArtifacts => {
            let mut out = Collector::new(sink);
            let outcome = tool.run_artifacts(cx, step, &mut out).await?;
            finish(out, outcome).await?
        }
        Command::RunData => {
            let mut out = Collector::new(sink);
            let outcome = tool.run_data(cx, step, &mut out).await?;
            finish(out, outcome).await?
        }
    };
    Ok(outcome.into_result().into())
}

async fn finish<T: crate::collector::Record>(
    out: Collector<'_, T>,
    outcome: Outcome,
) -> Result<Outcome, ToolError> {
    let reported = out.finish().await?;
    tracing::info!(reported, retcode = outcome.retcode, "records reported");
    Ok(outcome)
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
