// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! kktool: runs one command of one tool against a step file.
//!
//! ```text
//! kktool -r 127.0.0.1:4242 -s /work/step.json -m shell run
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;
use kk_core::{Command, Context, SecretPosition, Settings, Step};
use kk_tools::{session, ProgressSink, Registry, StdoutSink, TcpSink};
use tokio::signal::unix::{signal, Signal, SignalKind};

#[derive(Debug, Parser)]
#[command(name = "kktool", version, about = "Kraken tool harness")]
struct Args {
    /// TCP address to report progress and the final status to.
    #[arg(short = 'r', long = "return-address")]
    return_address: Option<String>,

    /// Step file written by the agent.
    #[arg(short = 's', long = "step-file")]
    step_file: Option<PathBuf>,

    /// Tool to load; defaults to the step's `tool`.
    #[arg(short = 'm', long = "module")]
    module: Option<String>,

    /// get_commands, collect_tests, run, run_tests, run_analysis,
    /// run_artifacts, run_data or check-integrity.
    command: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    if args.command == "check-integrity" {
        return ExitCode::SUCCESS;
    }

    let cx = Context::new(Settings::default());
    kk_tools::logging::init_stderr(cx.masks().clone());
    // Registered before any child starts so a stop request always reaches it.
    match stop_signals() {
        Ok((term, int)) => {
            tokio::spawn(cancel_on_signal(cx.clone(), term, int));
        }
        Err(e) => tracing::warn!(error = %e, "cannot listen for stop signals"),
    }

    match harness(&cx, args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = format!("{e:#}"), "harness failed");
            ExitCode::FAILURE
        }
    }
}

fn stop_signals() -> std::io::Result<(Signal, Signal)> {
    Ok((signal(SignalKind::terminate())?, signal(SignalKind::interrupt())?))
}

/// Stop the running command on SIGTERM or SIGINT. The command's own process
/// group lives apart from ours, so it is only killed through `cx`.
async fn cancel_on_signal(cx: Context, mut term: Signal, mut int: Signal) {
    tokio::select! {
        _ = term.recv() => tracing::info!("terminated, stopping command"),
        _ = int.recv() => tracing::info!("interrupted, stopping command"),
    }
    cx.cancel();
}

async fn harness(cx: &Context, args: Args) -> anyhow::Result<()> {
    let command: Command = args.command.parse()?;
    let step_file = args.step_file.context("missing --step-file")?;
    let text = tokio::fs::read_to_string(&step_file)
        .await
        .with_context(|| format!("reading step file {}", step_file.display()))?;
    let step: Step = serde_json::from_str(&text).context("parsing step file")?;
    for secret in step.masked_values() {
        cx.masks().add_mask_secret(&secret, SecretPosition::Middle);
    }

    let mut sink: Box<dyn ProgressSink> = match &args.return_address {
        Some(addr) => Box::new(TcpSink::connect(addr).await?),
        None => Box::new(StdoutSink),
    };

    let registry = Registry::builtin();
    let name = args.module.as_deref().unwrap_or(&step.tool);
    let tool = match registry.get(name) {
        Ok(tool) => tool,
        Err(e) => {
            // Still owe the agent a terminal message.
            let msg = kk_wire::Progress::Error {
                reason: kk_core::FailReason::Exception,
                retcode: None,
                msg: Some(e.to_string()),
            };
            sink.send(&msg).await?;
            return Err(e.into());
        }
    };

    session::execute(cx, tool.as_ref(), command, &step, sink.as_mut()).await?;
    Ok(())
}
