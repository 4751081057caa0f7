// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! kkagent: polls the dispatcher and runs jobs.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use kk_agent::{
    env, host, logging, Agent, AgentConfig, BuiltinHarness, Cli, Dispatcher, Harness, HttpDispatcher, JobRunner,
    LoopOptions, ProcessHarness, StepRunner, ToolLocator,
};
use kk_core::Context;

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Logging may not be up yet.
            eprintln!("kkagent: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AgentConfig::load(cli)?;
    let cx = Context::new(config.settings());
    let hostname = host::host_info(config.system_id.clone()).hostname;
    let logs = logging::init(&cx, &hostname)?;

    let jobs_dir = cx.settings().jobs_dir();
    std::fs::create_dir_all(&jobs_dir).with_context(|| format!("creating {}", jobs_dir.display()))?;

    let address = host::my_address(&config.server);
    tracing::info!(
        server = %config.server,
        %address,
        data_dir = %config.data_dir.display(),
        version = host::AGENT_VERSION,
        "agent starting"
    );
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(HttpDispatcher::new(&config.server, address)?);

    let harness: Arc<dyn Harness> = if env::builtin_harness() {
        tracing::info!("running tools in-process");
        Arc::new(BuiltinHarness::default())
    } else {
        let tool_bin = env::tool_bin();
        tracing::info!(tool_bin = %tool_bin.display(), "running tools through the harness binary");
        Arc::new(ProcessHarness::new(tool_bin, ToolLocator::new(cx.settings().tools_cache_dir())))
    };

    let steps = StepRunner::new(Arc::clone(&dispatcher), harness);
    let agent = Agent::new(
        Arc::clone(&dispatcher),
        JobRunner::new(dispatcher, steps),
        LoopOptions::default().one_job(config.one_job),
    )
    .shipper(logs.shipper.clone());

    tokio::spawn(cancel_on_signal(cx.clone()));
    agent.run(&cx).await;
    tracing::info!("agent stopped");
    Ok(())
}

async fn cancel_on_signal(cx: Context) {
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted, shutting down"),
        () = terminate => tracing::info!("terminated, shutting down"),
    }
    cx.cancel();
}
