// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent's pull loop: register, poll, run one job at a time.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kk_core::log_entry::format_time;
use kk_core::{Clock, Context, SystemClock};
use kk_wire::{Message, Response};
use serde_json::{Map, Value};

use crate::dispatch::Dispatcher;
use crate::host;
use crate::job::{JobOutcome, JobRunner};
use crate::shipper::ShipperHandle;

#[derive(Debug, Clone)]
pub struct LoopOptions {
    /// Pause after an empty poll or a failed request.
    pub poll_interval: Duration,
    /// Pause before re-registering after an `unauthorized` reply.
    pub unauthorized_wait: Duration,
    /// Stop after the first job.
    pub one_job: bool,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self { poll_interval: Duration::from_secs(5), unauthorized_wait: Duration::from_secs(10), one_job: false }
    }
}

impl LoopOptions {
    kk_core::setters! {
        set {
            poll_interval: Duration,
            unauthorized_wait: Duration,
            one_job: bool,
        }
    }
}

pub struct Agent<C: Clock = SystemClock> {
    dispatcher: Arc<dyn Dispatcher>,
    jobs: JobRunner<C>,
    options: LoopOptions,
    shipper: Option<ShipperHandle>,
}

impl<C: Clock> Agent<C> {
    pub fn new(dispatcher: Arc<dyn Dispatcher>, jobs: JobRunner<C>, options: LoopOptions) -> Self {
        Self { dispatcher, jobs, options, shipper: None }
    }

    kk_core::setters! {
        option {
            shipper: ShipperHandle,
        }
    }

    /// Run until `cx` is cancelled (or after one job in one-job mode).
    ///
    /// Returns the number of jobs run.
    pub async fn run(&self, cx: &Context) -> usize {
        let mut jobs = 0;
        if !self.register(cx).await {
            return jobs;
        }

        let mut last_seen = None;
        while !cx.is_cancelled() {
            let polled = self.dispatcher.send(Message::GetJob { last_seen: last_seen.clone() }).await;
            let resp = match polled {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::error!(error = %e, "get-job failed");
                    if !self.pause(cx, self.options.poll_interval).await {
                        break;
                    }
                    continue;
                }
            };
            last_seen = Some(format_time(Utc::now()));

            if resp.unauthorized {
                tracing::warn!("agent no longer authorized, registering again");
                if !self.register(cx).await {
                    break;
                }
                continue;
            }
            let Some(outcome) = self.handle(cx, resp).await else {
                if !self.pause(cx, self.options.poll_interval).await {
                    break;
                }
                continue;
            };

            jobs += 1;
            tracing::info!(job_id = outcome.job_id, status = %outcome.status, "job done");
            if self.options.one_job {
                tracing::info!("one-job mode, exiting");
                break;
            }
        }
        tracing::info!(jobs, "agent loop stopped");
        jobs
    }

    /// Send `host-info` until the server accepts this agent. `false` when
    /// cancelled first.
    async fn register(&self, cx: &Context) -> bool {
        loop {
            if cx.is_cancelled() {
                return false;
            }
            let info = host::host_info(cx.settings().system_id);
            tracing::info!(system = %info.system, isolation = ?info.isolation, "registering host");
            match self.dispatcher.send(Message::HostInfo { info }).await {
                Ok(resp) if resp.unauthorized => {
                    tracing::warn!(wait = ?self.options.unauthorized_wait, "agent not authorized yet");
                    if !self.pause(cx, self.options.unauthorized_wait).await {
                        return false;
                    }
                }
                Ok(resp) => {
                    cx.log().set_agent(resp.agent_id);
                    if let Some(cfg) = &resp.cfg {
                        self.apply_cfg(cx, cfg);
                    }
                    tracing::info!(agent_id = resp.agent_id, "registered");
                    return true;
                }
                Err(e) => {
                    tracing::error!(error = %e, "host-info failed");
                    if !self.pause(cx, self.options.poll_interval).await {
                        return false;
                    }
                }
            }
        }
    }

    async fn handle(&self, cx: &Context, resp: Response) -> Option<JobOutcome> {
        if let Some(cfg) = &resp.cfg {
            self.apply_cfg(cx, cfg);
        }
        let job = resp.job?;
        let outcome = self.jobs.run(cx, job).await;
        cx.log().set_job(None);
        Some(outcome)
    }

    /// Merge server config; a changed log proxy or server address takes
    /// effect immediately.
    fn apply_cfg(&self, cx: &Context, cfg: &Map<String, Value>) {
        let changed = cx.update_settings(|s| s.merge_remote(cfg));
        if changed.is_empty() {
            return;
        }
        let settings = cx.settings();
        tracing::info!(changed = ?changed, "config updated by server");
        for key in &changed {
            match key.as_str() {
                "clickhouse_addr" => {
                    if let Some(shipper) = &self.shipper {
                        shipper.retarget(settings.clickhouse_addr.as_deref());
                    }
                }
                "server" => {
                    if let Some(server) = &settings.server {
                        self.dispatcher.retarget(server);
                    }
                }
                _ => {}
            }
        }
    }

    /// Sleep for `d`; `false` when `cx` is cancelled first.
    async fn pause(&self, cx: &Context, d: Duration) -> bool {
        tokio::select! {
            _ = cx.cancel_token().cancelled() => false,
            _ = tokio::time::sleep(d) => true,
        }
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
