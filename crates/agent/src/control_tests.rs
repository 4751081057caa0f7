// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kk_core::test_support::{job_with_steps, shell_step};
use kk_core::{FailReason, Settings};
use serde_json::json;

use crate::dispatch::FakeDispatcher;
use crate::harness::BuiltinHarness;
use crate::step::StepRunner;

struct Fixture {
    _data: tempfile::TempDir,
    fake: FakeDispatcher,
    cx: Context,
}

impl Fixture {
    fn new() -> Self {
        let data = tempfile::tempdir().unwrap();
        let cx = Context::new(Settings { data_dir: data.path().to_path_buf(), ..Settings::default() });
        Self { _data: data, fake: FakeDispatcher::new(), cx }
    }

    fn agent(&self, options: LoopOptions) -> Agent {
        let dispatcher: Arc<dyn Dispatcher> = Arc::new(self.fake.clone());
        let steps = StepRunner::new(Arc::clone(&dispatcher), Arc::new(BuiltinHarness::default()));
        Agent::new(Arc::clone(&dispatcher), JobRunner::new(dispatcher, steps), options)
    }
}

fn fast() -> LoopOptions {
    LoopOptions::default()
        .poll_interval(Duration::from_millis(10))
        .unauthorized_wait(Duration::from_millis(10))
}

fn job_reply(id: u64, cmd: &str) -> Response {
    Response { job: Some(job_with_steps(id, vec![shell_step(cmd)])), ..Response::default() }
}

fn cfg(value: serde_json::Value) -> Option<Map<String, Value>> {
    value.as_object().cloned()
}

#[tokio::test]
async fn one_job_mode_runs_a_single_job() {
    let f = Fixture::new();
    f.fake.reply("host-info", Response { agent_id: Some(5), ..Response::default() });
    f.fake.reply("get-job", Response::default());
    f.fake.reply("get-job", job_reply(1, "true"));

    let jobs = f.agent(fast().one_job(true)).run(&f.cx).await;

    assert_eq!(jobs, 1);
    assert_eq!(f.fake.names(), vec!["host-info", "get-job", "get-job", "step-result"]);
    let log = f.cx.log().snapshot();
    assert_eq!(log.agent_id, Some(5));
    assert_eq!(log.job_id, None);
}

#[tokio::test]
async fn second_poll_carries_last_seen() {
    let f = Fixture::new();
    f.fake.reply("get-job", Response::default());
    f.fake.reply("get-job", job_reply(1, "true"));

    f.agent(fast().one_job(true)).run(&f.cx).await;

    let polls: Vec<Option<String>> = f
        .fake
        .messages()
        .into_iter()
        .filter_map(|m| match m {
            Message::GetJob { last_seen } => Some(last_seen),
            _ => None,
        })
        .collect();
    assert_eq!(polls.len(), 2);
    assert_eq!(polls[0], None);
    assert!(polls[1].as_deref().is_some_and(|t| t.ends_with('Z')));
}

#[tokio::test]
async fn unauthorized_registration_is_retried() {
    let f = Fixture::new();
    let denied = Response { unauthorized: true, ..Response::default() };
    f.fake.reply("host-info", denied.clone());
    f.fake.reply("host-info", denied);
    f.fake.reply("host-info", Response { agent_id: Some(9), ..Response::default() });
    f.fake.reply("get-job", job_reply(2, "true"));

    let jobs = f.agent(fast().one_job(true)).run(&f.cx).await;

    assert_eq!(jobs, 1);
    let names = f.fake.names();
    assert_eq!(names.iter().filter(|n| **n == "host-info").count(), 3);
    assert_eq!(f.cx.log().snapshot().agent_id, Some(9));
}

#[tokio::test]
async fn unauthorized_poll_registers_again() {
    let f = Fixture::new();
    f.fake.reply("get-job", Response { unauthorized: true, ..Response::default() });
    f.fake.reply("get-job", job_reply(3, "true"));

    f.agent(fast().one_job(true)).run(&f.cx).await;

    assert_eq!(&f.fake.names()[..4], ["host-info", "get-job", "host-info", "get-job"]);
}

#[tokio::test]
async fn failed_poll_is_retried() {
    let f = Fixture::new();
    f.fake.fail("get-job", 500);
    f.fake.reply("get-job", job_reply(4, "true"));

    let jobs = f.agent(fast().one_job(true)).run(&f.cx).await;
    assert_eq!(jobs, 1);
}

#[tokio::test]
async fn server_cfg_is_merged_and_applied() {
    let f = Fixture::new();
    let shipper = ShipperHandle::default();
    f.fake.reply(
        "get-job",
        Response {
            cfg: cfg(json!({
                "clickhouse_addr": "127.0.0.1:9555",
                "minio_addr": "minio:9000",
                "server": "http://dispatch.example:8080",
                "unrelated": "x",
            })),
            ..job_reply(5, "true")
        },
    );

    f.agent(fast().one_job(true)).shipper(shipper.clone()).run(&f.cx).await;

    let settings = f.cx.settings();
    assert_eq!(settings.clickhouse_addr.as_deref(), Some("127.0.0.1:9555"));
    assert_eq!(settings.minio_addr.as_deref(), Some("minio:9000"));
    assert_eq!(shipper.target().as_deref(), Some("127.0.0.1:9555"));
    assert_eq!(f.fake.retargets(), vec!["http://dispatch.example:8080".to_string()]);
}

#[tokio::test]
async fn unchanged_cfg_does_not_retarget() {
    let f = Fixture::new();
    f.cx.update_settings(|s| s.server = Some("http://same:8080".into()));
    f.fake.reply("get-job", Response { cfg: cfg(json!({"server": "http://same:8080"})), ..job_reply(6, "true") });

    f.agent(fast().one_job(true)).run(&f.cx).await;
    assert!(f.fake.retargets().is_empty());
}

#[tokio::test]
async fn shutdown_stops_an_idle_loop() {
    let f = Fixture::new();
    let cx = f.cx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cx.cancel();
    });

    let jobs = tokio::time::timeout(Duration::from_secs(5), f.agent(fast()).run(&f.cx)).await.unwrap();
    assert_eq!(jobs, 0);
    assert!(f.fake.names().iter().filter(|n| **n == "get-job").count() >= 1);
}

#[tokio::test]
async fn shutdown_cancels_the_running_job() {
    let f = Fixture::new();
    f.fake.reply("get-job", job_reply(7, "sleep 30"));
    let cx = f.cx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        cx.cancel();
    });

    let jobs = tokio::time::timeout(Duration::from_secs(10), f.agent(fast()).run(&f.cx)).await.unwrap();

    assert_eq!(jobs, 1);
    let reports = f.fake.terminal_reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].2.reason, Some(FailReason::Cancelled));
}
