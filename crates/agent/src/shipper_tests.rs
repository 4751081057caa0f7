// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use serial_test::serial;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use yare::parameterized;

async fn receiver() -> (UdpSocket, String) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap().to_string();
    (socket, addr)
}

async fn recv_entry(socket: &UdpSocket) -> Option<LogEntry> {
    let mut buf = vec![0u8; 64 * 1024];
    let n = tokio::time::timeout(Duration::from_secs(2), socket.recv(&mut buf)).await.ok()?.ok()?;
    Some(serde_json::from_slice(&buf[..n]).unwrap())
}

async fn nothing_received(socket: &UdpSocket) -> bool {
    let mut buf = vec![0u8; 1024];
    tokio::time::timeout(Duration::from_millis(300), socket.recv(&mut buf)).await.is_err()
}

#[parameterized(
    host_port = { "logs.example:7000" },
    ipv4_port = { "10.0.0.1:514" },
    ipv6 = { "[::1]:9002" },
)]
fn explicit_port_is_kept(addr: &str) {
    assert_eq!(with_default_port(addr), addr);
}

#[test]
#[serial]
fn default_port_is_filled_in() {
    std::env::remove_var("KRAKEN_CLICKHOUSE_PORT");
    assert_eq!(with_default_port("logs.example"), "logs.example:9001");
    assert_eq!(with_default_port(" 10.0.0.1 "), "10.0.0.1:9001");

    std::env::set_var("KRAKEN_CLICKHOUSE_PORT", "9100");
    let addr = with_default_port("logs.example");
    std::env::remove_var("KRAKEN_CLICKHOUSE_PORT");
    assert_eq!(addr, "logs.example:9100");
}

#[tokio::test]
async fn events_arrive_with_context_and_masks() {
    let (socket, addr) = receiver().await;
    let masks = MaskRegistry::new();
    masks.add("hunter2");
    let log = LogContext::default();
    log.set_agent(Some(4));
    log.set_job(Some(77));
    log.set_step(Some(2), Some("shell".into()));

    let (layer, _handle) = LogShipper::spawn(masks, log, "worker-1", Some(addr.as_str()));
    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, || {
        tracing::warn!(attempt = 3, "password is hunter2");
    });

    let entry = recv_entry(&socket).await.unwrap();
    assert_eq!(entry.message, "password is ****** attempt=3");
    assert_eq!(entry.level, LogLevel::Warn);
    assert_eq!(entry.service, "agent");
    assert_eq!(entry.host, "worker-1");
    assert_eq!(entry.agent_id, Some(4));
    assert_eq!(entry.job_id, Some(77));
    assert_eq!(entry.step_index, Some(2));
    assert_eq!(entry.tool.as_deref(), Some("shell"));
}

#[tokio::test]
async fn own_events_are_not_shipped() {
    let (socket, addr) = receiver().await;
    let (layer, _handle) = LogShipper::spawn(MaskRegistry::new(), LogContext::default(), "h", Some(addr.as_str()));
    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(target: SELF_TARGET, "internal");
    });
    assert!(nothing_received(&socket).await);
}

#[tokio::test]
async fn module_events_sharing_the_prefix_are_shipped() {
    let (socket, addr) = receiver().await;
    let (layer, _handle) = LogShipper::spawn(MaskRegistry::new(), LogContext::default(), "h", Some(addr.as_str()));
    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(target: "kk_agent::log_shipper::queue", "nested");
        tracing::info!(target: "kk_agent::shipper", "module");
    });

    assert_eq!(recv_entry(&socket).await.unwrap().message, "nested");
    assert_eq!(recv_entry(&socket).await.unwrap().message, "module");
}

#[tokio::test]
async fn retarget_starts_and_stops_shipping() {
    let (socket, addr) = receiver().await;
    let (layer, handle) = LogShipper::spawn(MaskRegistry::new(), LogContext::default(), "h", None);
    assert_eq!(handle.target(), None);
    let subscriber = tracing_subscriber::registry().with(layer);
    let _guard = tracing::subscriber::set_default(subscriber);

    tracing::info!("before");
    assert!(nothing_received(&socket).await);

    handle.retarget(Some(addr.as_str()));
    tracing::info!("after");
    assert_eq!(recv_entry(&socket).await.unwrap().message, "after");

    handle.retarget(Some(""));
    assert_eq!(handle.target(), None);
    tracing::info!("stopped");
    assert!(nothing_received(&socket).await);
}

#[tokio::test]
async fn oversized_message_is_split() {
    let (socket, addr) = receiver().await;
    let (layer, _handle) = LogShipper::spawn(MaskRegistry::new(), LogContext::default(), "h", Some(addr.as_str()));
    let line = "x".repeat(1000);
    let big = vec![line.as_str(); 100].join("\n");
    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, || {
        tracing::info!("{big}");
    });

    let mut total = 0;
    let mut parts = 0;
    while let Some(entry) = recv_entry(&socket).await {
        total += entry.message.len();
        parts += 1;
        if total >= big.len() {
            break;
        }
    }
    assert!(parts > 1);
    assert_eq!(total, big.len());
}

proptest! {
    #[test]
    fn default_port_is_idempotent(host in "[a-z][a-z0-9.-]{0,20}", port in proptest::option::of(1u16..)) {
        let addr = match port {
            Some(p) => format!("{host}:{p}"),
            None => host,
        };
        let once = with_default_port(&addr);
        prop_assert_eq!(with_default_port(&once), once.clone());
        prop_assert!(once.rsplit_once(':').is_some_and(|(_, p)| p.parse::<u16>().is_ok()));
    }
}
