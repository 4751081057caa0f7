// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort log shipping over UDP.
//!
//! [`LogShipper`] is a tracing layer that turns every event into a
//! [`LogEntry`] stamped with the current [`LogContext`] and queues it on a
//! bounded channel; a background task serializes entries into datagrams for
//! the log proxy. A full queue or an unset destination drops the entry, so
//! logging never blocks the agent.

use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;

use kk_core::log_entry::MAX_PAYLOAD;
use kk_core::{LogContext, LogEntry, LogLevel, MaskRegistry};
use parking_lot::RwLock;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context as LayerContext;
use tracing_subscriber::Layer;

/// Port of the log proxy when the address has none.
pub const DEFAULT_PORT: u16 = 9001;
/// Entries buffered between the layer and the sender task.
pub const QUEUE_CAPACITY: usize = 1024;

/// Target of the shipper's own events, which are never shipped.
const SELF_TARGET: &str = "kk_agent::log_shipper";

/// `host[:port]` with the default port filled in.
pub fn with_default_port(addr: &str) -> String {
    let addr = addr.trim();
    if addr.parse::<SocketAddr>().is_ok() {
        return addr.to_string();
    }
    match addr.rsplit_once(':') {
        Some((_, port)) if port.parse::<u16>().is_ok() => addr.to_string(),
        _ => {
            let port = crate::env::clickhouse_port().unwrap_or(DEFAULT_PORT);
            format!("{addr}:{port}")
        }
    }
}

/// Switches the destination of a running shipper.
#[derive(Clone, Default)]
pub struct ShipperHandle {
    target: Arc<RwLock<Option<String>>>,
}

impl ShipperHandle {
    /// Ship to `addr` from now on; `None` stops shipping.
    pub fn retarget(&self, addr: Option<&str>) {
        let addr = addr.filter(|a| !a.trim().is_empty()).map(with_default_port);
        tracing::info!(target: SELF_TARGET, addr = ?addr, "log shipping destination");
        *self.target.write() = addr;
    }

    pub fn target(&self) -> Option<String> {
        self.target.read().clone()
    }
}

pub struct LogShipper {
    tx: mpsc::Sender<LogEntry>,
    masks: MaskRegistry,
    log: LogContext,
    service: String,
    host: String,
}

impl LogShipper {
    /// Layer plus handle; the sender task runs on the current runtime.
    pub fn spawn(
        masks: MaskRegistry,
        log: LogContext,
        host: impl Into<String>,
        addr: Option<&str>,
    ) -> (Self, ShipperHandle) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let handle = ShipperHandle::default();
        handle.retarget(addr);
        tokio::spawn(send_loop(rx, handle.clone()));
        let layer = Self { tx, masks, log, service: "agent".to_string(), host: host.into() };
        (layer, handle)
    }

    fn entry(&self, event: &Event<'_>) -> LogEntry {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        visitor.text.push_str(&visitor.fields);
        let message = self.masks.mask(&visitor.text).into_owned();
        let level = LogLevel::from(event.metadata().level());
        LogEntry::new(&self.service, &self.host, level, message, &self.log.snapshot())
    }
}

impl<S: Subscriber> Layer<S> for LogShipper {
    fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
        if event.metadata().target() == SELF_TARGET {
            return;
        }
        // Dropped when the queue is full or the sender is gone.
        let _ = self.tx.try_send(self.entry(event));
    }
}

/// Message first, then `key=value` for the other fields.
#[derive(Default)]
struct MessageVisitor {
    text: String,
    fields: String,
}

impl MessageVisitor {
    fn push_field(&mut self, name: &str, value: &dyn std::fmt::Debug) {
        let _ = write!(self.fields, " {name}={value:?}");
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.text.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={value}", field.name());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.text, "{value:?}");
        } else {
            self.push_field(field.name(), value);
        }
    }
}

async fn send_loop(mut rx: mpsc::Receiver<LogEntry>, handle: ShipperHandle) {
    let socket = match UdpSocket::bind("0.0.0.0:0").await {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(target: SELF_TARGET, error = %e, "cannot open log socket, shipping disabled");
            return;
        }
    };
    let mut resolved: Option<(String, SocketAddr)> = None;

    while let Some(entry) = rx.recv().await {
        let Some(target) = handle.target() else {
            continue;
        };
        let addr = match &resolved {
            Some((name, addr)) if *name == target => *addr,
            _ => match tokio::net::lookup_host(target.as_str()).await.ok().and_then(|mut a| a.next()) {
                Some(addr) => {
                    resolved = Some((target, addr));
                    addr
                }
                None => {
                    tracing::debug!(target: SELF_TARGET, addr = %target, "cannot resolve log proxy");
                    continue;
                }
            },
        };
        let payloads = match entry.to_payloads(MAX_PAYLOAD) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(target: SELF_TARGET, error = %e, "cannot serialize log entry");
                continue;
            }
        };
        for payload in payloads {
            if let Err(e) = socket.send_to(&payload, addr).await {
                tracing::debug!(target: SELF_TARGET, error = %e, "log datagram not sent");
            }
        }
    }
}

#[cfg(test)]
#[path = "shipper_tests.rs"]
mod tests;
