// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent log setup: masked stderr, a daily file under `<data_dir>/logs`,
//! and the UDP shipper.

use std::io;
use std::path::{Path, PathBuf};

use kk_core::Context;
use kk_tools::logging::{env_filter, MaskingMakeWriter};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use crate::error::AgentError;
use crate::shipper::{LogShipper, ShipperHandle};

pub const LOG_FILE_PREFIX: &str = "kkagent.log";

/// Keeps the file writer flushing; drop it last.
pub struct Logging {
    _file: WorkerGuard,
    pub shipper: ShipperHandle,
    pub dir: PathBuf,
}

pub fn log_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

/// Install the global subscriber. Must run inside the tokio runtime.
pub fn init(cx: &Context, host: &str) -> Result<Logging, AgentError> {
    let settings = cx.settings();
    let dir = log_dir(&settings.data_dir);
    std::fs::create_dir_all(&dir).map_err(|source| AgentError::Dir { path: dir.clone(), source })?;

    let (file_writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX));
    let (shipper, handle) =
        LogShipper::spawn(cx.masks().clone(), cx.log().clone(), host, settings.clickhouse_addr.as_deref());

    let stderr_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(MaskingMakeWriter::new(io::stderr, cx.masks().clone()))
        .boxed();
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(MaskingMakeWriter::new(file_writer, cx.masks().clone()))
        .boxed();

    tracing_subscriber::registry()
        .with(env_filter())
        .with(stderr_layer)
        .with(file_layer)
        .with(shipper)
        .try_init()
        .map_err(|e| AgentError::Logging(e.to_string()))?;

    Ok(Logging { _file: guard, shipper: handle, dir })
}
