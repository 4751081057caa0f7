// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log writers that never let a registered secret through.

use std::io::{self, Write};

use kk_core::MaskRegistry;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// `MakeWriter` wrapper masking every formatted event.
#[derive(Clone)]
pub struct MaskingMakeWriter<M> {
    inner: M,
    masks: MaskRegistry,
}

impl<M> MaskingMakeWriter<M> {
    pub fn new(inner: M, masks: MaskRegistry) -> Self {
        Self { inner, masks }
    }
}

impl<'a, M: MakeWriter<'a>> MakeWriter<'a> for MaskingMakeWriter<M> {
    type Writer = MaskingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        MaskingWriter { inner: self.inner.make_writer(), masks: self.masks.clone() }
    }
}

pub struct MaskingWriter<W> {
    inner: W,
    masks: MaskRegistry,
}

impl<W: Write> Write for MaskingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        self.inner.write_all(self.masks.mask(&text).as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Filter from `RUST_LOG`, `info` when unset or invalid.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Harness logging: masked plain text on stderr.
///
/// Stdout is left to progress lines, and the agent captures stderr into its
/// own log.
pub fn init_stderr(masks: MaskRegistry) {
    let layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(MaskingMakeWriter::new(io::stderr, masks));
    // A subscriber may already be installed when tools run in-process.
    let _ = tracing_subscriber::registry().with(env_filter()).with(layer).try_init();
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
