// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streaming tar.gz producer.
//!
//! A blocking task walks the tree and writes a gzipped tar into a bounded
//! channel of byte blocks; [`Pumper::read`] hands those blocks out in
//! caller-sized pieces. Peak memory is the channel capacity times the block
//! size, whatever the size of the tree.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use flate2::write::GzEncoder;
use flate2::Compression;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::TransferError;

/// Size of one block pushed through the channel.
pub const BLOCK_SIZE: usize = 64 * 1024;
/// Blocks buffered between the walker and the reader.
pub const DEFAULT_CAPACITY: usize = 32;

const PROGRESS_EVERY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackStats {
    pub files: u64,
    pub dirs: u64,
}

pub struct Pumper {
    rx: mpsc::Receiver<Bytes>,
    pending: BytesMut,
    producer: Option<JoinHandle<std::io::Result<PackStats>>>,
    stats: Option<PackStats>,
}

impl Pumper {
    /// Start packing `path`, resolved against `base` when relative.
    ///
    /// Archive member names are `path`-relative for relative paths and the
    /// absolute path without its leading `/` otherwise, so extracting into
    /// `base` (or `/`) recreates the original location.
    pub fn spawn(base: &Path, path: &Path) -> Self {
        Self::spawn_with_capacity(base, path, DEFAULT_CAPACITY)
    }

    pub fn spawn_with_capacity(base: &Path, path: &Path, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let root = base.join(path);
        let strip = if path.is_absolute() { PathBuf::from("/") } else { base.to_path_buf() };
        let producer = tokio::task::spawn_blocking(move || pack(&root, &strip, tx));
        Self { rx, pending: BytesMut::new(), producer: Some(producer), stats: None }
    }

    /// Up to `n` bytes of the archive; empty once it is fully drained.
    pub async fn read(&mut self, n: usize) -> Result<Bytes, TransferError> {
        while self.pending.len() < n && self.stats.is_none() {
            match self.rx.recv().await {
                Some(block) => self.pending.extend_from_slice(&block),
                None => self.stats = Some(self.join().await?),
            }
        }
        let take = n.min(self.pending.len());
        Ok(self.pending.split_to(take).freeze())
    }

    /// What was packed; known once `read` has returned the last bytes.
    pub fn stats(&self) -> Option<PackStats> {
        self.stats
    }

    async fn join(&mut self) -> Result<PackStats, TransferError> {
        let Some(handle) = self.producer.take() else {
            return Ok(PackStats::default());
        };
        let stats = handle.await.map_err(|e| TransferError::Archive(e.to_string()))??;
        tracing::info!(files = stats.files, dirs = stats.dirs, "no more files, archive closed");
        Ok(stats)
    }
}

/// Blocking `Write` that emits fixed-size blocks into the channel.
struct ChannelWriter {
    tx: mpsc::Sender<Bytes>,
    buf: Vec<u8>,
}

impl ChannelWriter {
    fn send_buf(&mut self) -> std::io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let block = Bytes::from(std::mem::replace(&mut self.buf, Vec::with_capacity(BLOCK_SIZE)));
        self.tx
            .blocking_send(block)
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::BrokenPipe, "archive reader gone"))
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        let room = BLOCK_SIZE - self.buf.len();
        let n = data.len().min(room);
        self.buf.extend_from_slice(&data[..n]);
        if self.buf.len() >= BLOCK_SIZE {
            self.send_buf()?;
        }
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.send_buf()
    }
}

fn pack(root: &Path, strip: &Path, tx: mpsc::Sender<Bytes>) -> std::io::Result<PackStats> {
    let writer = ChannelWriter { tx, buf: Vec::with_capacity(BLOCK_SIZE) };
    let mut tar = tar::Builder::new(GzEncoder::new(writer, Compression::default()));
    tar.follow_symlinks(false);

    let mut stats = PackStats::default();
    let mut last_report = Instant::now();

    for entry in walkdir::WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::other)?;
        let path = entry.path();
        let name = path.strip_prefix(strip).unwrap_or(path);
        if name.as_os_str().is_empty() {
            continue;
        }
        if entry.file_type().is_dir() {
            tar.append_dir(name, path)?;
            stats.dirs += 1;
        } else {
            tar.append_path_with_name(path, name)?;
            stats.files += 1;
        }

        if last_report.elapsed() > PROGRESS_EVERY {
            last_report = Instant::now();
            tracing::info!(files = stats.files, "added files");
        }
    }

    let mut writer = tar.into_inner()?.finish()?;
    writer.flush()?;
    Ok(stats)
}

#[cfg(test)]
#[path = "pumper_tests.rs"]
mod tests;
