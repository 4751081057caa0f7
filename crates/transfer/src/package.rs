// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool package fetch and install.
//!
//! A package is a zip in the object store. It is unpacked into
//! `<root>/<bucket>/<path>/`, and its `requirements.txt` (if any) is
//! installed into a sibling `vendor/` directory. A marker file records a
//! finished install so later steps reuse the directory; `latest` packages
//! are always refetched. A per-package lock file serialises agents on the
//! same host.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use kk_core::ObjectUri;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;

use crate::error::TransferError;

const MARKER: &str = ".kk-installed";
const REQUIREMENTS: &str = "requirements.txt";
pub const VENDOR_DIR: &str = "vendor";

const LOCK_POLL: Duration = Duration::from_millis(200);
const LOCK_WAIT: Duration = Duration::from_secs(300);

/// Default command run in the tool directory to install requirements.
pub const DEFAULT_INSTALL_CMD: &str = "python3 -m pip install -r requirements.txt --target=./vendor";

/// Where packages are unpacked and how their requirements get installed.
#[derive(Debug, Clone)]
pub struct PackageCache {
    root: PathBuf,
    install_cmd: String,
    install_timeout: Duration,
}

impl PackageCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            install_cmd: DEFAULT_INSTALL_CMD.to_string(),
            install_timeout: Duration::from_secs(600),
        }
    }

    kk_core::setters! {
        into {
            install_cmd: String,
        }
        set {
            install_timeout: Duration,
        }
    }

    pub fn tool_dir(&self, uri: &ObjectUri) -> PathBuf {
        self.root.join(&uri.bucket).join(&uri.path)
    }

    /// Make sure the package at `uri` is unpacked and installed; returns the
    /// tool directory.
    pub async fn fetch(&self, store: &dyn ObjectStore, uri: &ObjectUri) -> Result<PathBuf, TransferError> {
        let dir = self.tool_dir(uri);
        let latest = uri.version() == "latest";
        if !latest && dir.join(MARKER).exists() {
            tracing::debug!(%uri, dir = %dir.display(), "tool package cached");
            return Ok(dir);
        }

        if let Some(parent) = dir.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut lock_path = dir.clone().into_os_string();
        lock_path.push(".lock");
        let lock_path = PathBuf::from(lock_path);
        let lock = acquire_lock(&lock_path).await?;

        // Another agent may have finished while we waited.
        if !latest && dir.join(MARKER).exists() {
            drop(lock);
            return Ok(dir);
        }

        // Closing the lock file releases the lock.
        let result = self.install(store, uri, &dir).await;
        drop(lock);
        result.map(|()| dir)
    }

    async fn install(&self, store: &dyn ObjectStore, uri: &ObjectUri, dir: &Path) -> Result<(), TransferError> {
        tracing::info!(%uri, dir = %dir.display(), "fetching tool package");
        if tokio::fs::try_exists(dir).await? {
            tokio::fs::remove_dir_all(dir).await?;
        }
        tokio::fs::create_dir_all(dir).await?;

        let body = store.get(&ObjectPath::from(uri.path.as_str())).await?.bytes().await?;
        let mut zip_file = tempfile::Builder::new().prefix("kk-pkg-").suffix(".zip").tempfile()?;
        zip_file.write_all(&body)?;
        zip_file.flush()?;

        let target = dir.to_path_buf();
        let zip_path = zip_file.path().to_path_buf();
        tokio::task::spawn_blocking(move || -> Result<usize, TransferError> {
            let mut archive = zip::ZipArchive::new(std::fs::File::open(zip_path)?)?;
            let count = archive.len();
            archive.extract(&target)?;
            Ok(count)
        })
        .await
        .map_err(|e| TransferError::Archive(e.to_string()))??;
        drop(zip_file);

        if dir.join(REQUIREMENTS).exists() {
            self.install_requirements(dir).await?;
        }

        tokio::fs::write(dir.join(MARKER), uri.to_string()).await?;
        tracing::info!(%uri, "tool package installed");
        Ok(())
    }

    async fn install_requirements(&self, dir: &Path) -> Result<(), TransferError> {
        let vendor = dir.join(VENDOR_DIR);
        if tokio::fs::try_exists(&vendor).await? {
            tokio::fs::remove_dir_all(&vendor).await?;
        }
        tokio::fs::create_dir_all(&vendor).await?;

        let opts = kk_exec::ExecOptions::default()
            .cwd(dir)
            .timeout(self.install_timeout)
            .raise_on_error(true);
        kk_exec::run(&self.install_cmd, &opts).await?;
        Ok(())
    }
}

/// Directories to prepend to the tool's module search path.
pub fn search_path(tool_dir: &Path) -> Vec<PathBuf> {
    vec![tool_dir.to_path_buf(), tool_dir.join(VENDOR_DIR)]
}

async fn acquire_lock(path: &Path) -> Result<std::fs::File, TransferError> {
    let file = OpenOptions::new().write(true).create(true).truncate(false).open(path)?;
    let started = Instant::now();
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(file),
            Err(_) if started.elapsed() < LOCK_WAIT => tokio::time::sleep(LOCK_POLL).await,
            Err(_) => return Err(TransferError::Lock(path.display().to_string())),
        }
    }
}

#[cfg(test)]
#[path = "package_tests.rs"]
mod tests;
