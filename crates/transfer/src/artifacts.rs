// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact upload and download against the FTP store.
//!
//! Each flow has its own FTP identity; inside it every run keeps its files
//! under `/<run_id>/`. Artifact records carry the path relative to the run,
//! so the same record is valid whichever run it is later fetched from.

use std::path::{Component, Path, PathBuf};

use kk_core::Artifact;

use crate::error::TransferError;
use crate::ftp::{FtpClient, FtpError};

/// Which FTP account a flow's files live under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Test-result attachments.
    Report,
    Public,
    Private,
}

impl Visibility {
    pub fn from_public(public: bool) -> Self {
        if public {
            Visibility::Public
        } else {
            Visibility::Private
        }
    }

    pub fn login(self, flow_id: u64) -> String {
        let prefix = match self {
            Visibility::Report => "report",
            Visibility::Public => "public",
            Visibility::Private => "private",
        };
        format!("{prefix}_{flow_id}")
    }
}

/// One local file and where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    pub local: PathBuf,
    /// Path relative to the run root, `/`-separated.
    pub record_path: String,
    pub size: u64,
}

/// Expand `sources` under `cwd` into the files to upload.
///
/// An existing directory without wildcards uploads its whole tree. A
/// wildcard pattern that matches nothing only warns; a plain path that does
/// not exist is an error.
pub fn plan_upload(
    cwd: &Path,
    sources: &[String],
    destination: &str,
) -> Result<Vec<UploadItem>, TransferError> {
    let dest = normalize_destination(destination);
    let mut items = Vec::new();

    for source in sources {
        let mut pattern = cwd.join(source);
        if !source.contains('*') && pattern.is_dir() {
            pattern = pattern.join("**");
        }
        let pattern_str = pattern.to_string_lossy().into_owned();

        let before = items.len();
        for path in expand_pattern(&pattern_str)? {
            let rel = path.strip_prefix(cwd).unwrap_or(&path);
            let rel = slash_path(rel);
            let record_path = if dest.is_empty() { rel } else { format!("{dest}/{rel}") };
            let size = std::fs::metadata(&path)?.len();
            items.push(UploadItem { local: path, record_path, size });
        }

        if items.len() == before {
            if pattern_str.contains('*') {
                tracing::warn!(pattern = %pattern_str, "no files found");
            } else {
                return Err(TransferError::NotFoundForUpload(pattern_str));
            }
        }
    }
    Ok(items)
}

/// Remote absolute path of a record inside `run_id`.
pub fn remote_path(run_id: u64, record_path: &str) -> String {
    format!("/{run_id}/{}", record_path.trim_start_matches('/'))
}

/// Store one planned file under `run_id`.
pub async fn upload_item(
    client: &mut FtpClient,
    run_id: u64,
    item: &UploadItem,
) -> Result<Artifact, TransferError> {
    let remote = remote_path(run_id, &item.record_path);
    if let Some((parent, _)) = remote.rsplit_once('/') {
        client.mkdirs(parent).await?;
    }
    tracing::info!(local = %item.local.display(), %remote, "store artifact");
    let mut file = tokio::fs::File::open(&item.local).await?;
    client.stor(&remote, &mut file).await?;
    Ok(Artifact { path: item.record_path.clone(), size: item.size })
}

/// Plan and upload in one go.
pub async fn upload_all(
    client: &mut FtpClient,
    run_id: u64,
    cwd: &Path,
    sources: &[String],
    destination: &str,
) -> Result<Vec<Artifact>, TransferError> {
    let mut out = Vec::new();
    for item in plan_upload(cwd, sources, destination)? {
        out.push(upload_item(client, run_id, &item).await?);
    }
    Ok(out)
}

/// Fetch `sources` from the newest earlier run that has all of them.
///
/// Runs are tried newest first, skipping `run_id` itself; the first run
/// from which every source downloads cleanly wins.
pub async fn download_latest(
    client: &mut FtpClient,
    run_id: u64,
    sources: &[String],
    dest: &Path,
) -> Result<u64, TransferError> {
    tokio::fs::create_dir_all(dest).await?;

    let mut runs: Vec<u64> = client
        .nlst("/")
        .await?
        .iter()
        .filter_map(|name| name.parse().ok())
        .filter(|r| *r != run_id)
        .collect();
    runs.sort_unstable_by(|a, b| b.cmp(a));

    let mut last_error = None;
    for run in runs {
        let mut failed = None;
        for source in sources {
            let remote = remote_path(run, source);
            let local = dest.join(source.trim_start_matches('/'));
            if let Err(e) = download_tree(client, &remote, &local).await {
                failed = Some(format!("problem with downloading {source}: {e}"));
                break;
            }
        }
        match failed {
            None => {
                tracing::info!(run, "artifacts downloaded");
                return Ok(run);
            }
            Some(msg) => {
                tracing::warn!(run, %msg, "trying an older run");
                last_error = Some(msg);
            }
        }
    }
    Err(TransferError::Download(
        last_error.unwrap_or_else(|| "no previous run has artifacts".to_string()),
    ))
}

/// Mirror `remote` into `local`. A path that cannot be entered as a
/// directory is fetched as a file.
pub async fn download_tree(
    client: &mut FtpClient,
    remote: &str,
    local: &Path,
) -> Result<usize, TransferError> {
    let mut stack = vec![(remote.to_string(), local.to_path_buf())];
    let mut files = 0;

    while let Some((remote, local)) = stack.pop() {
        match client.cwd(&remote).await {
            Ok(()) => {
                tokio::fs::create_dir_all(&local).await?;
                for name in client.nlst(&remote).await? {
                    stack.push((format!("{}/{name}", remote.trim_end_matches('/')), local.join(&name)));
                }
            }
            Err(FtpError::Reply { code: 550, .. }) => {
                if let Some(parent) = local.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                let mut file = tokio::fs::File::create(&local).await?;
                client.retr(&remote, &mut file).await?;
                files += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
    client.cwd("/").await?;
    Ok(files)
}

/// Files matched by `pattern`, sorted. A trailing `/**` takes every file
/// below the matched directories.
fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>, TransferError> {
    let mut files: Vec<PathBuf> = match pattern.strip_suffix("/**") {
        Some(base) => glob::glob(base)?
            .filter_map(Result::ok)
            .flat_map(|root| walkdir::WalkDir::new(root).into_iter().filter_map(Result::ok))
            .filter(|e| !e.file_type().is_dir())
            .map(walkdir::DirEntry::into_path)
            .collect(),
        None => glob::glob(pattern)?.filter_map(Result::ok).filter(|p| !p.is_dir()).collect(),
    };
    files.sort();
    files.dedup();
    Ok(files)
}

fn normalize_destination(destination: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in destination.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            p => parts.push(p),
        }
    }
    parts.join("/")
}

fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
#[path = "artifacts_tests.rs"]
mod tests;
