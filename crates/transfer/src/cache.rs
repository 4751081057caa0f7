// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cache save and restore against the object store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use futures_util::TryStreamExt;
use kk_core::cache::{entry_prefix, run_id_of, CacheMeta, META_NAME};
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload, WriteMultipart};
use tokio_util::io::{StreamReader, SyncIoBridge};

use crate::error::TransferError;
use crate::pumper::Pumper;

/// Multipart part size.
pub const PART_SIZE: usize = 5 * 1024 * 1024;
const MAX_PARTS_IN_FLIGHT: usize = 2;

/// Archive every path in `paths` under `{folder}/{job_id}/`, then write the
/// `meta.json` index last.
///
/// Paths are checked before anything is written, so a missing path leaves
/// the store untouched.
pub async fn save(
    store: &dyn ObjectStore,
    base: &Path,
    folder: &str,
    job_id: u64,
    paths: &[String],
) -> Result<CacheMeta, TransferError> {
    for p in paths {
        if !base.join(p).exists() {
            tracing::error!(path = %p, "cache path does not exist");
            return Err(TransferError::MissingPath(p.clone()));
        }
    }

    let prefix = entry_prefix(folder, job_id);
    let mut meta = CacheMeta::default();
    for p in paths {
        let tar_name = meta.insert(p);
        let object = ObjectPath::from(format!("{prefix}/{tar_name}"));
        tracing::info!(path = %p, %object, "saving to cache");
        upload_archive(store, &object, Pumper::spawn(base, Path::new(p))).await?;
    }

    let object = ObjectPath::from(format!("{prefix}/{META_NAME}"));
    let body = serde_json::to_vec(&meta)?;
    store.put(&object, PutPayload::from(body)).await?;
    tracing::info!(%object, "saved cache meta");
    Ok(meta)
}

async fn upload_archive(
    store: &dyn ObjectStore,
    object: &ObjectPath,
    mut pumper: Pumper,
) -> Result<(), TransferError> {
    let upload = store.put_multipart(object).await?;
    let mut writer = WriteMultipart::new_with_chunk_size(upload, PART_SIZE);
    loop {
        let chunk = match pumper.read(PART_SIZE).await {
            Ok(c) => c,
            Err(e) => {
                let _ = writer.abort().await;
                return Err(e);
            }
        };
        if chunk.is_empty() {
            break;
        }
        writer.wait_for_capacity(MAX_PARTS_IN_FLIGHT).await?;
        writer.put(chunk);
    }
    writer.finish().await?;
    if let Some(stats) = pumper.stats() {
        tracing::info!(%object, files = stats.files, "archive uploaded");
    }
    Ok(())
}

/// Newest stored run for `folder`, if any.
pub async fn latest_run(store: &dyn ObjectStore, folder: &str) -> Result<Option<u64>, TransferError> {
    let prefix = ObjectPath::from(folder.trim_matches('/'));
    let listing = store.list_with_delimiter(Some(&prefix)).await?;
    Ok(listing.common_prefixes.iter().filter_map(|p| run_id_of(p.as_ref())).max())
}

/// Restore every `cache_key → folder` entry into `base` (or `/` for
/// absolute originals).
///
/// A key without stored runs is skipped. An entry that fails to extract is
/// removed from disk and the next entry is tried; only store and metadata
/// failures abort the restore.
pub async fn restore(
    store: &dyn ObjectStore,
    base: &Path,
    folders: &BTreeMap<String, String>,
) -> Result<usize, TransferError> {
    let mut restored = 0;
    for (key, folder) in folders {
        tracing::info!(cache_key = %key, %folder, "cache restore");
        let Some(run_id) = latest_run(store, folder).await? else {
            tracing::info!(cache_key = %key, "no cache");
            continue;
        };
        let prefix = entry_prefix(folder, run_id);
        let raw = store.get(&ObjectPath::from(format!("{prefix}/{META_NAME}"))).await?.bytes().await?;
        let meta: CacheMeta = serde_json::from_slice(&raw)?;

        for (tar_name, original) in meta.entries() {
            let object = ObjectPath::from(format!("{prefix}/{tar_name}"));
            let dest = if original.starts_with('/') { PathBuf::from("/") } else { base.to_path_buf() };
            tracing::info!(%object, %original, dest = %dest.display(), "restoring");
            match extract(store, &object, &dest).await {
                Ok(()) => restored += 1,
                Err(e) => {
                    tracing::error!(%object, error = %e, "problem with cache extraction");
                    remove_partial(&base.join(original)).await;
                }
            }
        }
    }
    Ok(restored)
}

async fn extract(store: &dyn ObjectStore, object: &ObjectPath, dest: &Path) -> Result<(), TransferError> {
    let stream = store
        .get(object)
        .await?
        .into_stream()
        .map_err(std::io::Error::other);
    let reader = SyncIoBridge::new(StreamReader::new(stream));
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(reader));
        archive.set_preserve_permissions(true);
        archive.set_overwrite(true);
        archive.unpack(&dest)
    })
    .await
    .map_err(|e| TransferError::Archive(e.to_string()))??;
    Ok(())
}

async fn remove_partial(path: &Path) {
    let result = match tokio::fs::symlink_metadata(path).await {
        Ok(m) if m.is_dir() => tokio::fs::remove_dir_all(path).await,
        Ok(_) => tokio::fs::remove_file(path).await,
        Err(_) => return,
    };
    if let Err(e) = result {
        tracing::warn!(path = %path.display(), error = %e, "cannot remove partial restore");
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
