// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build-cache entry layout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const META_NAME: &str = "meta.json";

/// Contents of `meta.json`: tar blob name to the path it was taken from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheMeta(pub BTreeMap<String, String>);

impl CacheMeta {
    pub fn insert(&mut self, original_path: &str) -> String {
        let name = tar_name(original_path);
        self.0.insert(name.clone(), original_path.to_string());
        name
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Blob name for a cached path: `/a/b/` becomes `a_b.tar.gz`.
pub fn tar_name(path: &str) -> String {
    format!("{}.tar.gz", path.trim_matches('/').replace('/', "_"))
}

/// `{folder}/{job_id}` prefix a save writes to.
pub fn entry_prefix(folder: &str, job_id: u64) -> String {
    format!("{}/{}", folder.trim_matches('/'), job_id)
}

/// Parse the run id out of a listed prefix like `folder/123`.
pub fn run_id_of(prefix: &str) -> Option<u64> {
    prefix.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
