// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool packages and object-store locations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A versioned tool published to the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPackage {
    pub name: String,
    pub version: String,
    /// Executable, relative to the unpacked tool directory.
    pub entry: String,
    pub location: ObjectUri,
    #[serde(default)]
    pub requirements: Vec<String>,
}

impl ToolPackage {
    /// `latest` is overwritten in place, so it never counts as installed.
    pub fn is_latest(&self) -> bool {
        self.version == "latest"
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UriError {
    #[error("unsupported object uri '{0}': expected minio://<bucket>/<path>")]
    Scheme(String),
    #[error("object uri '{0}' has no object path")]
    NoPath(String),
}

/// `minio://<bucket>/<path>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectUri {
    pub bucket: String,
    pub path: String,
}

impl ObjectUri {
    /// First path segment; packages are stored as `<version>/<name>.zip`.
    pub fn version(&self) -> &str {
        self.path.split('/').next().unwrap_or_default()
    }
}

impl FromStr for ObjectUri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix("minio://").ok_or_else(|| UriError::Scheme(s.to_string()))?;
        let (bucket, path) = rest.split_once('/').ok_or_else(|| UriError::NoPath(s.to_string()))?;
        let path = path.trim_matches('/');
        if bucket.is_empty() || path.is_empty() {
            return Err(UriError::NoPath(s.to_string()));
        }
        Ok(Self { bucket: bucket.to_string(), path: path.to_string() })
    }
}

impl TryFrom<String> for ObjectUri {
    type Error = UriError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ObjectUri> for String {
    fn from(u: ObjectUri) -> String {
        u.to_string()
    }
}

impl fmt::Display for ObjectUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "minio://{}/{}", self.bucket, self.path)
    }
}

#[cfg(test)]
#[path = "package_tests.rs"]
mod tests;
