// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object-store handle built from a step's `minio_*` fields.

use std::sync::Arc;
use std::time::Duration;

use kk_core::step::FieldError;
use kk_core::Step;
use object_store::aws::AmazonS3Builder;
use object_store::{ClientOptions, ObjectStore};

use crate::error::TransferError;

/// Connection details of the S3-compatible store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// `host:port`, or a full URL.
    pub addr: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

impl StoreConfig {
    pub fn from_step(step: &Step) -> Result<Self, FieldError> {
        Ok(Self {
            addr: step.require_str("minio_addr")?.to_string(),
            bucket: step.require_str("minio_bucket")?.to_string(),
            access_key: step.require_str("minio_access_key")?.to_string(),
            secret_key: step.require_str("minio_secret_key")?.to_string(),
        })
    }

    /// Same credentials, different bucket.
    pub fn with_bucket(&self, bucket: impl Into<String>) -> Self {
        Self { bucket: bucket.into(), ..self.clone() }
    }

    pub fn endpoint(&self) -> String {
        if self.addr.starts_with("http://") || self.addr.starts_with("https://") {
            self.addr.clone()
        } else {
            format!("http://{}", self.addr)
        }
    }

    pub fn open(&self) -> Result<Arc<dyn ObjectStore>, TransferError> {
        let options = ClientOptions::new()
            .with_timeout(Duration::from_secs(60))
            .with_connect_timeout(Duration::from_secs(10))
            .with_allow_http(true);
        let store = AmazonS3Builder::new()
            .with_bucket_name(&self.bucket)
            .with_region("us-east-1")
            .with_endpoint(self.endpoint())
            .with_virtual_hosted_style_request(false)
            .with_access_key_id(&self.access_key)
            .with_secret_access_key(&self.secret_key)
            .with_client_options(options)
            .build()?;
        tracing::debug!(endpoint = %self.endpoint(), bucket = %self.bucket, "object store ready");
        Ok(Arc::new(store))
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
