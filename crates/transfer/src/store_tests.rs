// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn minio_step() -> Step {
    Step::new("cache")
        .with("minio_addr", "minio:9000")
        .with("minio_bucket", "cache-1")
        .with("minio_access_key", "ak")
        .with("minio_secret_key", "sk")
}

#[test]
fn config_from_step_fields() {
    let cfg = StoreConfig::from_step(&minio_step()).unwrap();
    assert_eq!(cfg.bucket, "cache-1");
    assert_eq!(cfg.endpoint(), "http://minio:9000");
}

#[test]
fn explicit_scheme_is_kept() {
    let cfg = StoreConfig::from_step(&minio_step().with("minio_addr", "https://s3.local")).unwrap();
    assert_eq!(cfg.endpoint(), "https://s3.local");
}

#[test]
fn missing_field_is_reported() {
    let mut step = minio_step();
    step.fields.remove("minio_secret_key");
    assert_eq!(
        StoreConfig::from_step(&step).unwrap_err(),
        FieldError::Missing("minio_secret_key".into())
    );
}

#[test]
fn with_bucket_keeps_credentials() {
    let cfg = StoreConfig::from_step(&minio_step()).unwrap().with_bucket("tools");
    assert_eq!(cfg.bucket, "tools");
    assert_eq!(cfg.access_key, "ak");
}

#[tokio::test]
async fn open_builds_a_store() {
    let cfg = StoreConfig::from_step(&minio_step()).unwrap();
    assert!(cfg.open().is_ok());
}
