// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parses_bucket_and_path() {
    let uri: ObjectUri = "minio://tools/1.2.0/pylint.zip".parse().unwrap();
    assert_eq!(uri.bucket, "tools");
    assert_eq!(uri.path, "1.2.0/pylint.zip");
    assert_eq!(uri.version(), "1.2.0");
    assert_eq!(uri.to_string(), "minio://tools/1.2.0/pylint.zip");
}

#[yare::parameterized(
    wrong_scheme = { "s3://tools/x.zip" },
    no_path = { "minio://tools" },
    empty_path = { "minio://tools/" },
    empty_bucket = { "minio:///x.zip" },
)]
fn rejects(uri: &str) {
    assert!(uri.parse::<ObjectUri>().is_err());
}

#[test]
fn package_deserializes_location_string() {
    let pkg: ToolPackage = serde_json::from_value(serde_json::json!({
        "name": "pylint",
        "version": "latest",
        "entry": "main",
        "location": "minio://tools/latest/pylint.zip",
    }))
    .unwrap();
    assert!(pkg.is_latest());
    assert!(pkg.requirements.is_empty());
    assert_eq!(pkg.location.bucket, "tools");
}
