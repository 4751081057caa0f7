// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use kk_core::Settings;
use object_store::memory::InMemory;
use serde_json::json;

use super::*;

fn cx() -> Context {
    Context::new(Settings::default())
}

fn save_step(paths: serde_json::Value) -> Step {
    Step::new("cache")
        .with("action", "save")
        .with("job_id", 31)
        .with("paths", paths)
        .with("minio_folder", json!({"deps-v1": "7-deps-v1"}))
}

#[tokio::test]
async fn missing_path_fails_and_leaves_store_empty() {
    let store = InMemory::new();
    let base = tempfile::tempdir().unwrap();
    let outcome =
        run_with_store(&cx(), &save_step(json!(["/does/not/exist"])), &store, base.path()).await.unwrap();

    assert_eq!(outcome, Outcome::failed(1, "path '/does/not/exist' does not exist"));
    let listing = store.list_with_delimiter(None).await.unwrap();
    assert!(listing.objects.is_empty());
    assert!(listing.common_prefixes.is_empty());
}

#[tokio::test]
async fn save_then_restore_round_trips_a_tree() {
    let store = InMemory::new();
    let src = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(src.path().join("deps/nested")).unwrap();
    std::fs::write(src.path().join("deps/a.txt"), "alpha").unwrap();
    std::fs::write(src.path().join("deps/nested/b.txt"), "beta").unwrap();

    let saved = run_with_store(&cx(), &save_step(json!(["deps"])), &store, src.path()).await.unwrap();
    assert!(saved.is_ok(), "{saved:?}");

    let dst = tempfile::tempdir().unwrap();
    let restore = Step::new("cache")
        .with("action", "restore")
        .with("minio_folders", json!({"deps-v1": "7-deps-v1", "absent": "7-absent"}));
    let restored = run_with_store(&cx(), &restore, &store, dst.path()).await.unwrap();
    assert!(restored.is_ok());
    assert_eq!(std::fs::read_to_string(dst.path().join("deps/a.txt")).unwrap(), "alpha");
    assert_eq!(std::fs::read_to_string(dst.path().join("deps/nested/b.txt")).unwrap(), "beta");
}

#[tokio::test]
async fn unknown_action_is_a_field_error() {
    let store = InMemory::new();
    let step = Step::new("cache").with("action", "purge");
    let err = run_with_store(&cx(), &step, &store, std::path::Path::new("/")).await.unwrap_err();
    assert!(err.to_string().contains("purge"), "{err}");
}
