// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::FakeFtpServer;

fn tree(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (path, body) in files {
        let p = dir.path().join(path);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(p, body).unwrap();
    }
    dir
}

#[yare::parameterized(
    report = { Visibility::Report, "report_12" },
    public = { Visibility::Public, "public_12" },
    private = { Visibility::Private, "private_12" },
)]
fn login_identity(visibility: Visibility, login: &str) {
    assert_eq!(visibility.login(12), login);
}

#[test]
fn public_flag_selects_identity() {
    assert_eq!(Visibility::from_public(true), Visibility::Public);
    assert_eq!(Visibility::from_public(false), Visibility::Private);
}

#[test]
fn recursive_glob_yields_relative_records() {
    let dir = tree(&[("a.txt", "aa"), ("d1/b.txt", "bbb")]);
    let items = plan_upload(dir.path(), &["**".to_string()], "dest").unwrap();
    let records: Vec<(&str, u64)> = items.iter().map(|i| (i.record_path.as_str(), i.size)).collect();
    assert_eq!(records, vec![("dest/a.txt", 2), ("dest/d1/b.txt", 3)]);
}

#[yare::parameterized(
    root = { "/", "d1/b.txt" },
    nested = { "out/x/", "out/x/d1/b.txt" },
    dotted = { "./out/../res", "res/d1/b.txt" },
)]
fn destination_is_normalized(dest: &str, record: &str) {
    let dir = tree(&[("d1/b.txt", "b")]);
    let items = plan_upload(dir.path(), &["d1/b.txt".to_string()], dest).unwrap();
    assert_eq!(items[0].record_path, record);
}

#[test]
fn plain_directory_uploads_its_tree() {
    let dir = tree(&[("build/x.bin", "x"), ("build/sub/y.bin", "y"), ("other.txt", "o")]);
    let items = plan_upload(dir.path(), &["build".to_string()], "").unwrap();
    let paths: Vec<&str> = items.iter().map(|i| i.record_path.as_str()).collect();
    assert_eq!(paths, vec!["build/sub/y.bin", "build/x.bin"]);
}

#[test]
fn missing_plain_file_is_an_error() {
    let dir = tree(&[]);
    let err = plan_upload(dir.path(), &["report.html".to_string()], "").unwrap_err();
    assert!(err.to_string().starts_with("file "));
    assert!(err.to_string().ends_with("report.html not found for upload"));
}

#[test]
fn unmatched_wildcard_only_warns() {
    let dir = tree(&[("a.txt", "a")]);
    let items = plan_upload(dir.path(), &["*.log".to_string(), "a.txt".to_string()], "").unwrap();
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn upload_stores_files_under_the_run() {
    let server = FakeFtpServer::start().await.unwrap();
    let dir = tree(&[("a.txt", "aa"), ("d1/b.txt", "bbb")]);
    let login = Visibility::Private.login(5);
    let mut client = FtpClient::connect(&server.addr(), &login).await.unwrap();

    let artifacts = upload_all(&mut client, 9, dir.path(), &["**".to_string()], "dest").await.unwrap();

    assert_eq!(
        artifacts,
        vec![
            Artifact { path: "dest/a.txt".into(), size: 2 },
            Artifact { path: "dest/d1/b.txt".into(), size: 3 },
        ]
    );
    let root = server.user_root(&login);
    assert_eq!(std::fs::read_to_string(root.join("9/dest/d1/b.txt")).unwrap(), "bbb");
}

#[tokio::test]
async fn download_mirrors_the_newest_other_run() {
    let server = FakeFtpServer::start().await.unwrap();
    let src = tree(&[("a.txt", "new"), ("d1/b.txt", "nested")]);
    let old = tree(&[("a.txt", "old")]);
    let mut client = FtpClient::connect(&server.addr(), "private_1").await.unwrap();
    upload_all(&mut client, 3, old.path(), &["a.txt".to_string()], "out").await.unwrap();
    upload_all(&mut client, 4, src.path(), &["**".to_string()], "out").await.unwrap();
    // The current run must never be used as a source.
    upload_all(&mut client, 5, old.path(), &["a.txt".to_string()], "out").await.unwrap();

    let dest = tempfile::tempdir().unwrap();
    let run = download_latest(&mut client, 5, &["out".to_string()], dest.path()).await.unwrap();

    assert_eq!(run, 4);
    assert_eq!(std::fs::read_to_string(dest.path().join("out/a.txt")).unwrap(), "new");
    assert_eq!(std::fs::read_to_string(dest.path().join("out/d1/b.txt")).unwrap(), "nested");
}

#[tokio::test]
async fn download_falls_back_to_an_older_run() {
    let server = FakeFtpServer::start().await.unwrap();
    let with_report = tree(&[("report.txt", "r")]);
    let without = tree(&[("other.txt", "o")]);
    let mut client = FtpClient::connect(&server.addr(), "private_1").await.unwrap();
    upload_all(&mut client, 1, with_report.path(), &["report.txt".to_string()], "").await.unwrap();
    upload_all(&mut client, 2, without.path(), &["other.txt".to_string()], "").await.unwrap();

    let dest = tempfile::tempdir().unwrap();
    let run = download_latest(&mut client, 3, &["report.txt".to_string()], dest.path()).await.unwrap();
    assert_eq!(run, 1);
    assert_eq!(std::fs::read_to_string(dest.path().join("report.txt")).unwrap(), "r");
}

#[tokio::test]
async fn download_without_previous_runs_fails() {
    let server = FakeFtpServer::start().await.unwrap();
    let mut client = FtpClient::connect(&server.addr(), "private_1").await.unwrap();
    let dest = tempfile::tempdir().unwrap();
    let err = download_latest(&mut client, 1, &["x".to_string()], dest.path()).await.unwrap_err();
    assert!(matches!(err, TransferError::Download(_)));
}
