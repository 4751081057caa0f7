// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use kk_core::Settings;

use super::*;

#[yare::parameterized(
    ssh = { "git@github.com:acme/widgets.git", "https://tok@github.com/acme/widgets.git" },
    https = { "https://github.com/acme/widgets.git", "https://tok@github.com/acme/widgets.git" },
    bare = { "github.com/acme/widgets", "https://tok@github.com/acme/widgets" },
)]
fn token_urls(url: &str, expected: &str) {
    assert_eq!(token_url(url, "tok"), expected);
}

#[yare::parameterized(
    dot_git = { "https://github.com/acme/widgets.git", "widgets" },
    trailing_slash = { "https://github.com/acme/widgets/", "widgets" },
    local = { "/srv/repos/tool", "tool" },
)]
fn repo_dirs(url: &str, expected: &str) {
    assert_eq!(repo_dir(url), expected);
}

#[test]
fn trigger_applies_only_to_its_repository() {
    let trigger = serde_json::json!({"repo": "https://github.com/acme/widgets", "after": "abc123"});
    let step = Step::new("git")
        .with("http_url", "https://github.com/acme/widgets")
        .with("trigger_data", trigger.clone());
    assert_eq!(triggered_commit(&step).as_deref(), Some("abc123"));

    let other = Step::new("git").with("http_url", "https://github.com/acme/other").with("trigger_data", trigger);
    assert_eq!(triggered_commit(&other), None);
}

#[tokio::test]
async fn access_token_is_masked() {
    let cx = Context::new(Settings::default());
    let dir = tempfile::tempdir().unwrap();
    let step = Step::new("git")
        .with("checkout", "git@nonexistent.invalid:acme/repo.git")
        .with("access-token", "s3cr3t-token")
        .with("cwd", dir.path().to_string_lossy().to_string());
    let outcome = Git.run(&cx, &step).await.unwrap();
    assert!(!outcome.is_ok());
    assert_eq!(outcome.msg, "git clone exited with non-zero retcode");
    assert_eq!(cx.masks().mask("url has s3cr3t-token in it"), "url has ****** in it");
}

#[tokio::test]
async fn clones_a_local_repository() {
    let src = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let init = format!(
        "git init -q {0} && cd {0} && echo hi > README && git add README && \
         git -c user.email=ci@example.com -c user.name=ci commit -q -m init",
        src.path().display()
    );
    let made = kk_exec::run(&init, &kk_exec::ExecOptions::default()).await.unwrap();
    assert_eq!(made.retcode, 0, "{}", made.output);

    let step = Step::new("git")
        .with("checkout", src.path().to_string_lossy().to_string())
        .with("destination", "copy")
        .with("cwd", work.path().to_string_lossy().to_string());
    let outcome = Git.run(&Context::new(Settings::default()), &step).await.unwrap();
    assert!(outcome.is_ok(), "{outcome:?}");
    assert_eq!(std::fs::read_to_string(work.path().join("copy/README")).unwrap(), "hi\n");
}
