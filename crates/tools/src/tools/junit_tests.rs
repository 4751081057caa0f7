// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use kk_core::Settings;

use super::*;
use crate::MemorySink;

fn parse(xml: &str) -> Vec<TestCaseResult> {
    parse_junit(xml, Path::new("report.xml")).unwrap()
}

fn summary(results: &[TestCaseResult]) -> Vec<(String, u8)> {
    results.iter().map(|r| (r.test.clone(), u8::from(r.status))).collect()
}

#[test]
fn pass_and_failure() {
    let xml = r#"<testsuite><testcase name="t1"/><testcase name="t2"><failure/></testcase></testsuite>"#;
    assert_eq!(summary(&parse(xml)), vec![("::t1".to_string(), 1), ("::t2".to_string(), 2)]);
}

#[test]
fn classname_prefixes_the_test() {
    let xml = r#"<testsuites><testsuite name="s">
        <testcase classname="pkg.Mod" name="works" time="0.1"></testcase>
    </testsuite></testsuites>"#;
    assert_eq!(summary(&parse(xml)), vec![("pkg.Mod::works".to_string(), 1)]);
}

#[yare::parameterized(
    error = { "<error message=\"x\"/>", 3 },
    failure = { "<failure>trace</failure>", 2 },
    skipped = { "<skipped/>", 4 },
    error_beats_failure = { "<failure/><error/>", 3 },
    output_only = { "<system-out>hi</system-out>", 1 },
)]
fn status_from_children(children: &str, status: u8) {
    let xml = format!("<testsuite><testcase classname=\"c\" name=\"n\">{children}</testcase></testsuite>");
    assert_eq!(u8::from(parse(&xml)[0].status), status);
}

#[test]
fn failure_message_is_kept() {
    let xml = r#"<testsuite><testcase name="n"><failure message="expected 1 got 2"/></testcase></testsuite>"#;
    assert_eq!(parse(xml)[0].msg.as_deref(), Some("expected 1 got 2"));
}

#[test]
fn broken_xml_names_the_file() {
    let err = parse_junit("<testsuite><testcase name=\"a\"></testsuite>", Path::new("bad.xml")).unwrap_err();
    assert!(err.to_string().contains("bad.xml"), "{err}");
}

#[tokio::test]
async fn run_tests_reads_every_matching_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("out/nested")).unwrap();
    std::fs::write(dir.path().join("out/a.xml"), r#"<testsuite><testcase classname="a" name="x"/></testsuite>"#)
        .unwrap();
    std::fs::write(
        dir.path().join("out/nested/b.xml"),
        r#"<testsuite><testcase classname="b" name="y"><skipped/></testcase></testsuite>"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not xml").unwrap();

    let step = Step::new("junit_collect").with("cwd", dir.path().to_string_lossy().to_string());
    let sink = MemorySink::new();
    let mut handle = sink.clone();
    let mut out = Collector::new(&mut handle);
    let outcome =
        JunitCollect.run_tests(&Context::new(Settings::default()), &step, &mut out).await.unwrap();
    out.finish().await.unwrap();

    assert!(outcome.is_ok());
    let mut got = summary(&sink.test_results());
    got.sort();
    assert_eq!(got, vec![("a::x".to_string(), 1), ("b::y".to_string(), 4)]);
}
