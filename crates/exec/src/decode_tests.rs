// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn utf8_passes_through() {
    let mut d = OutputDecoder::new();
    assert_eq!(d.decode("héllo\n".as_bytes()), "héllo\n");
    assert_eq!(d.encoding(), Some("UTF-8"));
}

#[test]
fn split_multibyte_sequence_is_rejoined() {
    let bytes = "żółw".as_bytes();
    let mut d = OutputDecoder::new();
    let mut out = d.decode(&bytes[..1]);
    out.push_str(&d.decode(&bytes[1..]));
    out.push_str(&d.finish());
    assert_eq!(out, "żółw");
}

#[test]
fn latin1_bytes_do_not_fail() {
    // "café" in windows-1252
    let mut d = OutputDecoder::new();
    let out = d.decode(b"caf\xe9 au lait\n");
    assert!(out.starts_with("caf"));
    assert!(out.ends_with("au lait\n"));
    assert_ne!(d.encoding(), Some("UTF-8"));
}

#[test]
fn finish_without_input_is_empty() {
    assert_eq!(OutputDecoder::new().finish(), "");
}

#[yare::parameterized(
    whole_lines = { &["a\nb\n"], &["a\n", "b\n"], None },
    split_line = { &["ab", "c\nd"], &["abc\n"], Some("d") },
    only_partial = { &["abc"], &[], Some("abc") },
    empty_lines = { &["\n\n"], &["\n", "\n"], None },
)]
fn line_buffer(chunks: &[&str], lines: &[&str], rest: Option<&str>) {
    let mut buf = LineBuffer::new();
    let got: Vec<String> = chunks.iter().flat_map(|c| buf.push(c)).collect();
    assert_eq!(got, lines);
    assert_eq!(buf.finish().as_deref(), rest);
}
