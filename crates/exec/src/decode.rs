// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Byte-to-text decoding and line assembly for child output.

use encoding_rs::{Decoder, Encoding, UTF_8};

/// Streaming decoder that picks its encoding from the first bytes it sees.
///
/// Valid UTF-8 (ignoring a split trailing sequence) is taken as UTF-8;
/// anything else is handed to the detector. Undecodable bytes become U+FFFD.
#[derive(Default)]
pub struct OutputDecoder {
    decoder: Option<Decoder>,
}

impl OutputDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the chosen encoding, once known.
    pub fn encoding(&self) -> Option<&'static str> {
        self.decoder.as_ref().map(|d| d.encoding().name())
    }

    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.decode_inner(bytes, false)
    }

    /// Flush any bytes held back at a sequence boundary.
    pub fn finish(&mut self) -> String {
        self.decode_inner(&[], true)
    }

    fn decode_inner(&mut self, bytes: &[u8], last: bool) -> String {
        if self.decoder.is_none() {
            if bytes.is_empty() {
                return String::new();
            }
            self.decoder = Some(detect(bytes).new_decoder());
        }
        let Some(decoder) = self.decoder.as_mut() else {
            return String::new();
        };
        let cap = decoder.max_utf8_buffer_length(bytes.len()).unwrap_or(bytes.len() * 3 + 16);
        let mut out = String::with_capacity(cap);
        let _ = decoder.decode_to_string(bytes, &mut out, last);
        out
    }
}

fn detect(bytes: &[u8]) -> &'static Encoding {
    match std::str::from_utf8(bytes) {
        Ok(_) => UTF_8,
        Err(e) if e.error_len().is_none() => UTF_8,
        Err(_) => {
            let mut detector = chardetng::EncodingDetector::new();
            detector.feed(bytes, false);
            detector.guess(None, true)
        }
    }
}

/// Holds a trailing partial line until its newline arrives.
#[derive(Debug, Default)]
pub struct LineBuffer {
    partial: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text; returns every line completed by it, `\n` included.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = text;
        while let Some(pos) = rest.find('\n') {
            let (line, tail) = rest.split_at(pos + 1);
            if self.partial.is_empty() {
                lines.push(line.to_string());
            } else {
                let mut full = std::mem::take(&mut self.partial);
                full.push_str(line);
                lines.push(full);
            }
            rest = tail;
        }
        self.partial.push_str(rest);
        lines
    }

    /// Whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        (!self.partial.is_empty()).then(|| std::mem::take(&mut self.partial))
    }
}

#[cfg(test)]
#[path = "decode_tests.rs"]
mod tests;
