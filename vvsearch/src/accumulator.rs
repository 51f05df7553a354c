//! NDJSON accumulation for the remote pipeline.
//!
//! Chunks arrive at arbitrary byte boundaries. Framing happens on raw bytes so
//! a UTF-8 sequence split across two chunks is only decoded once whole. The
//! trailing fragment of each chunk waits for the next one; a fragment left at
//! the end of the stream is parsed as a final record.
//!
//! Lines that fail to parse are logged and dropped. The stream continues.

use crate::progress::ByteProgress;
use serde::de::DeserializeOwned;

/// Splits a byte stream into NDJSON lines and parses each one.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    pending: Vec<u8>,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns the records completed by it, in order.
    pub fn push_chunk<T: DeserializeOwned>(&mut self, chunk: &[u8]) -> Vec<T> {
        self.pending.extend_from_slice(chunk);
        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let complete: Vec<u8> = self.pending.drain(..=last_newline).collect();
        complete
            .split(|&b| b == b'\n')
            .filter_map(parse_line)
            .collect()
    }

    /// Flush the retained fragment once the stream has ended.
    pub fn finish<T: DeserializeOwned>(&mut self) -> Option<T> {
        let rest = std::mem::take(&mut self.pending);
        parse_line(&rest)
    }

    /// Bytes waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn parse_line<T: DeserializeOwned>(line: &[u8]) -> Option<T> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    match serde_json::from_slice(line) {
        Ok(record) => Some(record),
        Err(err) => {
            tracing::warn!(
                error = %err,
                line = %String::from_utf8_lossy(line),
                "dropping malformed result record"
            );
            None
        }
    }
}

/// Append-only result buffer fed by an NDJSON stream.
#[derive(Debug)]
pub struct ResultAccumulator<T> {
    decoder: NdjsonDecoder,
    records: Vec<T>,
    progress: ByteProgress,
    complete: bool,
}

impl<T: DeserializeOwned> ResultAccumulator<T> {
    pub fn new(content_length: Option<u64>) -> Self {
        Self {
            decoder: NdjsonDecoder::new(),
            records: Vec::new(),
            progress: ByteProgress::new(content_length),
            complete: false,
        }
    }

    /// Append every record completed by `chunk`. Returns how many were added.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> usize {
        self.progress.record(chunk.len());
        let parsed: Vec<T> = self.decoder.push_chunk(chunk);
        let added = parsed.len();
        self.records.extend(parsed);
        added
    }

    /// Mark the stream finished, flushing any trailing record.
    pub fn finish(&mut self) -> usize {
        if self.complete {
            return 0;
        }
        self.complete = true;
        match self.decoder.finish() {
            Some(record) => {
                self.records.push(record);
                1
            }
            None => 0,
        }
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn into_records(self) -> Vec<T> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn progress(&self) -> &ByteProgress {
        &self.progress
    }
}
