// Copyright (c) The go-test-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decoding of the `go test -json` event stream.
//!
//! Each line of the stream is one complete JSON record. There is no framing beyond the newline, and
//! a line that fails to decode is fatal for the whole stream.

use crate::errors::{MalformedEventError, ReadEventsError};
use go_test_report_metadata::RawEvent;
use std::io::BufRead;

/// Decodes a single line into a [`RawEvent`].
///
/// `line_number` is 1-based and only used for error reporting.
pub fn decode_event(line_number: usize, line: &str) -> Result<RawEvent, MalformedEventError> {
    RawEvent::from_json_line(line).map_err(|err| MalformedEventError::new(line_number, line, err))
}

/// Reads events one line at a time from a buffered reader.
///
/// Lines that are empty or contain only whitespace are skipped rather than reported as malformed,
/// so a stream with a trailing blank line or stray `\r\n` separators still decodes. Every other
/// line must be a complete event; [`decode_event`] on its own does not skip anything.
#[derive(Debug)]
pub struct EventReader<R> {
    reader: R,
    buf: String,
    line_number: usize,
}

impl<R: BufRead> EventReader<R> {
    /// Creates a new reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            line_number: 0,
        }
    }

    /// Reads and decodes the next event, or returns `None` at the end of the stream.
    pub fn next_event(&mut self) -> Result<Option<RawEvent>, ReadEventsError> {
        loop {
            self.buf.clear();
            let read = self
                .reader
                .read_line(&mut self.buf)
                .map_err(ReadEventsError::Io)?;
            if read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = self.line();
            if line.trim().is_empty() {
                continue;
            }
            return decode_event(self.line_number, line)
                .map(Some)
                .map_err(ReadEventsError::from);
        }
    }

    /// Returns the most recently read line, without its line terminator.
    pub fn line(&self) -> &str {
        self.buf.trim_end_matches(['\n', '\r'])
    }

    /// Returns the 1-based number of the most recently read line.
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}
