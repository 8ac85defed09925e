// Copyright (c) The go-test-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `go-test-report` failures.
///
/// A report is produced (and the process exits with [`OK`](Self::OK)) even if some of the tests
/// described by the input stream failed. Non-zero exit codes indicate that no report could be
/// produced.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum ReportExitCode {}

impl ReportExitCode {
    /// No errors occurred and the report was written.
    pub const OK: i32 = 0;

    /// A user issue happened while setting up a go-test-report invocation: an invalid argument or
    /// config file, or standard input not being a pipe.
    pub const SETUP_ERROR: i32 = 96;

    /// Looking up test function source positions failed, and lookup failures were configured to be
    /// fatal.
    pub const POSITION_LOOKUP_FAILED: i32 = 97;

    /// A line of the input stream could not be decoded as a test event.
    pub const MALFORMED_EVENT: i32 = 98;

    /// Reading the input stream produced an I/O error.
    pub const READ_INPUT_ERROR: i32 = 99;

    /// Writing the report, or data to stdout or stderr, produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
