// Copyright (c) The go-test-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reserved field names in structured log lines.
//!
//! When tests run in parallel, `go test` attributes asynchronous log output to whichever test
//! happened to be running at the time. Test helpers that log JSON lines can carry the identity of
//! the test that really produced them in the [`TEST`] and [`PACKAGE`] fields; go-test-report uses
//! these to move the line back to its owner.
//!
//! A line only counts as attributable if it carries *both* [`TEST`] and [`PACKAGE`].

/// The name of the test that produced the line.
pub const TEST: &str = "Test";

/// The import path of the package that produced the line.
pub const PACKAGE: &str = "Package";

/// The RFC 3339 timestamp at which the line was logged.
pub const TIME: &str = "time";

/// The severity of the line, e.g. `info` or `error`.
pub const LEVEL: &str = "level";

/// A human-readable title for the test. Lines carrying a title are metadata and are not shown as
/// output; the title is appended to the test's name instead.
pub const TITLE: &str = "Title";

/// Marks a line worth showing in full. Such lines are pretty-printed across multiple lines
/// instead of compacted onto one.
pub const DETAIL: &str = "RequestApi";
