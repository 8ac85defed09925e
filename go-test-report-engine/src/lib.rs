// Copyright (c) The go-test-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for go-test-report.
//!
//! The flow of operations is:
//!
//! 1. [`decoder`] turns the `go test -json` stream into events.
//! 2. [`aggregator`] folds events into one status per test and decides which tests failed and
//!    which are omitted because their subtests explain the result.
//! 3. [`reassembly`] splits output into lines and moves structured log lines to the test that
//!    emitted them.
//! 4. [`position`] optionally looks up where each test function is declared.
//! 5. [`grouping`] partitions tests into report groups, and [`reporter`] writes the HTML report
//!    and, if requested, a JUnit report.

pub mod aggregator;
pub mod config;
pub mod decoder;
pub mod errors;
pub mod grouping;
pub mod position;
pub mod reassembly;
pub mod reporter;
pub mod test_name;
pub mod write_str;
