// Copyright (c) The go-test-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn `go test -json` output into a self-contained HTML test report.
//!
//! ```text
//! go test -json ./... | go-test-report -t "Nightly" -o report.html
//! ```
//!
//! The heavy lifting lives in `go-test-report-engine`; this crate parses arguments, sets up
//! logging and maps failures to exit codes.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{OutputContext, OutputWriter, StderrStyles};
