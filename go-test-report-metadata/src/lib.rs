// Copyright (c) The go-test-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Structured access to the machine-readable data consumed and produced by go-test-report.
//!
//! The input to go-test-report is the newline-delimited JSON stream produced by `go test -json`
//! (also known as the `test2json` format). Each line is decoded into a [`RawEvent`].
//!
//! Tests may additionally log their own structured (JSON) lines to standard output. A small set of
//! reserved field names in those payloads, documented in [`payload`], lets go-test-report attribute
//! such lines to the test that emitted them.

mod event;
mod exit_codes;
pub mod payload;

pub use event::*;
pub use exit_codes::*;
