// Copyright (c) The go-test-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING, StderrStyles};
use camino::Utf8PathBuf;
use go_test_report_engine::errors::{
    ConfigParseError, ConfigParseErrorKind, MalformedEventError, PositionLookupError,
    ReadEventsError, WriteReportError,
};
use go_test_report_metadata::ReportExitCode;
use miette::{Diagnostic, SourceSpan};
use owo_colors::OwoColorize;
use std::{error::Error, path::PathBuf};
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// The #[error()] strings are placeholders: errors are meant to be printed with display_to_stderr,
// which colorizes them and prints the cause chain.

/// An error caused by the input or environment rather than a bug in go-test-report.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine the current directory")]
    CurrentDirUnavailable {
        #[source]
        err: std::io::Error,
    },
    #[error("current directory is not valid UTF-8")]
    CurrentDirInvalidUtf8 { path: PathBuf },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("missing stdin pipe")]
    MissingStdinPipe,
    #[error("failed to read events")]
    ReadEventsError {
        #[from]
        err: ReadEventsError,
    },
    #[error("failed to look up source positions")]
    PositionLookupError {
        #[from]
        err: PositionLookupError,
    },
    #[error("failed to write report")]
    WriteReportError {
        output: Utf8PathBuf,
        #[source]
        err: WriteReportError,
    },
    #[error("failed to write to stdout")]
    WriteStdoutError {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn write_report_error(output: impl Into<Utf8PathBuf>, err: WriteReportError) -> Self {
        Self::WriteReportError {
            output: output.into(),
            err,
        }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirUnavailable { .. }
            | Self::CurrentDirInvalidUtf8 { .. }
            | Self::ConfigParseError { .. }
            | Self::MissingStdinPipe => ReportExitCode::SETUP_ERROR,
            Self::ReadEventsError { err } => match err {
                ReadEventsError::Malformed(_) => ReportExitCode::MALFORMED_EVENT,
                ReadEventsError::Io(_) | ReadEventsError::Echo(_) => {
                    ReportExitCode::READ_INPUT_ERROR
                }
            },
            Self::PositionLookupError { .. } => ReportExitCode::POSITION_LOOKUP_FAILED,
            Self::WriteReportError { .. } | Self::WriteStdoutError { .. } => {
                ReportExitCode::WRITE_OUTPUT_ERROR
            }
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::CurrentDirUnavailable { err } => {
                error!("could not determine the current directory");
                Some(err as &dyn Error)
            }
            Self::CurrentDirInvalidUtf8 { path } => {
                error!(
                    "current directory `{}` is not valid UTF-8",
                    path.display().style(styles.bold)
                );
                None
            }
            Self::ConfigParseError { err } => {
                match err.kind() {
                    ConfigParseErrorKind::DeserializeError(error) => {
                        error!(
                            "failed to parse config at `{}`: invalid value for `{}`",
                            err.config_file().style(styles.bold),
                            error.path().style(styles.bold),
                        );
                        Some(error.inner() as &dyn Error)
                    }
                    ConfigParseErrorKind::BuildError(error) => {
                        error!(
                            "failed to parse config at `{}`",
                            err.config_file().style(styles.bold),
                        );
                        Some(error.as_ref() as &dyn Error)
                    }
                    // ConfigParseErrorKind is non-exhaustive.
                    _ => {
                        error!("{err}");
                        err.source()
                    }
                }
            }
            Self::MissingStdinPipe => {
                error!(
                    "missing stdin pipe: run as `{}`",
                    "go test -json ./... | go-test-report".style(styles.bold)
                );
                None
            }
            Self::ReadEventsError { err } => match err {
                ReadEventsError::Malformed(malformed) => {
                    let report = malformed_report(malformed);
                    error!(target: NO_HEADING, "{:?}", report);
                    error!(
                        "input is not a `{}` stream",
                        "go test -json".style(styles.bold)
                    );
                    None
                }
                ReadEventsError::Io(io) => {
                    error!("failed to read events from stdin");
                    Some(io as &dyn Error)
                }
                ReadEventsError::Echo(io) => {
                    error!("failed to echo events to stdout");
                    Some(io as &dyn Error)
                }
            },
            Self::PositionLookupError { err } => {
                error!(
                    "failed to look up source positions for package `{}` \
                     (set `positions.on-error = \"warn\"` or pass --no-positions to continue)",
                    err.package().style(styles.bold),
                );
                Some(err as &dyn Error)
            }
            Self::WriteReportError { output, err } => {
                error!("failed to write report to `{}`", output.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::WriteStdoutError { err } => {
                error!("failed to write to stdout");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}

/// A malformed input line, rendered with the failing position labeled.
#[derive(Debug, Error, Diagnostic)]
#[error("line {line_number} is not a test event")]
#[diagnostic(help("run the tests with `go test -json` and pipe the output in unchanged"))]
struct MalformedLineDiagnostic {
    line_number: usize,
    #[label("{}", reason)]
    span: SourceSpan,
    reason: &'static str,
}

fn malformed_report(err: &MalformedEventError) -> miette::Report {
    let diagnostic = MalformedLineDiagnostic {
        line_number: err.line_number(),
        span: err.error_span().into(),
        reason: err.reason(),
    };
    miette::Report::new(diagnostic).with_source_code(err.line().to_owned())
}
