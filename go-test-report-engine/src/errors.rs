// Copyright (c) The go-test-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by go-test-report.

use crate::grouping::GroupingKind;
use camino::Utf8PathBuf;
use config::ConfigError;
use serde_json::error::Category;
use std::{borrow::Cow, fmt, ops::Range};
use thiserror::Error;

/// A line of the input stream could not be decoded as a test event.
///
/// This is always fatal: aggregating the rest of a corrupted stream could silently produce a
/// misleading report.
#[derive(Debug, Error)]
#[error("line {line_number} is not a valid test event")]
pub struct MalformedEventError {
    line_number: usize,
    line: String,
    #[source]
    err: serde_json::Error,
}

impl MalformedEventError {
    pub(crate) fn new(line_number: usize, line: impl Into<String>, err: serde_json::Error) -> Self {
        Self {
            line_number,
            line: line.into(),
            err,
        }
    }

    /// Returns the 1-based line number of the malformed line.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Returns the contents of the malformed line.
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Returns the byte range of [`Self::line`] at which decoding failed.
    ///
    /// The range covers one character, or is empty if decoding ran off the end of the line.
    pub fn error_span(&self) -> Range<usize> {
        // serde_json columns are 1-based byte offsets, and 0 if nothing was read.
        let mut start = self.err.column().saturating_sub(1).min(self.line.len());
        while !self.line.is_char_boundary(start) {
            start -= 1;
        }
        let len = self.line[start..].chars().next().map_or(0, char::len_utf8);
        start..start + len
    }

    /// Returns a short description of why the line is not an event.
    pub fn reason(&self) -> &'static str {
        match self.err.classify() {
            Category::Syntax => "invalid JSON",
            Category::Eof => "unexpected end of line",
            Category::Data => "not a test event",
            Category::Io => "read error",
        }
    }
}

/// An error that occurs while reading the event stream.
#[derive(Debug, Error)]
pub enum ReadEventsError {
    /// Reading from the input failed.
    #[error("error reading test events")]
    Io(#[source] std::io::Error),

    /// A line could not be decoded.
    #[error(transparent)]
    Malformed(#[from] MalformedEventError),

    /// Echoing an input line to the verbose output failed.
    #[error("error echoing test events to output")]
    Echo(#[source] std::io::Error),
}

/// An error that occurs while looking up the source positions of test functions in a package.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PositionLookupError {
    /// The lookup command could not be executed.
    #[error("failed to execute `{command}` for package `{package}`")]
    Exec {
        /// The package being looked up.
        package: String,

        /// The command that was run.
        command: String,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },

    /// The lookup command exited with a failure.
    #[error("`{command}` failed for package `{package}`{}", display_exit_code(*.exit_code))]
    CommandFailed {
        /// The package being looked up.
        package: String,

        /// The command that was run.
        command: String,

        /// The exit code, if the process was not terminated by a signal.
        exit_code: Option<i32>,

        /// Standard error produced by the command.
        stderr: String,
    },

    /// The output of the lookup command could not be parsed.
    #[error("failed to parse package listing for `{package}`")]
    Parse {
        /// The package being looked up.
        package: String,

        /// The underlying error.
        #[source]
        err: serde_json::Error,
    },

    /// A source file in the package could not be read.
    #[error("failed to read `{path}` in package `{package}`")]
    ReadSource {
        /// The package being looked up.
        package: String,

        /// The file that could not be read.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },
}

impl PositionLookupError {
    /// Returns the package whose lookup failed.
    pub fn package(&self) -> &str {
        match self {
            Self::Exec { package, .. }
            | Self::CommandFailed { package, .. }
            | Self::Parse { package, .. }
            | Self::ReadSource { package, .. } => package,
        }
    }
}

fn display_exit_code(exit_code: Option<i32>) -> String {
    match exit_code {
        Some(code) => format!(" with exit code {code}"),
        None => String::new(),
    }
}

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse go-test-report config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),
}

/// Error returned while parsing an [`IndicatorSize`](crate::config::IndicatorSize) value.
#[derive(Clone, Debug, Error)]
pub struct IndicatorSizeParseError {
    input: String,
    message: Cow<'static, str>,
}

impl IndicatorSizeParseError {
    pub(crate) fn new(input: impl Into<String>, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            input: input.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for IndicatorSizeParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "invalid indicator size `{}` (expected \"<size>\" or \"<width>x<height>\"): {}",
            self.input, self.message
        )
    }
}

/// Error returned while parsing a [`GroupSize`](crate::grouping::GroupSize) value.
#[derive(Clone, Debug, Error)]
#[error("invalid group size `{input}`: {message}")]
pub struct GroupSizeParseError {
    input: String,
    message: Cow<'static, str>,
}

impl GroupSizeParseError {
    pub(crate) fn new(input: impl Into<String>, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            input: input.into(),
            message: message.into(),
        }
    }
}

/// Error returned while parsing a [`GroupingKind`] value from a string.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized value for grouping: {input}\n(known values: {})",
    GroupingKind::variants().join(", "),
)]
pub struct GroupingKindParseError {
    input: String,
}

impl GroupingKindParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// An error that occurs while writing a report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteReportError {
    /// An error occurred while writing the report to the provided output.
    #[error("error writing report")]
    Io(#[source] std::io::Error),

    /// An error occurred while operating on the file system.
    #[error("error operating on path {file}")]
    Fs {
        /// The file being operated on.
        file: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// The report data could not be serialized.
    #[error("error serializing report data")]
    Json(#[source] serde_json::Error),

    /// An error occurred while producing JUnit XML.
    #[error("error writing JUnit output to {file}")]
    Junit {
        /// The output file.
        file: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: quick_junit::SerializeError,
    },
}
