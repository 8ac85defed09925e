// Copyright (c) The go-test-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A single line of `go test -json` output.
///
/// Fields that `go test` omits are filled in with their default (empty) values, so a package-level
/// summary line simply has an empty [`test`](Self::test).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RawEvent {
    /// The time at which the event was produced.
    ///
    /// This is informational only: a missing or unparseable timestamp decodes as `None` rather
    /// than failing the whole line.
    #[serde(
        default,
        deserialize_with = "deserialize_lenient_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<DateTime<FixedOffset>>,

    /// The kind of event.
    #[serde(default)]
    pub action: Action,

    /// The import path of the package the event belongs to.
    #[serde(default)]
    pub package: String,

    /// The name of the test, or empty for package-level events.
    ///
    /// Subtests are separated from their parents by `/`, e.g. `TestParent/Child`.
    #[serde(default)]
    pub test: String,

    /// Elapsed time in seconds. Only meaningful for terminal actions.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub elapsed: f64,

    /// A fragment of output. Only meaningful for [`Action::Output`].
    ///
    /// Fragments are not aligned to lines: a fragment may lack a trailing newline, in which case
    /// the next fragment continues the same line.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub output: String,
}

impl RawEvent {
    /// Decodes a single line of `go test -json` output.
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// The kind of a [`RawEvent`].
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// The package's test binary started.
    Start,
    /// A test started running.
    Run,
    /// A test was paused, e.g. to wait for parallel subtests.
    Pause,
    /// A paused test continued running.
    Cont,
    /// A test (or package) printed output.
    Output,
    /// A test passed.
    Pass,
    /// A test failed.
    Fail,
    /// A test was skipped.
    Skip,
    /// A benchmark printed its results.
    Bench,
    /// An action not known to this version of go-test-report.
    #[default]
    #[serde(other)]
    Unknown,
}

impl Action {
    /// Returns true if this action finishes a test: pass, fail or skip.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Pass | Self::Fail | Self::Skip)
    }

    /// Returns the string used for this action in the wire format.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Run => "run",
            Self::Pause => "pause",
            Self::Cont => "cont",
            Self::Output => "output",
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Skip => "skip",
            Self::Bench => "bench",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn deserialize_lenient_time<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<FixedOffset>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()))
}

fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn decode_output_line() {
        let line = r#"{"Time":"2021-11-11T15:27:21.455853+08:00","Action":"output","Package":"example.com/pkg","Test":"TestFunc1","Output":"=== RUN   TestFunc1\n"}"#;
        let event = RawEvent::from_json_line(line).expect("line is valid");
        assert_eq!(
            event,
            RawEvent {
                time: Some(
                    DateTime::parse_from_rfc3339("2021-11-11T15:27:21.455853+08:00")
                        .expect("valid time")
                ),
                action: Action::Output,
                package: "example.com/pkg".to_owned(),
                test: "TestFunc1".to_owned(),
                elapsed: 0.0,
                output: "=== RUN   TestFunc1\n".to_owned(),
            }
        );
    }

    #[test]
    fn decode_package_summary_line() {
        let line = r#"{"Action":"fail","Package":"example.com/pkg","Elapsed":109.622}"#;
        let event = RawEvent::from_json_line(line).expect("line is valid");
        assert_eq!(event.action, Action::Fail);
        assert_eq!(event.test, "");
        assert_eq!(event.elapsed, 109.622);
        assert_eq!(event.time, None);
    }

    #[test]
    fn unparseable_time_is_not_fatal() {
        let line = r#"{"Time":"yesterday","Action":"run","Package":"p","Test":"TestA"}"#;
        let event = RawEvent::from_json_line(line).expect("line is valid");
        assert_eq!(event.time, None);
        assert_eq!(event.action, Action::Run);
    }

    #[test_case("start", Action::Start ; "start")]
    #[test_case("cont", Action::Cont ; "cont")]
    #[test_case("skip", Action::Skip ; "skip")]
    #[test_case("bench", Action::Bench ; "bench")]
    #[test_case("build-output", Action::Unknown ; "unknown action")]
    fn decode_action(input: &str, expected: Action) {
        let line = format!(r#"{{"Action":"{input}","Package":"p"}}"#);
        let event = RawEvent::from_json_line(&line).expect("line is valid");
        assert_eq!(event.action, expected);
    }

    #[test_case("" ; "empty")]
    #[test_case("not json" ; "plain text")]
    #[test_case(r#"["run"]"# ; "array")]
    #[test_case(r#"{"Action":"run","Elapsed":"soon"}"# ; "wrong field type")]
    fn decode_failure(line: &str) {
        RawEvent::from_json_line(line).expect_err("line is malformed");
    }

    #[test]
    fn terminal_actions() {
        let terminal: Vec<_> = [
            Action::Start,
            Action::Run,
            Action::Pause,
            Action::Cont,
            Action::Output,
            Action::Pass,
            Action::Fail,
            Action::Skip,
            Action::Bench,
            Action::Unknown,
        ]
        .into_iter()
        .filter(|action| action.is_terminal())
        .collect();
        assert_eq!(terminal, vec![Action::Pass, Action::Fail, Action::Skip]);
    }
}
