// Copyright (c) The go-test-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turning raw output fragments into finished, correctly attributed log lines.
//!
//! `go test -json` splits output into fragments that need not line up with lines. Once a run has
//! been aggregated, each test's fragments are stitched back into lines. Lines that decode as JSON
//! objects carrying the reserved [`payload::TEST`] and [`payload::PACKAGE`] fields are structured
//! log entries: these are moved to the test they name (parallel tests often log against the wrong
//! test), re-rendered, and may set a display title for their test.

use crate::{
    aggregator::{AggregatedRun, TestStatus},
    test_name::{TestId, TestNameFilter},
};
use chrono::{DateTime, FixedOffset, Local};
use debug_ignore::DebugIgnore;
use go_test_report_metadata::payload;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f %z";

/// A single logical line of output, decoded.
#[derive(Clone, Debug, PartialEq)]
pub enum OutputLine {
    /// A line that is not a structured log entry.
    PlainText(String),

    /// A structured log entry.
    Structured(StructuredEntry),
}

impl OutputLine {
    /// Decodes a line (without its trailing newline).
    ///
    /// Anything that is not a JSON object with string [`payload::TEST`] and [`payload::PACKAGE`]
    /// fields is plain text.
    pub fn decode(line: &str) -> Self {
        let Ok(mut fields) = serde_json::from_str::<Map<String, Value>>(line.trim()) else {
            return Self::PlainText(line.to_owned());
        };

        let (Some(Value::String(_)), Some(Value::String(_))) =
            (fields.get(payload::TEST), fields.get(payload::PACKAGE))
        else {
            return Self::PlainText(line.to_owned());
        };
        let test = take_string(&mut fields, payload::TEST).unwrap_or_default();
        let package = take_string(&mut fields, payload::PACKAGE).unwrap_or_default();

        let time = fields.remove(payload::TIME).and_then(|value| match value {
            Value::String(s) => DateTime::parse_from_rfc3339(&s).ok(),
            _ => None,
        });
        let level = take_string(&mut fields, payload::LEVEL);
        let title = take_string(&mut fields, payload::TITLE);
        let detailed = fields.contains_key(payload::DETAIL);

        Self::Structured(StructuredEntry {
            test,
            package,
            time,
            level,
            title,
            detailed,
            fields,
        })
    }
}

/// Removes `key` from `fields` if it holds a string.
fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(Value::String(_)) => match fields.remove(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        },
        _ => None,
    }
}

/// A structured log entry, with its reserved fields pulled out.
#[derive(Clone, Debug, PartialEq)]
pub struct StructuredEntry {
    /// The test that logged the entry.
    pub test: String,

    /// The package that logged the entry.
    pub package: String,

    /// When the entry was logged, if the payload carried a valid timestamp.
    pub time: Option<DateTime<FixedOffset>>,

    /// The severity, if present.
    pub level: Option<String>,

    /// The display title, if present. Entries with a title are not shown as output.
    pub title: Option<String>,

    /// Whether the entry should be rendered in the expanded format.
    pub detailed: bool,

    /// The remaining fields.
    pub fields: Map<String, Value>,
}

impl StructuredEntry {
    /// Renders the entry as it appears in a test's output.
    pub fn render(&self) -> String {
        let time = match &self.time {
            Some(time) => time.format(TIME_FORMAT).to_string(),
            None => "-".to_owned(),
        };
        let level = self.level.as_deref().unwrap_or_default();
        // Cloning into a Value is the simplest way to reach serde_json's Display impls.
        let fields = Value::Object(self.fields.clone());
        if self.detailed {
            format!("---\n{time}|{level} ~ \n{fields:#}\n---")
        } else {
            format!("{time}|{level} ~ {fields}")
        }
    }
}

/// Joins output fragments into lines.
///
/// Fragments are concatenated and split on `\n`; the newline is not part of the line. A trailing
/// fragment without a newline still forms a final line.
pub fn assemble_lines<I>(fragments: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut lines = Vec::new();
    let mut pending = String::new();
    for fragment in fragments {
        let mut rest = fragment.as_ref();
        while let Some(idx) = rest.find('\n') {
            pending.push_str(&rest[..idx]);
            lines.push(std::mem::take(&mut pending));
            rest = &rest[idx + 1..];
        }
        pending.push_str(rest);
    }
    if !pending.is_empty() {
        lines.push(pending);
    }
    lines
}

#[derive(Debug)]
enum RoutedKind {
    Line(String),
    Title(String),
}

#[derive(Debug)]
struct Routed {
    time: Option<DateTime<FixedOffset>>,
    kind: RoutedKind,
}

/// Rewrites the output of an aggregated run into finished log lines.
#[derive(Debug)]
pub struct LogReassembler<'a> {
    name_filter: &'a TestNameFilter,
    clock: DebugIgnore<Box<dyn Fn() -> DateTime<FixedOffset> + 'a>>,
}

impl<'a> LogReassembler<'a> {
    /// Creates a new reassembler. Structured entries name their test before normalization, so the
    /// same filter that was used during aggregation must be passed in here.
    pub fn new(name_filter: &'a TestNameFilter) -> Self {
        Self {
            name_filter,
            clock: DebugIgnore(Box::new(|| Local::now().fixed_offset())),
        }
    }

    /// Replaces the clock used to timestamp plain-text lines.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<FixedOffset> + 'a) -> Self {
        self.clock = DebugIgnore(Box::new(clock));
        self
    }

    /// Reassembles every test's output.
    pub fn reassemble(&self, run: AggregatedRun) -> ReassembledRun {
        let AggregatedRun {
            mut tests,
            packages: all_packages,
            failed_tests,
        } = run;

        let fragments: Vec<(TestId, Vec<String>)> = tests
            .iter_mut()
            .map(|(id, status)| (id.clone(), std::mem::take(&mut status.output)))
            .collect();

        let mut routed: BTreeMap<TestId, Vec<Routed>> = BTreeMap::new();
        for (owner, fragments) in fragments {
            for line in assemble_lines(&fragments) {
                let (target, entry) = match OutputLine::decode(&line) {
                    OutputLine::PlainText(text) => (
                        owner.clone(),
                        Routed {
                            time: Some((self.clock)()),
                            kind: RoutedKind::Line(text),
                        },
                    ),
                    OutputLine::Structured(entry) => {
                        let named = self.target_for(&owner, &entry, &tests);
                        let kind = match (&entry.title, &named) {
                            (Some(title), Some(_)) => RoutedKind::Title(title.clone()),
                            (Some(title), None) => {
                                debug!(
                                    "title {title:?} from {owner} names unknown test {}/{}, dropping it",
                                    entry.package, entry.test,
                                );
                                continue;
                            }
                            (None, _) => RoutedKind::Line(entry.render()),
                        };
                        (
                            named.unwrap_or_else(|| owner.clone()),
                            Routed {
                                time: entry.time,
                                kind,
                            },
                        )
                    }
                };
                routed.entry(target).or_default().push(entry);
            }
        }

        let mut renamed = BTreeMap::new();
        let mut finished = BTreeMap::new();
        let mut packages: BTreeMap<String, BTreeSet<TestId>> = BTreeMap::new();
        for (id, mut status) in tests {
            let mut entries = routed.remove(&id).unwrap_or_default();
            entries.sort_by_key(|entry| entry.time);

            for entry in entries {
                match entry.kind {
                    RoutedKind::Line(line) => status.output.push(line),
                    RoutedKind::Title(title) => status.title = Some(title),
                }
            }

            let final_id = apply_title(&id, &mut status);
            if final_id != id {
                renamed.insert(id, final_id.clone());
            }
            packages
                .entry(final_id.package.clone())
                .or_default()
                .insert(final_id.clone());
            finished.insert(final_id, status);
        }

        let failed_tests = failed_tests
            .into_iter()
            .map(|id| renamed.get(&id).cloned().unwrap_or(id))
            .collect();

        ReassembledRun {
            tests: finished,
            packages,
            all_packages,
            failed_tests,
        }
    }

    /// Returns the test a structured entry belongs to, or `None` if it names a test that is not
    /// part of the run.
    ///
    /// An entry with an empty package belongs to the test that printed it.
    fn target_for(
        &self,
        owner: &TestId,
        entry: &StructuredEntry,
        tests: &BTreeMap<TestId, TestStatus>,
    ) -> Option<TestId> {
        if entry.package.is_empty() {
            return Some(owner.clone());
        }
        let target = TestId::new(
            entry.package.as_str(),
            self.name_filter.filter(&entry.test).into_owned(),
        );
        if target == *owner || tests.contains_key(&target) {
            Some(target)
        } else {
            debug!("structured output from {owner} names unknown test {target}, keeping it in place");
            None
        }
    }
}

fn apply_title(id: &TestId, status: &mut TestStatus) -> TestId {
    match &status.title {
        Some(title) => {
            status.test_name = format!("{}({title})", id.name);
            TestId::new(id.package.as_str(), status.test_name.as_str())
        }
        None => id.clone(),
    }
}

/// The output of [`LogReassembler::reassemble`].
#[derive(Clone, Debug, Default)]
pub struct ReassembledRun {
    /// Every test, keyed by its final (possibly titled) identity.
    pub tests: BTreeMap<TestId, TestStatus>,

    /// The identities of tests in each package that has tests.
    pub packages: BTreeMap<String, BTreeSet<TestId>>,

    /// Every package mentioned in the stream, including packages without tests.
    pub all_packages: BTreeSet<String>,

    /// The final list of failing tests, using final identities.
    pub failed_tests: Vec<TestId>,
}
