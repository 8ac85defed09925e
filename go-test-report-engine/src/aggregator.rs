// Copyright (c) The go-test-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Folding decoded events into one status record per test.
//!
//! The aggregator is fed events in arrival order. It keeps one [`TestStatus`] per [`TestId`],
//! creating it the first time any event mentions the test, and collects failing tests in a
//! [`FailureSet`]. Whether a failing parent is reported or omitted can only be decided once the
//! stream has ended, since a subtest's `fail` may arrive after its parent's.

use crate::{
    decoder::EventReader,
    errors::ReadEventsError,
    position::SourcePosition,
    test_name::{TestId, TestNameFilter},
    write_str::WriteStr,
};
use go_test_report_metadata::{Action, RawEvent};
use itertools::Itertools;
use serde::Serialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    io::BufRead,
};
use tracing::debug;

/// The final outcome of a test.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestOutcome {
    /// The test passed.
    Passed,
    /// The test failed, or never reported a result.
    Failed,
    /// The test was skipped.
    Skipped,
}

impl TestOutcome {
    /// Returns a short lowercase description.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Everything known about a single test.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStatus {
    /// The package import path.
    pub package: String,

    /// The normalized test name. After reassembly, this includes the display title if any.
    pub test_name: String,

    /// Elapsed time in seconds, from the terminal event.
    pub elapsed_time: f64,

    /// Whether the test passed.
    pub passed: bool,

    /// Whether the test was skipped.
    pub skipped: bool,

    /// Whether this test's own result is explained by its subtests and must not be counted.
    pub omitted: bool,

    /// Output.
    ///
    /// During aggregation these are raw fragments exactly as received. After reassembly they are
    /// finished log lines.
    pub output: Vec<String>,

    /// The display title, extracted during reassembly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Where the test function is defined, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<SourcePosition>,
}

impl TestStatus {
    fn new(id: &TestId) -> Self {
        Self {
            package: id.package.clone(),
            test_name: id.name.clone(),
            ..Default::default()
        }
    }

    /// Returns the outcome of this test.
    ///
    /// A test that never received a terminal event counts as failed.
    pub fn outcome(&self) -> TestOutcome {
        if self.passed {
            TestOutcome::Passed
        } else if self.skipped {
            TestOutcome::Skipped
        } else {
            TestOutcome::Failed
        }
    }

    /// Returns the top-level test function this test belongs to.
    pub fn function_name(&self) -> &str {
        crate::test_name::function_name(&self.test_name)
    }
}

/// Failing tests, split into top-level tests and subtests, in the order their `fail` events
/// arrived.
#[derive(Clone, Debug, Default)]
pub struct FailureSet {
    parents: Vec<TestId>,
    subtests: Vec<TestId>,
}

/// The result of [`FailureSet::resolve`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResolvedFailures {
    /// Tests to report as failing: top-level tests whose failure is not explained by a subtest,
    /// followed by every failing subtest.
    pub failed: Vec<TestId>,

    /// Top-level tests omitted because a subtest failure explains them.
    pub omitted: Vec<TestId>,
}

impl FailureSet {
    /// Records a failing test.
    pub fn record(&mut self, id: TestId) {
        if id.is_subtest() {
            self.subtests.push(id);
        } else {
            self.parents.push(id);
        }
    }

    /// Returns true if no failures were recorded.
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty() && self.subtests.is_empty()
    }

    /// Decides which parents are omitted.
    pub fn resolve(self) -> ResolvedFailures {
        let (omitted, reported): (Vec<_>, Vec<_>) =
            self.parents.into_iter().partition(|parent| {
                self.subtests
                    .iter()
                    .any(|subtest| parent.is_ancestor_of(subtest))
            });

        let failed = reported
            .into_iter()
            .chain(self.subtests)
            .unique()
            .collect();
        let omitted = omitted.into_iter().unique().collect();
        ResolvedFailures { failed, omitted }
    }
}

/// Builds [`TestStatus`] records from a stream of events.
#[derive(Debug)]
pub struct StatusAggregator {
    name_filter: TestNameFilter,
    tests: BTreeMap<TestId, TestStatus>,
    packages: BTreeSet<String>,
    failures: FailureSet,
}

impl StatusAggregator {
    /// Creates a new aggregator.
    pub fn new(name_filter: TestNameFilter) -> Self {
        Self {
            name_filter,
            tests: BTreeMap::new(),
            packages: BTreeSet::new(),
            failures: FailureSet::default(),
        }
    }

    /// Folds a single event into the aggregate.
    pub fn handle_event(&mut self, event: RawEvent) {
        if !event.package.is_empty() {
            self.packages.insert(event.package.clone());
        }

        let name = self.name_filter.filter(&event.test);
        if name.is_empty() {
            return;
        }
        let id = TestId::new(event.package, name.into_owned());

        let status = self
            .tests
            .entry(id.clone())
            .or_insert_with_key(TestStatus::new);

        match event.action {
            Action::Output => status.output.push(event.output),
            Action::Pass => {
                status.elapsed_time = event.elapsed;
                status.passed = true;
            }
            Action::Skip => {
                status.elapsed_time = event.elapsed;
                status.skipped = true;
            }
            Action::Fail => {
                status.elapsed_time = event.elapsed;
                self.failures.record(id);
            }
            Action::Start
            | Action::Run
            | Action::Pause
            | Action::Cont
            | Action::Bench
            | Action::Unknown => {}
        }
    }

    /// Reads every event from `reader`, optionally echoing each line to `echo`.
    ///
    /// Stops at the first error; the aggregate is then incomplete and should be discarded.
    pub fn ingest<R: BufRead>(
        &mut self,
        reader: &mut EventReader<R>,
        mut echo: Option<&mut dyn WriteStr>,
    ) -> Result<(), ReadEventsError> {
        while let Some(event) = reader.next_event()? {
            if let Some(echo) = echo.as_deref_mut() {
                echo.write_str(reader.line())
                    .and_then(|()| echo.write_char('\n'))
                    .map_err(ReadEventsError::Echo)?;
            }
            self.handle_event(event);
        }

        if let Some(echo) = echo {
            echo.write_str_flush().map_err(ReadEventsError::Echo)?;
        }
        debug!(
            "read {} lines: {} tests in {} packages",
            reader.line_number(),
            self.tests.len(),
            self.packages.len(),
        );
        Ok(())
    }

    /// Finishes aggregation, resolving omissions.
    pub fn finish(self) -> AggregatedRun {
        let Self {
            mut tests,
            packages,
            failures,
            ..
        } = self;

        // A passing top-level test with subtests is counted through its subtests.
        let parents_with_subtests: BTreeSet<TestId> = tests
            .keys()
            .filter(|id| id.is_subtest())
            .map(|id| TestId::new(id.package.clone(), id.function_name()))
            .collect();
        for parent in &parents_with_subtests {
            if let Some(status) = tests.get_mut(parent)
                && status.passed
            {
                status.omitted = true;
            }
        }

        let resolved = failures.resolve();
        for id in &resolved.omitted {
            if let Some(status) = tests.get_mut(id) {
                status.omitted = true;
            }
        }

        AggregatedRun {
            tests,
            packages,
            failed_tests: resolved.failed,
        }
    }
}

impl Default for StatusAggregator {
    fn default() -> Self {
        Self::new(TestNameFilter::default())
    }
}

/// The output of [`StatusAggregator::finish`].
#[derive(Clone, Debug, Default)]
pub struct AggregatedRun {
    /// One record per test.
    pub tests: BTreeMap<TestId, TestStatus>,

    /// Every package mentioned in the stream, including packages without tests.
    pub packages: BTreeSet<String>,

    /// The final list of failing tests.
    pub failed_tests: Vec<TestId>,
}
