// Copyright (c) The go-test-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    aggregator::{TestOutcome, TestStatus},
    errors::WriteReportError,
    reassembly::ReassembledRun,
};
use camino::Utf8Path;
use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use quick_junit::{NonSuccessKind, Report, TestCase, TestCaseStatus, TestSuite};
use std::{fs::File, io::BufWriter, time::Duration};

/// Builds a JUnit report with one test suite per package.
///
/// Packages without tests get an empty suite. JUnit has no notion of omission, so each suite lists
/// its omitted tests as `omitted` properties.
pub fn junit_report(
    run: &ReassembledRun,
    name: &str,
    timestamp: DateTime<FixedOffset>,
    elapsed: Duration,
) -> Report {
    let mut suites: IndexMap<&str, TestSuite> = run
        .all_packages
        .iter()
        .map(|package| (package.as_str(), TestSuite::new(package.as_str())))
        .collect();

    for status in run.tests.values() {
        let suite = suites
            .entry(status.package.as_str())
            .or_insert_with(|| TestSuite::new(status.package.as_str()));
        if status.omitted {
            suite.add_property(("omitted", status.test_name.as_str()));
        }
        suite.add_test_case(test_case(status));
    }

    let mut report = Report::new(name);
    report
        .set_timestamp(timestamp)
        .set_time(elapsed)
        .add_test_suites(suites.into_values());
    report
}

fn test_case(status: &TestStatus) -> TestCase {
    let testcase_status = match status.outcome() {
        TestOutcome::Passed => TestCaseStatus::success(),
        TestOutcome::Skipped => TestCaseStatus::skipped(),
        TestOutcome::Failed => {
            let mut testcase_status = TestCaseStatus::non_success(NonSuccessKind::Failure);
            testcase_status.set_type("test failure");
            testcase_status
        }
    };

    let mut testcase = TestCase::new(status.test_name.as_str(), testcase_status);
    testcase
        .set_classname(status.package.as_str())
        .set_time(Duration::try_from_secs_f64(status.elapsed_time).unwrap_or_default());
    if !status.output.is_empty() {
        testcase.set_system_out(status.output.join("\n"));
    }
    testcase
}

/// Writes a JUnit report to `path`, creating parent directories as needed.
pub fn write_junit_report_file(report: &Report, path: &Utf8Path) -> Result<(), WriteReportError> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|error| WriteReportError::Fs {
            file: dir.to_path_buf(),
            error,
        })?;
    }
    let file = File::create(path).map_err(|error| WriteReportError::Fs {
        file: path.to_path_buf(),
        error,
    })?;
    report
        .serialize(BufWriter::new(file))
        .map_err(|error| WriteReportError::Junit {
            file: path.to_path_buf(),
            error,
        })
}
