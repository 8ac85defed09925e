// Copyright (c) The go-test-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Producing report documents from a grouped run.
//!
//! [`ReportData`] is the complete, serializable description of a report. The HTML writer renders
//! it and embeds it as JSON; the JUnit writer works from the reassembled run directly.

mod html;
mod junit;

pub use html::{write_html_report, write_html_report_file};
pub use junit::{junit_report, write_junit_report_file};

use crate::{
    aggregator::{TestOutcome, TestStatus},
    config::IndicatorSize,
    grouping::{GroupCounts, GroupSize, GroupedReport},
    reassembly::ReassembledRun,
};
use camino::Utf8Path;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::time::Duration;
use swrite::{SWrite, swrite};

/// Settings and run-level facts needed to render a report.
#[derive(Clone, Debug)]
pub struct ReportContext<'a> {
    /// The title shown at the top of the report.
    pub title: &'a str,

    /// The size of each group indicator.
    pub indicator_size: IndicatorSize,

    /// The configured group size.
    pub group_size: GroupSize,

    /// The file the report is written to.
    pub output: &'a Utf8Path,

    /// How long the run took to process.
    pub duration: Duration,

    /// When the report was generated.
    pub execution_date: DateTime<FixedOffset>,
}

/// Everything the renderers need, in serializable form.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData<'a> {
    /// The report title.
    pub title: &'a str,

    /// The indicator width, as a CSS length.
    pub indicator_width: String,

    /// The indicator height, as a CSS length.
    pub indicator_height: String,

    /// The groups, in display order.
    pub groups: Vec<ReportGroupData<'a>>,

    /// Counts across all groups.
    pub counts: GroupCounts,

    /// The run duration, formatted for display.
    pub test_duration: String,

    /// The date the report was generated, formatted for display.
    pub execution_date: String,

    /// The configured group size.
    pub group_size: usize,

    /// The name of the report file.
    pub output_file: String,

    /// The failing tests, as `package.name`.
    pub failed_tests: Vec<String>,
}

/// A single group in [`ReportData`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportGroupData<'a> {
    /// The group label.
    pub label: String,

    /// Whether any test in the group failed.
    pub failed: bool,

    /// Whether any test in the group was skipped.
    pub skipped: bool,

    /// Counts over the group.
    pub counts: GroupCounts,

    /// The tests in the group.
    pub tests: Vec<&'a TestStatus>,
}

impl ReportGroupData<'_> {
    /// Returns the CSS classes of this group's indicator.
    pub fn indicator_classes(&self) -> &'static str {
        match (self.failed, self.skipped) {
            (true, true) => "indicator failed skipped",
            (true, false) => "indicator failed",
            (false, true) => "indicator skipped",
            (false, false) => "indicator",
        }
    }
}

impl<'a> ReportData<'a> {
    /// Assembles report data from grouped tests.
    pub fn new(grouped: &GroupedReport<'a>, run: &ReassembledRun, cx: &ReportContext<'a>) -> Self {
        let groups = grouped
            .groups
            .iter()
            .map(|group| ReportGroupData {
                label: group.label.to_string(),
                failed: group.has_failure(),
                skipped: group.has_skip(),
                counts: group.counts,
                tests: group.tests.clone(),
            })
            .collect();

        Self {
            title: cx.title,
            indicator_width: cx.indicator_size.css_width(),
            indicator_height: cx.indicator_size.css_height(),
            groups,
            counts: grouped.totals,
            test_duration: format_duration(cx.duration),
            execution_date: cx.execution_date.format("%B %-d, %Y %H:%M:%S").to_string(),
            group_size: cx.group_size.get(),
            output_file: cx.output.file_name().unwrap_or(cx.output.as_str()).to_owned(),
            failed_tests: run.failed_tests.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Formats a duration rounded to the millisecond, e.g. `1.234s` or `2m5.000s`.
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    let minutes = millis / 60_000;
    let seconds = (millis % 60_000) as f64 / 1000.0;
    let mut out = String::new();
    if minutes > 0 {
        swrite!(out, "{minutes}m");
    }
    swrite!(out, "{seconds:.3}s");
    out
}

fn outcome_label(status: &TestStatus) -> &'static str {
    match status.outcome() {
        TestOutcome::Passed => "PASS",
        TestOutcome::Failed => "FAIL",
        TestOutcome::Skipped => "SKIP",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::{GroupingMode, group_tests};
    use crate::test_name::TestId;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(Duration::from_millis(0), "0.000s" ; "zero")]
    #[test_case(Duration::from_micros(1_234_567), "1.234s" ; "sub-millisecond truncated")]
    #[test_case(Duration::from_secs(125), "2m5.000s" ; "minutes")]
    fn durations(duration: Duration, expected: &str) {
        assert_eq!(format_duration(duration), expected);
    }

    #[test]
    fn report_data_from_groups() {
        let mut run = ReassembledRun::default();
        for (name, passed) in [("TestA", true), ("TestB", false)] {
            let id = TestId::new("pkg", name);
            run.packages
                .entry("pkg".to_owned())
                .or_default()
                .insert(id.clone());
            run.tests.insert(
                id,
                TestStatus {
                    package: "pkg".to_owned(),
                    test_name: name.to_owned(),
                    passed,
                    ..Default::default()
                },
            );
        }
        run.failed_tests.push(TestId::new("pkg", "TestB"));

        let grouped = group_tests(&run, GroupingMode::Package);
        let cx = ReportContext {
            title: "nightly",
            indicator_size: "20x16".parse().unwrap(),
            group_size: GroupSize::default(),
            output: Utf8Path::new("out/report.html"),
            duration: Duration::from_millis(1500),
            execution_date: DateTime::parse_from_rfc3339("2021-11-05T09:04:03+00:00").unwrap(),
        };
        let data = ReportData::new(&grouped, &run, &cx);

        assert_eq!(data.indicator_width, "20px");
        assert_eq!(data.indicator_height, "16px");
        assert_eq!(data.test_duration, "1.500s");
        assert_eq!(data.execution_date, "November 5, 2021 09:04:03");
        assert_eq!(data.output_file, "report.html");
        assert_eq!(data.failed_tests, vec!["pkg.TestB"]);
        assert_eq!(data.groups.len(), 1);
        assert_eq!(data.groups[0].label, "pkg");
        assert_eq!(data.groups[0].indicator_classes(), "indicator failed");
        assert_eq!(data.counts.passed, 1);
        assert_eq!(data.counts.failed, 1);
    }
}
