// Copyright (c) The go-test-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Partitioning finished tests into report groups.

use crate::{
    aggregator::{TestOutcome, TestStatus},
    errors::{GroupSizeParseError, GroupingKindParseError},
    reassembly::ReassembledRun,
};
use serde::{Deserialize, Serialize};
use std::{fmt, num::NonZeroUsize, str::FromStr};

/// The number of tests per group in fixed-size grouping.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GroupSize(NonZeroUsize);

impl GroupSize {
    /// The default group size.
    pub const DEFAULT: Self = Self(NonZeroUsize::new(20).unwrap());

    /// Creates a new group size.
    pub fn new(size: NonZeroUsize) -> Self {
        Self(size)
    }

    /// Returns the size.
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for GroupSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for GroupSize {
    type Err = GroupSizeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<usize>() {
            Ok(size) => NonZeroUsize::new(size)
                .map(Self)
                .ok_or_else(|| GroupSizeParseError::new(s, "group size may not be 0")),
            Err(err) => Err(GroupSizeParseError::new(s, err.to_string())),
        }
    }
}

impl fmt::Display for GroupSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for GroupSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl serde::de::Visitor<'_> for V {
            type Value = GroupSize;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "a positive integer")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse().map_err(|_| {
                    serde::de::Error::invalid_value(serde::de::Unexpected::Str(v), &self)
                })
            }

            // TOML integers are i64.
            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                usize::try_from(v)
                    .ok()
                    .and_then(NonZeroUsize::new)
                    .map(GroupSize)
                    .ok_or_else(|| {
                        serde::de::Error::invalid_value(serde::de::Unexpected::Signed(v), &self)
                    })
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                usize::try_from(v)
                    .ok()
                    .and_then(NonZeroUsize::new)
                    .map(GroupSize)
                    .ok_or_else(|| {
                        serde::de::Error::invalid_value(serde::de::Unexpected::Unsigned(v), &self)
                    })
            }
        }

        deserializer.deserialize_any(V)
    }
}

/// How tests are grouped, without parameters.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum GroupingKind {
    /// One group per package.
    #[default]
    Package,

    /// Groups of a fixed number of tests, across packages.
    FixedSize,
}

impl GroupingKind {
    /// Returns the string values accepted for this type.
    pub fn variants() -> &'static [&'static str] {
        &["package", "fixed-size"]
    }

    /// Attaches the group size, used only by [`Self::FixedSize`].
    pub fn with_size(self, size: GroupSize) -> GroupingMode {
        match self {
            Self::Package => GroupingMode::Package,
            Self::FixedSize => GroupingMode::FixedSize(size),
        }
    }
}

impl FromStr for GroupingKind {
    type Err = GroupingKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "package" => Ok(Self::Package),
            "fixed-size" => Ok(Self::FixedSize),
            other => Err(GroupingKindParseError::new(other)),
        }
    }
}

impl fmt::Display for GroupingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Package => write!(f, "package"),
            Self::FixedSize => write!(f, "fixed-size"),
        }
    }
}

/// How tests are grouped.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GroupingMode {
    /// One group per package, in package order.
    Package,

    /// All tests sorted by name and chunked.
    FixedSize(GroupSize),
}

/// Counts over a set of tests.
///
/// Omitted tests count towards `total` but not towards `passed` or `failed`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupCounts {
    /// Tests that passed.
    pub passed: usize,

    /// Tests that failed.
    pub failed: usize,

    /// Tests that were skipped.
    pub skipped: usize,

    /// Every test, including omitted ones.
    pub total: usize,
}

impl GroupCounts {
    fn add(&mut self, status: &TestStatus) {
        self.total += 1;
        match status.outcome() {
            TestOutcome::Skipped => self.skipped += 1,
            _ if status.omitted => {}
            TestOutcome::Passed => self.passed += 1,
            TestOutcome::Failed => self.failed += 1,
        }
    }

    fn merge(&mut self, other: &Self) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.total += other.total;
    }
}

/// The label of a group.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GroupLabel {
    /// The package of a package group.
    Package(String),

    /// The 0-based index of a fixed-size group.
    Index(usize),
}

impl fmt::Display for GroupLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Package(package) => f.write_str(package),
            Self::Index(idx) => write!(f, "group {}", idx + 1),
        }
    }
}

/// A bucket of tests shown together in the report.
#[derive(Clone, Debug)]
pub struct ReportGroup<'a> {
    /// The label.
    pub label: GroupLabel,

    /// The tests, sorted by name.
    pub tests: Vec<&'a TestStatus>,

    /// Counts over `tests`.
    pub counts: GroupCounts,
}

impl<'a> ReportGroup<'a> {
    fn new(label: GroupLabel, tests: Vec<&'a TestStatus>) -> Self {
        let mut counts = GroupCounts::default();
        for status in &tests {
            counts.add(status);
        }
        Self {
            label,
            tests,
            counts,
        }
    }

    /// Returns true if any test in the group failed, omitted or not.
    pub fn has_failure(&self) -> bool {
        self.tests
            .iter()
            .any(|status| status.outcome() == TestOutcome::Failed)
    }

    /// Returns true if any test in the group was skipped.
    pub fn has_skip(&self) -> bool {
        self.tests.iter().any(|status| status.skipped)
    }
}

/// Groups plus totals.
#[derive(Clone, Debug)]
pub struct GroupedReport<'a> {
    /// The groups, in display order.
    pub groups: Vec<ReportGroup<'a>>,

    /// The sum of every group's counts.
    pub totals: GroupCounts,
}

/// Partitions the tests of a run into groups.
///
/// The result depends only on the contents of `run`.
pub fn group_tests(run: &ReassembledRun, mode: GroupingMode) -> GroupedReport<'_> {
    let groups: Vec<_> = match mode {
        GroupingMode::Package => run
            .packages
            .iter()
            .map(|(package, ids)| {
                let mut tests: Vec<_> = ids.iter().filter_map(|id| run.tests.get(id)).collect();
                tests.sort_by(|a, b| a.test_name.cmp(&b.test_name));
                ReportGroup::new(GroupLabel::Package(package.clone()), tests)
            })
            .collect(),
        GroupingMode::FixedSize(size) => {
            let mut tests: Vec<_> = run.tests.values().collect();
            tests.sort_by(|a, b| {
                a.test_name
                    .cmp(&b.test_name)
                    .then_with(|| a.package.cmp(&b.package))
            });
            tests
                .chunks(size.get())
                .enumerate()
                .map(|(idx, chunk)| ReportGroup::new(GroupLabel::Index(idx), chunk.to_vec()))
                .collect()
        }
    };

    let mut totals = GroupCounts::default();
    for group in &groups {
        totals.merge(&group.counts);
    }
    GroupedReport { groups, totals }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_name::TestId;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn status(package: &str, name: &str, outcome: TestOutcome) -> TestStatus {
        TestStatus {
            package: package.to_owned(),
            test_name: name.to_owned(),
            passed: outcome == TestOutcome::Passed,
            skipped: outcome == TestOutcome::Skipped,
            ..Default::default()
        }
    }

    fn run_of(statuses: Vec<TestStatus>) -> ReassembledRun {
        let mut run = ReassembledRun::default();
        for status in statuses {
            let id = TestId::new(status.package.as_str(), status.test_name.as_str());
            run.all_packages.insert(id.package.clone());
            run.packages
                .entry(id.package.clone())
                .or_default()
                .insert(id.clone());
            run.tests.insert(id, status);
        }
        run
    }

    fn labels(report: &GroupedReport<'_>) -> Vec<String> {
        report.groups.iter().map(|g| g.label.to_string()).collect()
    }

    fn names(group: &ReportGroup<'_>) -> Vec<String> {
        group.tests.iter().map(|t| t.test_name.clone()).collect()
    }

    #[test]
    fn fixed_size_groups() {
        let run = run_of(vec![
            status("p", "TestA", TestOutcome::Passed),
            status("p", "TestB", TestOutcome::Failed),
            status("q", "TestC", TestOutcome::Passed),
            status("q", "TestD", TestOutcome::Skipped),
        ]);
        let size = "2".parse().expect("valid size");
        let report = group_tests(&run, GroupingMode::FixedSize(size));

        assert_eq!(report.groups.len(), 2);
        assert_eq!(
            report.totals,
            GroupCounts {
                passed: 2,
                failed: 1,
                skipped: 1,
                total: 4,
            }
        );
        assert_eq!(names(&report.groups[0]), vec!["TestA", "TestB"]);
        assert!(report.groups[0].has_failure());
        assert!(!report.groups[0].has_skip());
        assert!(!report.groups[1].has_failure());
        assert!(report.groups[1].has_skip());
        assert_eq!(labels(&report), vec!["group 1", "group 2"]);
    }

    #[test]
    fn last_fixed_size_group_is_short() {
        let run = run_of(
            (0..5)
                .map(|i| status("p", &format!("Test{i}"), TestOutcome::Passed))
                .collect(),
        );
        let size = GroupSize::new(NonZeroUsize::new(2).expect("size is non-zero"));
        let report = group_tests(&run, GroupingKind::FixedSize.with_size(size));
        let sizes: Vec<_> = report.groups.iter().map(|g| g.tests.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn package_groups_are_sorted() {
        let run = run_of(vec![
            status("zeta", "TestB", TestOutcome::Passed),
            status("alpha", "TestZ", TestOutcome::Passed),
            status("alpha", "TestA", TestOutcome::Failed),
            status("mid", "Test", TestOutcome::Skipped),
        ]);
        let first = group_tests(&run, GroupingMode::Package);
        let second = group_tests(&run, GroupingMode::Package);

        assert_eq!(labels(&first), vec!["alpha", "mid", "zeta"]);
        assert_eq!(names(&first.groups[0]), vec!["TestA", "TestZ"]);
        for (a, b) in first.groups.iter().zip(&second.groups) {
            assert_eq!(a.label, b.label);
            assert_eq!(names(a), names(b));
            assert_eq!(a.counts, b.counts);
        }
    }

    #[test]
    fn omitted_tests_are_members_but_not_counted() {
        let mut parent = status("p", "TestP", TestOutcome::Failed);
        parent.omitted = true;
        let run = run_of(vec![
            parent,
            status("p", "TestP/Child", TestOutcome::Failed),
            status("p", "TestQ", TestOutcome::Passed),
        ]);
        let report = group_tests(&run, GroupingMode::Package);
        let group = &report.groups[0];
        assert_eq!(group.tests.len(), 3);
        assert_eq!(
            group.counts,
            GroupCounts {
                passed: 1,
                failed: 1,
                skipped: 0,
                total: 3,
            }
        );
        assert!(group.has_failure());
    }

    #[test_case("1", Some(1) ; "one")]
    #[test_case(" 20 ", Some(20) ; "whitespace")]
    #[test_case("0", None ; "zero")]
    #[test_case("-3", None ; "negative")]
    #[test_case("ten", None ; "not a number")]
    fn parse_group_size(input: &str, expected: Option<usize>) {
        let parsed = input.parse::<GroupSize>().ok().map(GroupSize::get);
        assert_eq!(parsed, expected);
    }

    #[test_case("package", Some(GroupingKind::Package) ; "package")]
    #[test_case("fixed-size", Some(GroupingKind::FixedSize) ; "fixed size")]
    #[test_case("fixed", None ; "unknown")]
    fn parse_grouping_kind(input: &str, expected: Option<GroupingKind>) {
        assert_eq!(input.parse::<GroupingKind>().ok(), expected);
    }
}
