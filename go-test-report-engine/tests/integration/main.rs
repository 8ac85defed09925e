// Copyright (c) The go-test-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests over recorded `go test -json` streams.

mod fixtures;

use camino::Utf8Path;
use fixtures::*;
use go_test_report_engine::{
    aggregator::TestOutcome,
    errors::ReadEventsError,
    grouping::{GroupCounts, GroupSize, GroupingMode, group_tests},
    position::{
        GoListResolver, PositionErrorPolicy, PositionResolver, apply_positions, resolve_positions,
    },
    reporter::{
        ReportContext, ReportData, junit_report, write_html_report_file, write_junit_report_file,
    },
    test_name::TestId,
};
use pretty_assertions::assert_eq;
use std::{num::NonZeroUsize, time::Duration};

#[test]
fn two_packages_outcomes() {
    let run = reassemble_fixture("two_packages.jsonl");

    let outcomes: Vec<_> = run
        .tests
        .values()
        .map(|status| {
            (
                status.package.as_str(),
                status.test_name.as_str(),
                status.outcome(),
                status.omitted,
            )
        })
        .collect();
    assert_eq!(
        outcomes,
        vec![
            ("example.com/calc", "TestAdd", TestOutcome::Passed, false),
            ("example.com/calc", "TestDiv", TestOutcome::Failed, true),
            ("example.com/calc", "TestDiv/by_zero", TestOutcome::Failed, false),
            ("example.com/calc", "TestDiv/ones", TestOutcome::Passed, false),
            ("example.com/calc", "TestPow", TestOutcome::Skipped, false),
            ("example.com/strs", "TestUpper", TestOutcome::Passed, true),
            ("example.com/strs", "TestUpper/ascii", TestOutcome::Passed, false),
        ]
    );
    assert_eq!(
        run.failed_tests,
        vec![TestId::new("example.com/calc", "TestDiv/by_zero")]
    );
    assert!(run.all_packages.contains("example.com/empty"));
    assert!(!run.packages.contains_key("example.com/empty"));

    let by_zero = &run.tests[&TestId::new("example.com/calc", "TestDiv/by_zero")];
    assert_eq!(
        by_zero.output,
        vec!["    calc_test.go:30: want error, got <nil>"]
    );
}

#[test]
fn two_packages_grouped_by_package() {
    let run = reassemble_fixture("two_packages.jsonl");
    let grouped = group_tests(&run, GroupingMode::Package);

    let labels: Vec<_> = grouped
        .groups
        .iter()
        .map(|group| group.label.to_string())
        .collect();
    assert_eq!(labels, vec!["example.com/calc", "example.com/strs"]);
    assert_eq!(
        grouped.groups[0].counts,
        GroupCounts {
            passed: 2,
            failed: 1,
            skipped: 1,
            total: 5,
        }
    );
    assert!(grouped.groups[0].has_failure());
    assert!(!grouped.groups[1].has_failure());
    assert_eq!(
        grouped.totals,
        GroupCounts {
            passed: 3,
            failed: 1,
            skipped: 1,
            total: 7,
        }
    );
}

#[test]
fn two_packages_grouped_by_size() {
    let run = reassemble_fixture("two_packages.jsonl");
    let size = GroupSize::new(NonZeroUsize::new(3).unwrap());
    let grouped = group_tests(&run, GroupingMode::FixedSize(size));

    let sizes: Vec<_> = grouped.groups.iter().map(|group| group.tests.len()).collect();
    assert_eq!(sizes, vec![3, 3, 1]);
    assert_eq!(grouped.groups[2].label.to_string(), "group 3");
    assert_eq!(grouped.totals.total, 7);
}

#[test]
fn structured_logs_follow_their_test() {
    let run = reassemble_fixture("structured_logs.jsonl");

    let create = &run.tests[&TestId::new("example.com/api", "TestCreate")];
    assert_eq!(
        create.output,
        vec![r#"-|warn ~ {"msg":"stray"}"#, "creating user"],
        "lines naming an unknown test stay put and untimed lines sort first"
    );

    let list_id = TestId::new("example.com/api", "TestList(lists users)");
    let list = &run.tests[&list_id];
    assert_eq!(list.title.as_deref(), Some("lists users"));
    assert_eq!(
        list.output,
        vec![
            "---\n2021-11-05 09:04:03.200 +0000|debug ~ \n{\n  \"RequestApi\": \"/users\"\n}\n---",
            r#"2021-11-05 09:04:03.500 +0000|info ~ {"msg":"listing"}"#,
        ]
    );
    assert_eq!(run.failed_tests, vec![list_id]);
    assert!(
        !run.tests
            .contains_key(&TestId::new("example.com/api", "TestList"))
    );
}

#[test]
fn malformed_line_is_reported() {
    let err = aggregate_fixture("malformed.jsonl").expect_err("third line is not JSON");
    match err {
        ReadEventsError::Malformed(err) => {
            assert_eq!(err.line_number(), 3);
            assert_eq!(err.line(), "FAIL\texample.com/calc [build failed]");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn writes_html_and_junit() {
    let run = reassemble_fixture("two_packages.jsonl");
    let grouped = group_tests(&run, GroupingMode::Package);
    let dir = camino_tempfile::tempdir().unwrap();
    let output = dir.path().join("reports/test_report.html");
    let cx = ReportContext {
        title: "calc & strs",
        indicator_size: "24".parse().unwrap(),
        group_size: GroupSize::default(),
        output: &output,
        duration: Duration::from_millis(250),
        execution_date: fixed_clock(),
    };
    let data = ReportData::new(&grouped, &run, &cx);
    write_html_report_file(&data, &output).expect("HTML report written");

    let html = std::fs::read_to_string(&output).unwrap();
    assert!(html.contains("<h1>calc &amp; strs</h1>"));
    assert!(html.contains("<span>Tests: 7</span>"));
    assert!(html.contains("want error, got &lt;nil&gt;"));
    assert!(html.contains("data-group=\"group-1\""));

    let junit_path = dir.path().join("junit.xml");
    let report = junit_report(&run, "go-test-report", fixed_clock(), cx.duration);
    write_junit_report_file(&report, &junit_path).expect("JUnit report written");
    let xml = std::fs::read_to_string(&junit_path).unwrap();
    assert!(xml.contains(r#"name="example.com/empty""#), "{xml}");
    assert!(xml.contains(r#"name="TestDiv/by_zero""#), "{xml}");
}

#[cfg(unix)]
#[test]
fn positions_from_go_list() {
    use std::os::unix::fs::PermissionsExt;

    let dir = camino_tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("calc_test.go"),
        "package calc\n\nimport \"testing\"\n\nfunc TestAdd(t *testing.T) {\n}\n\nfunc TestDiv(t *testing.T) {\n}\n",
    )
    .unwrap();
    let go = dir.path().join("go");
    std::fs::write(
        &go,
        format!(
            "#!/bin/sh\n[ \"$3\" = example.com/calc ] || {{ echo \"no package $3\" >&2; exit 1; }}\necho '{{\"Dir\":\"{}\",\"TestGoFiles\":[\"calc_test.go\"]}}'\n",
            dir.path()
        ),
    )
    .unwrap();
    std::fs::set_permissions(&go, std::fs::Permissions::from_mode(0o755)).unwrap();

    let resolver = GoListResolver::new().with_go(go.as_str());
    let positions = resolver.resolve("example.com/calc").expect("lookup succeeds");
    assert_eq!(positions["TestDiv"].to_string(), "calc_test.go:8:1");

    let mut run = reassemble_fixture("two_packages.jsonl");
    let packages: Vec<String> = run.packages.keys().cloned().collect();
    let map = resolve_positions(
        &resolver,
        packages.iter().map(String::as_str),
        PositionErrorPolicy::Warn,
    )
    .expect("warn policy never fails");
    assert!(!map.contains_key("example.com/strs"));
    apply_positions(run.tests.values_mut(), &map);

    let by_zero = &run.tests[&TestId::new("example.com/calc", "TestDiv/by_zero")];
    assert_eq!(
        by_zero.position.as_ref().map(ToString::to_string).as_deref(),
        Some("calc_test.go:8:1")
    );
    let upper = &run.tests[&TestId::new("example.com/strs", "TestUpper")];
    assert_eq!(upper.position, None);

    let err = resolve_positions(
        &resolver,
        ["example.com/strs"],
        PositionErrorPolicy::Fail,
    )
    .expect_err("fail policy propagates");
    assert_eq!(err.package(), "example.com/strs");
}

#[test]
fn missing_go_binary() {
    let resolver = GoListResolver::new().with_go(
        Utf8Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("no-such-go")
            .into_string(),
    );
    let map = resolve_positions(&resolver, ["example.com/calc"], PositionErrorPolicy::Warn)
        .expect("warn policy never fails");
    assert!(map.is_empty());
}
