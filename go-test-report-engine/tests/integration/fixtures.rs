// Copyright (c) The go-test-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use chrono::{DateTime, FixedOffset};
use go_test_report_engine::{
    aggregator::{AggregatedRun, StatusAggregator},
    decoder::EventReader,
    errors::ReadEventsError,
    reassembly::{LogReassembler, ReassembledRun},
    test_name::TestNameFilter,
};
use std::{fs::File, io::BufReader};

pub(crate) fn fixture_path(name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../fixtures/go-test-json")
        .join(name)
}

pub(crate) fn fixed_clock() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2021-11-05T10:00:00+00:00").unwrap()
}

pub(crate) fn aggregate_fixture(name: &str) -> Result<AggregatedRun, ReadEventsError> {
    let file = File::open(fixture_path(name)).expect("fixture exists");
    let mut reader = EventReader::new(BufReader::new(file));
    let mut aggregator = StatusAggregator::new(TestNameFilter::default());
    aggregator.ingest(&mut reader, None)?;
    Ok(aggregator.finish())
}

pub(crate) fn reassemble_fixture(name: &str) -> ReassembledRun {
    let run = aggregate_fixture(name).expect("fixture is well-formed");
    let filter = TestNameFilter::default();
    LogReassembler::new(&filter)
        .with_clock(fixed_clock)
        .reassemble(run)
}
