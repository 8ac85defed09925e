// Copyright (c) The go-test-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError, Result,
    output::{OutputContext, OutputOpts, OutputWriter, clap_styles},
};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use go_test_report_engine::{
    aggregator::StatusAggregator,
    config::{IndicatorSize, ReportConfig},
    decoder::EventReader,
    grouping::{GroupSize, GroupingKind, GroupingMode, group_tests},
    position::{GoListResolver, PositionErrorPolicy, apply_positions, resolve_positions},
    reassembly::LogReassembler,
    reporter::{
        ReportContext, ReportData, format_duration, junit_report, write_html_report_file,
        write_junit_report_file,
    },
    test_name::TestNameFilter,
    write_str::WriteStr,
};
use go_test_report_metadata::ReportExitCode;
use std::{
    io::{BufRead, IsTerminal},
    time::Instant,
};
use tracing::debug;

/// Turn `go test -json` output into an HTML test report.
///
/// The event stream is read from stdin, for example `go test -json ./... | go-test-report`.
#[derive(Debug, Parser)]
#[command(
    name = "go-test-report",
    version,
    styles = clap_styles::style(),
    max_term_width = 100,
    args_conflicts_with_subcommands = true
)]
pub struct GoTestReportApp {
    #[clap(flatten)]
    output: OutputOpts,

    #[clap(flatten)]
    config_opts: ConfigOpts,

    #[clap(flatten)]
    report_opts: ReportOpts,

    #[clap(subcommand)]
    command: Option<Command>,
}

impl GoTestReportApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        match self.command {
            Some(Command::Version) => {
                let mut stdout = output_writer.stdout_writer();
                writeln!(stdout, "go-test-report v{}", env!("CARGO_PKG_VERSION"))
                    .and_then(|()| stdout.write_str_flush())
                    .map_err(|err| ExpectedError::WriteStdoutError { err })?;
                Ok(ReportExitCode::OK)
            }
            None => {
                let stdin = std::io::stdin();
                if stdin.is_terminal() {
                    return Err(ExpectedError::MissingStdinPipe);
                }

                let cwd = current_dir()?;
                let config = self.config_opts.make_config(&cwd)?;
                let plan = self.report_opts.plan(&config);
                plan.execute(stdin.lock(), &cwd, output.verbose, output_writer)?;
                Ok(ReportExitCode::OK)
            }
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the version of go-test-report
    Version,
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Config options")]
struct ConfigOpts {
    /// Config file [default: .config/go-test-report.toml]
    #[arg(long, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,
}

impl ConfigOpts {
    fn make_config(&self, cwd: &Utf8Path) -> Result<ReportConfig> {
        let config = ReportConfig::from_sources(cwd, self.config_file.as_deref())?;
        debug!("loaded config layered from {}", config.config_file());
        Ok(config)
    }
}

/// Command-line overrides for the `[report]` and `[positions]` config sections.
#[derive(Debug, Args)]
#[command(next_help_heading = "Report options")]
struct ReportOpts {
    /// Title of the report
    #[arg(short, long, value_name = "TITLE")]
    title: Option<String>,

    /// Size of each group indicator, in pixels: a single number or WIDTHxHEIGHT
    #[arg(short = 's', long = "size", value_name = "SIZE")]
    indicator_size: Option<IndicatorSize>,

    /// Number of tests per group when grouping by fixed size
    #[arg(short, long, alias = "groupSize", value_name = "N")]
    group_size: Option<GroupSize>,

    /// How to group tests: package or fixed-size
    #[arg(long, value_name = "MODE")]
    grouping: Option<GroupingKind>,

    /// HTML report file [default: test_report.html]
    #[arg(short, long, value_name = "PATH")]
    output: Option<Utf8PathBuf>,

    /// Also write a JUnit XML report to this file
    #[arg(long, value_name = "PATH")]
    junit: Option<Utf8PathBuf>,

    /// Do not look up the source positions of test functions
    #[arg(long)]
    no_positions: bool,
}

impl ReportOpts {
    fn plan(self, config: &ReportConfig) -> ReportPlan {
        let report = config.report();
        let positions = config.positions();
        let group_size = self.group_size.unwrap_or(report.group_size);

        ReportPlan {
            title: self.title.unwrap_or_else(|| report.title.clone()),
            indicator_size: self.indicator_size.unwrap_or(report.indicator_size),
            group_size,
            grouping: self
                .grouping
                .unwrap_or(report.grouping)
                .with_size(group_size),
            output: self.output.unwrap_or_else(|| report.output.clone()),
            junit: self.junit.or_else(|| report.junit.clone()),
            parallel_marker: config.events().parallel_marker.clone(),
            positions: (positions.enabled && !self.no_positions).then_some(positions.on_error),
        }
    }
}

/// Settings for a single report, after layering flags on top of the config.
#[derive(Clone, Debug)]
struct ReportPlan {
    title: String,
    indicator_size: IndicatorSize,
    group_size: GroupSize,
    grouping: GroupingMode,
    output: Utf8PathBuf,
    junit: Option<Utf8PathBuf>,
    parallel_marker: String,
    // None if positions are disabled.
    positions: Option<PositionErrorPolicy>,
}

impl ReportPlan {
    fn execute(
        &self,
        input: impl BufRead,
        cwd: &Utf8Path,
        verbose: bool,
        output_writer: &mut OutputWriter,
    ) -> Result<()> {
        let start = Instant::now();
        let execution_date = Local::now().fixed_offset();
        let name_filter = TestNameFilter::new(self.parallel_marker.as_str());

        let mut aggregator = StatusAggregator::new(name_filter.clone());
        let mut reader = EventReader::new(input);
        {
            let mut stdout = output_writer.stdout_writer();
            let echo = if verbose {
                Some(&mut stdout as &mut dyn WriteStr)
            } else {
                None
            };
            aggregator.ingest(&mut reader, echo)?;
        }

        let mut run = LogReassembler::new(&name_filter).reassemble(aggregator.finish());

        if let Some(policy) = self.positions {
            let resolver = GoListResolver::new().with_cwd(cwd);
            let positions =
                resolve_positions(&resolver, run.packages.keys().map(String::as_str), policy)?;
            apply_positions(run.tests.values_mut(), &positions);
        }

        let grouped = group_tests(&run, self.grouping);
        debug!(
            "{} tests in {} groups, {} failed",
            grouped.totals.total,
            grouped.groups.len(),
            grouped.totals.failed,
        );

        let cx = ReportContext {
            title: &self.title,
            indicator_size: self.indicator_size,
            group_size: self.group_size,
            output: &self.output,
            duration: start.elapsed(),
            execution_date,
        };
        let data = ReportData::new(&grouped, &run, &cx);
        write_html_report_file(&data, &self.output)
            .map_err(|err| ExpectedError::write_report_error(&self.output, err))?;

        if let Some(junit) = &self.junit {
            let report = junit_report(&run, &self.title, execution_date, cx.duration);
            write_junit_report_file(&report, junit)
                .map_err(|err| ExpectedError::write_report_error(junit, err))?;
        }

        let mut stdout = output_writer.stdout_writer();
        writeln!(
            stdout,
            "[go-test-report] finished in {}",
            format_duration(start.elapsed())
        )
        .and_then(|()| stdout.write_str_flush())
        .map_err(|err| ExpectedError::WriteStdoutError { err })
    }
}

fn current_dir() -> Result<Utf8PathBuf> {
    let cwd =
        std::env::current_dir().map_err(|err| ExpectedError::CurrentDirUnavailable { err })?;
    Utf8PathBuf::try_from(cwd).map_err(|err| ExpectedError::CurrentDirInvalidUtf8 {
        path: err.into_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use std::io::Cursor;

    #[test]
    fn test_argument_parsing() {
        use clap::error::ErrorKind::{self, *};

        let valid: &[&'static str] = &[
            // ---
            // Basic commands
            // ---
            "go-test-report",
            "go-test-report version",
            "go-test-report --version",
            // ---
            // Report options
            // ---
            "go-test-report -t Nightly",
            "go-test-report --title 'Nightly run'",
            "go-test-report -s 24",
            "go-test-report --size 20x16",
            "go-test-report --size 20X16",
            "go-test-report -g 5",
            "go-test-report --group-size 5",
            "go-test-report --groupSize 5",
            "go-test-report --grouping fixed-size -g 10",
            "go-test-report --grouping package",
            "go-test-report -o out/report.html",
            "go-test-report --junit out/junit.xml",
            "go-test-report --no-positions",
            "go-test-report --config-file ci.toml",
            // ---
            // Output options
            // ---
            "go-test-report -v",
            "go-test-report --verbose --color never",
            "go-test-report --color=always -t x",
        ];

        let invalid: &[(&'static str, ErrorKind)] = &[
            // ---
            // Bad values
            // ---
            ("go-test-report -s 1x2x3", ValueValidation),
            ("go-test-report -s wide", ValueValidation),
            ("go-test-report -g 0", ValueValidation),
            ("go-test-report --grouping random", ValueValidation),
            ("go-test-report --color sometimes", InvalidValue),
            // ---
            // Unknown arguments and subcommands
            // ---
            ("go-test-report --bogus", UnknownArgument),
            ("go-test-report version -t x", UnknownArgument),
            ("go-test-report frobnicate", InvalidSubcommand),
        ];

        // Unset env vars that clap reads, since they can conflict with try_parse_from below.
        for k in ["GO_TEST_REPORT_VERBOSE", "CARGO_TERM_COLOR"] {
            // SAFETY: this test does not spawn threads that read the environment.
            unsafe { std::env::remove_var(k) };
        }

        for valid_args in valid {
            let cmd = shell_words::split(valid_args).expect("valid command line");
            match GoTestReportApp::try_parse_from(cmd) {
                Ok(_) => {}
                Err(error) if error.kind() == DisplayVersion => {}
                Err(error) => {
                    panic!("{valid_args} should have successfully parsed, but didn't: {error}");
                }
            }
        }

        for &(invalid_args, kind) in invalid {
            match GoTestReportApp::try_parse_from(
                shell_words::split(invalid_args).expect("valid command"),
            ) {
                Ok(_) => {
                    panic!("{invalid_args} should have errored out but successfully parsed");
                }
                Err(error) => {
                    let actual_kind = error.kind();
                    if kind != actual_kind {
                        panic!(
                            "{invalid_args} should error with kind {kind:?}, but actual kind was {actual_kind:?}",
                        );
                    }
                }
            }
        }
    }

    fn plan_for(args: &str, config: &ReportConfig) -> ReportPlan {
        let app = GoTestReportApp::try_parse_from(shell_words::split(args).unwrap())
            .unwrap_or_else(|error| panic!("{args} should parse: {error}"));
        app.report_opts.plan(config)
    }

    #[test]
    fn flags_override_config() {
        let config = ReportConfig::default_config();

        let plan = plan_for("go-test-report", &config);
        assert_eq!(plan.title, "go-test-report");
        assert_eq!(plan.grouping, GroupingMode::Package);
        assert_eq!(plan.output, "test_report.html");
        assert_eq!(plan.junit, None);
        assert_eq!(plan.parallel_marker, "__parallel__");
        assert_eq!(plan.positions, Some(PositionErrorPolicy::Warn));

        let plan = plan_for(
            "go-test-report -t Nightly --grouping fixed-size --groupSize 3 -o r.html \
             --junit j.xml --no-positions -s 10x12",
            &config,
        );
        assert_eq!(plan.title, "Nightly");
        assert_eq!(plan.group_size.get(), 3);
        assert_eq!(plan.grouping, GroupingMode::FixedSize(plan.group_size));
        assert_eq!(plan.output, "r.html");
        assert_eq!(plan.junit.as_deref(), Some(Utf8Path::new("j.xml")));
        assert_eq!(plan.indicator_size.width, 10);
        assert_eq!(plan.indicator_size.height, 12);
        assert_eq!(plan.positions, None);
    }

    fn fixture(name: &str) -> String {
        let path = Utf8Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../fixtures/go-test-json")
            .join(name);
        std::fs::read_to_string(&path).unwrap_or_else(|err| panic!("reading {path}: {err}"))
    }

    fn plan_in(dir: &Utf8TempDir) -> ReportPlan {
        let mut plan = plan_for("go-test-report --no-positions", &ReportConfig::default_config());
        plan.output = dir.path().join("report/test_report.html");
        plan.junit = Some(dir.path().join("report/junit.xml"));
        plan
    }

    #[test]
    fn execute_writes_reports() {
        let dir = camino_tempfile::tempdir().unwrap();
        let plan = plan_in(&dir);
        let mut writer = OutputWriter::Test {
            stdout: String::new(),
        };

        plan.execute(
            Cursor::new(fixture("two_packages.jsonl")),
            dir.path(),
            false,
            &mut writer,
        )
        .expect("report generated");

        let OutputWriter::Test { stdout } = writer else {
            unreachable!()
        };
        assert!(
            stdout.starts_with("[go-test-report] finished in "),
            "{stdout}"
        );
        let html = std::fs::read_to_string(&plan.output).unwrap();
        assert!(html.contains("<title>go-test-report</title>"));
        let junit = std::fs::read_to_string(plan.junit.as_ref().unwrap()).unwrap();
        assert!(junit.contains("example.com/strs"));
    }

    #[test]
    fn execute_verbose_echoes_input() {
        let dir = camino_tempfile::tempdir().unwrap();
        let plan = plan_in(&dir);
        let input = fixture("structured_logs.jsonl");
        let mut writer = OutputWriter::Test {
            stdout: String::new(),
        };

        plan.execute(Cursor::new(input.as_str()), dir.path(), true, &mut writer)
            .expect("report generated");

        let OutputWriter::Test { stdout } = writer else {
            unreachable!()
        };
        let (echoed, finished) = stdout
            .rsplit_once("[go-test-report]")
            .expect("finished line present");
        let expected: String = input
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| format!("{line}\n"))
            .collect();
        assert_eq!(echoed, expected);
        assert!(finished.starts_with(" finished in "));
    }

    #[test]
    fn execute_malformed_input() {
        let dir = camino_tempfile::tempdir().unwrap();
        let plan = plan_in(&dir);
        let mut writer = OutputWriter::Test {
            stdout: String::new(),
        };

        let error = plan
            .execute(
                Cursor::new(fixture("malformed.jsonl")),
                dir.path(),
                false,
                &mut writer,
            )
            .expect_err("third line is malformed");
        assert_eq!(error.process_exit_code(), ReportExitCode::MALFORMED_EVENT);
        assert!(!plan.output.exists(), "no report for malformed input");
    }
}
