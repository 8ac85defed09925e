// Copyright (c) The go-test-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::Parser;
use color_eyre::Result;
use go_test_report::{GoTestReportApp, OutputWriter};
use go_test_report_metadata::ReportExitCode;

fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = enable_ansi_support::enable_ansi_support();

    let app = match GoTestReportApp::try_parse() {
        Ok(app) => app,
        Err(error) => {
            // --help and --version are reported as errors too.
            let code = if error.use_stderr() {
                ReportExitCode::SETUP_ERROR
            } else {
                ReportExitCode::OK
            };
            let _ = error.print();
            std::process::exit(code)
        }
    };
    let output = app.init_output();

    match app.exec(output, &mut OutputWriter::default()) {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            error.display_to_stderr(&output.stderr_styles());
            std::process::exit(error.process_exit_code())
        }
    }
}
