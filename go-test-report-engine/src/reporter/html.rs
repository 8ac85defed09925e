// Copyright (c) The go-test-report Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{ReportData, ReportGroupData, format_duration, outcome_label};
use crate::{
    aggregator::TestStatus,
    errors::WriteReportError,
    write_str::{HtmlEscaped, WriteStr},
};
use camino::Utf8Path;
use std::{fs::File, io::BufWriter, time::Duration};

static STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 2em; color: #24292e; }
header h1 { margin-bottom: 0.2em; }
.summary span { margin-right: 1.5em; }
.indicators { display: flex; flex-wrap: wrap; gap: 4px; margin: 1.5em 0; }
.indicator { width: var(--indicator-width); height: var(--indicator-height); background: #2ea44f; cursor: pointer; border: 0; padding: 0; }
.indicator.skipped { background: #dbab09; }
.indicator.failed { background: #cb2431; }
.group[hidden], .output[hidden] { display: none; }
.test { padding: 0.3em 0; border-bottom: 1px solid #e1e4e8; cursor: pointer; }
.test .status { display: inline-block; width: 3.5em; font-weight: bold; }
.test.failed .status { color: #cb2431; }
.test.skipped .status { color: #dbab09; }
.test.passed .status { color: #2ea44f; }
.test.omitted { opacity: 0.6; }
.test .position { color: #6a737d; margin-left: 1em; }
.output { background: #f6f8fa; padding: 0.5em; overflow-x: auto; cursor: auto; }
"#;

static SCRIPT: &str = r#"
(function () {
  document.querySelectorAll('.indicator').forEach(function (indicator) {
    indicator.addEventListener('click', function () {
      var target = document.getElementById(indicator.dataset.group);
      document.querySelectorAll('.group').forEach(function (group) {
        group.hidden = group !== target || !group.hidden;
      });
    });
  });
  document.querySelectorAll('.test').forEach(function (test) {
    test.addEventListener('click', function (event) {
      if (event.target.closest('.output')) {
        return;
      }
      var output = test.querySelector('.output');
      if (output) {
        output.hidden = !output.hidden;
      }
    });
  });
})();
"#;

/// Writes `data` as a self-contained HTML document.
pub fn write_html_report(
    data: &ReportData<'_>,
    mut out: impl WriteStr,
) -> Result<(), WriteReportError> {
    let json = embedded_json(data)?;
    write_document(data, &json, &mut out).map_err(WriteReportError::Io)?;
    out.write_str_flush().map_err(WriteReportError::Io)
}

/// Writes `data` as HTML to `path`, creating parent directories as needed.
pub fn write_html_report_file(
    data: &ReportData<'_>,
    path: &Utf8Path,
) -> Result<(), WriteReportError> {
    let json = embedded_json(data)?;

    if let Some(dir) = path.parent().filter(|dir| !dir.as_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|error| WriteReportError::Fs {
            file: dir.to_path_buf(),
            error,
        })?;
    }
    let fs_error = |error| WriteReportError::Fs {
        file: path.to_path_buf(),
        error,
    };
    let file = File::create(path).map_err(fs_error)?;
    let mut out = BufWriter::new(file);
    write_document(data, &json, &mut out).map_err(fs_error)?;
    out.write_str_flush().map_err(fs_error)
}

fn embedded_json(data: &ReportData<'_>) -> Result<String, WriteReportError> {
    let json = serde_json::to_string(data).map_err(WriteReportError::Json)?;
    // The JSON lives inside a <script> element, which ends at the first `</`.
    Ok(json.replace("</", "<\\/"))
}

fn write_document(
    data: &ReportData<'_>,
    json: &str,
    out: &mut dyn WriteStr,
) -> std::io::Result<()> {
    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"en\">")?;
    writeln!(out, "<head>")?;
    writeln!(out, "<meta charset=\"utf-8\">")?;
    write!(out, "<title>")?;
    HtmlEscaped::new(&mut *out).write_str(data.title)?;
    writeln!(out, "</title>")?;
    writeln!(out, "<style>{STYLE}</style>")?;
    writeln!(out, "</head>")?;

    write!(out, "<body style=\"--indicator-width: ")?;
    HtmlEscaped::new(&mut *out).write_str(&data.indicator_width)?;
    write!(out, "; --indicator-height: ")?;
    HtmlEscaped::new(&mut *out).write_str(&data.indicator_height)?;
    writeln!(out, ";\">")?;

    write_header(data, out)?;

    writeln!(out, "<nav class=\"indicators\">")?;
    for (idx, group) in data.groups.iter().enumerate() {
        write!(
            out,
            "<button class=\"{}\" data-group=\"group-{idx}\" title=\"",
            group.indicator_classes()
        )?;
        HtmlEscaped::new(&mut *out).write_str(&group.label)?;
        writeln!(out, "\"></button>")?;
    }
    writeln!(out, "</nav>")?;

    for (idx, group) in data.groups.iter().enumerate() {
        write_group(idx, group, out)?;
    }

    writeln!(
        out,
        "<script type=\"application/json\" id=\"report-data\">{json}</script>"
    )?;
    writeln!(out, "<script>{SCRIPT}</script>")?;
    writeln!(out, "</body>")?;
    writeln!(out, "</html>")
}

fn write_header(data: &ReportData<'_>, out: &mut dyn WriteStr) -> std::io::Result<()> {
    writeln!(out, "<header>")?;
    write!(out, "<h1>")?;
    HtmlEscaped::new(&mut *out).write_str(data.title)?;
    writeln!(out, "</h1>")?;
    write!(out, "<p class=\"date\">")?;
    HtmlEscaped::new(&mut *out).write_str(&data.execution_date)?;
    writeln!(out, "</p>")?;
    writeln!(out, "<p class=\"summary\">")?;
    writeln!(out, "<span>Tests: {}</span>", data.counts.total)?;
    writeln!(out, "<span>Passed: {}</span>", data.counts.passed)?;
    writeln!(out, "<span>Skipped: {}</span>", data.counts.skipped)?;
    writeln!(out, "<span>Failed: {}</span>", data.counts.failed)?;
    write!(out, "<span>Duration: ")?;
    HtmlEscaped::new(&mut *out).write_str(&data.test_duration)?;
    writeln!(out, "</span>")?;
    writeln!(out, "</p>")?;
    writeln!(out, "</header>")
}

fn write_group(
    idx: usize,
    group: &ReportGroupData<'_>,
    out: &mut dyn WriteStr,
) -> std::io::Result<()> {
    writeln!(out, "<section class=\"group\" id=\"group-{idx}\" hidden>")?;
    write!(out, "<h2>")?;
    HtmlEscaped::new(&mut *out).write_str(&group.label)?;
    writeln!(
        out,
        " <small>({} passed, {} skipped, {} failed)</small></h2>",
        group.counts.passed, group.counts.skipped, group.counts.failed
    )?;
    for status in &group.tests {
        write_test(status, out)?;
    }
    writeln!(out, "</section>")
}

fn write_test(status: &TestStatus, out: &mut dyn WriteStr) -> std::io::Result<()> {
    let mut classes = vec!["test", status.outcome().as_str()];
    if status.omitted {
        classes.push("omitted");
    }
    writeln!(out, "<div class=\"{}\">", classes.join(" "))?;
    writeln!(out, "<span class=\"status\">{}</span>", outcome_label(status))?;
    write!(out, "<span class=\"name\">")?;
    HtmlEscaped::new(&mut *out).write_str(&status.test_name)?;
    writeln!(out, "</span>")?;
    let elapsed = Duration::try_from_secs_f64(status.elapsed_time).unwrap_or_default();
    writeln!(out, "<span class=\"elapsed\">{}</span>", format_duration(elapsed))?;
    if let Some(position) = &status.position {
        write!(out, "<span class=\"position\">")?;
        write!(HtmlEscaped::new(&mut *out), "{position}")?;
        writeln!(out, "</span>")?;
    }
    if !status.output.is_empty() {
        write!(out, "<pre class=\"output\" hidden>")?;
        let mut escaped = HtmlEscaped::new(&mut *out);
        for line in &status.output {
            escaped.write_str(line)?;
            escaped.write_char('\n')?;
        }
        writeln!(out, "</pre>")?;
    }
    writeln!(out, "</div>")
}
