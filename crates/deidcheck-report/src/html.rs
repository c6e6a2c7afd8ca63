//! HTML report rendering.
//!
//! Produces one self-contained page: the stylesheet is embedded at compile
//! time via [`include_str!`] so the report opens anywhere without side files.
//! Rendering is a pure function of the [`ReportSummary`].

use deidcheck_core::{JobOutcome, OverallOutcome, ReportSummary, TestResult};
use std::fmt::Write;

const STYLESHEET: &str = include_str!("themes/report.css");

/// Escape text for use in HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn outcome_class(outcome: JobOutcome) -> &'static str {
    match outcome {
        JobOutcome::Success => "outcome-success",
        JobOutcome::Failed => "outcome-failed",
        JobOutcome::Warning => "outcome-warning",
        JobOutcome::InProgress => "outcome-in_progress",
        JobOutcome::NotFound => "outcome-not_found",
        JobOutcome::Incomplete => "outcome-incomplete",
        JobOutcome::Error => "outcome-error",
        JobOutcome::Unknown => "outcome-unknown",
    }
}

fn verdict_class(outcome: OverallOutcome) -> &'static str {
    match outcome {
        OverallOutcome::Passed => "verdict-passed",
        OverallOutcome::Failed => "verdict-failed",
        OverallOutcome::Warning => "verdict-warning",
    }
}

/// Render the full report page.
pub fn render_html(summary: &ReportSummary, service_details: &str) -> String {
    let mut html = String::new();
    // Writing into a String cannot fail.
    let _ = write_page(&mut html, summary, service_details);
    html
}

fn write_page(out: &mut String, summary: &ReportSummary, service_details: &str) -> std::fmt::Result {
    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">")?;
    writeln!(out, "<title>DeIdentification Service Test Report</title>")?;
    writeln!(out, "<style>\n{STYLESHEET}</style>\n</head>\n<body>")?;
    writeln!(out, "<h1>DeIdentification Service Test Report</h1>")?;
    writeln!(
        out,
        "<p class=\"meta\">Generated {}</p>",
        summary.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(
        out,
        "<p><span class=\"verdict {}\">{}</span> &nbsp; Success rate: <strong>{}%</strong> \
         ({} of {} checks succeeded, {} failed, {} partial)</p>",
        verdict_class(summary.overall_outcome),
        summary.overall_outcome,
        summary.success_rate_percent,
        summary.counts.success,
        summary.counts.total,
        summary.counts.failed,
        summary.counts.partial,
    )?;

    writeln!(out, "<h2>Service</h2>")?;
    writeln!(
        out,
        "<p><span class=\"outcome {}\">{}</span> {}</p>",
        outcome_class(summary.service_health),
        summary.service_health,
        escape_html(service_details)
    )?;

    writeln!(out, "<h2>Tests</h2>")?;
    writeln!(
        out,
        "<table>\n<tr><th>#</th><th>Test</th><th>Outcome</th><th>Details</th><th>Evidence</th></tr>"
    )?;
    for (idx, test) in summary.per_test.iter().enumerate() {
        write_row(out, idx + 1, test)?;
    }
    writeln!(out, "</table>\n</body>\n</html>")
}

fn write_row(out: &mut String, number: usize, test: &TestResult) -> std::fmt::Result {
    let evidence = &test.evidence;
    let mut lines = vec![format!(
        "log: {} ({} line(s) seen)",
        evidence.log_path.display(),
        evidence.total_lines_seen
    )];
    if let Some(line) = &evidence.matched_line {
        lines.push(format!("matched: {line}"));
    }
    if let Some(delta) = &evidence.directory_delta {
        lines.push(format!("output: {delta}"));
    }

    writeln!(
        out,
        "<tr><td>{number}</td><td>{}</td><td><span class=\"outcome {}\">{}</span></td><td>{}</td><td class=\"evidence\">{}</td></tr>",
        escape_html(&test.name),
        outcome_class(test.outcome),
        test.outcome,
        escape_html(&test.details),
        escape_html(&lines.join("\n")),
    )
}
