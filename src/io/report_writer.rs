//! Plain-text statistics report
//!
//! One block per section, separated by blank lines, the whole report wrapped
//! in a fenced block. Tables are right-aligned under their column headers.

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::report::{Section, StatisticsReport, Summary};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::info;

/// Render rows of cells as aligned columns; the first column is left-aligned
fn aligned(header: &[String], rows: &[Vec<String>]) -> String {
    let columns = header.len();
    let mut widths: Vec<usize> = header.iter().map(String::len).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(columns) {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let mut out = String::new();
    for line in std::iter::once(header).chain(rows.iter().map(Vec::as_slice)) {
        let mut text = String::new();
        for (i, cell) in line.iter().enumerate().take(columns) {
            if i == 0 {
                let _ = write!(text, "{:<width$}", cell, width = widths[0]);
            } else {
                let _ = write!(text, "  {:>width$}", cell, width = widths[i]);
            }
        }
        out.push_str(text.trim_end());
        out.push('\n');
    }
    out
}

fn format_optional(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "NaN".to_string(),
    }
}

fn summary_rows(summary: &Summary) -> Vec<Vec<String>> {
    let cells = [
        ("count", Some(summary.count as f64)),
        ("mean", Some(summary.mean)),
        ("std", summary.std),
        ("min", Some(summary.min)),
        ("25%", Some(summary.q25)),
        ("50%", Some(summary.median)),
        ("75%", Some(summary.q75)),
        ("max", Some(summary.max)),
    ];
    cells
        .iter()
        .map(|(label, value)| vec![label.to_string(), format_optional(*value, 1)])
        .collect()
}

fn render_section(section: &Section) -> String {
    match section {
        Section::Totals { lines } => {
            lines.iter().map(|line| format!("{} {}\n", line.value, line.label)).collect()
        }
        Section::Counts { title, key_header, rows } => {
            let header = vec![key_header.clone(), "Minutes".to_string(), "Percentage".to_string()];
            let body: Vec<Vec<String>> = rows
                .iter()
                .map(|r| vec![r.key.clone(), r.count.to_string(), format!("{:.1}", r.percentage)])
                .collect();
            format!("{}\n{}", title, aligned(&header, &body))
        }
        Section::Means { title, key_header, value_header, decimals, rows } => {
            let header = vec![key_header.clone(), value_header.clone()];
            let body: Vec<Vec<String>> = rows
                .iter()
                .map(|r| vec![r.key.clone(), format!("{:.*}", *decimals, r.value)])
                .collect();
            format!("{}\n{}", title, aligned(&header, &body))
        }
        Section::Distribution { title, value_header, summary } => match summary {
            Some(summary) => {
                let header = vec![String::new(), value_header.clone()];
                format!("{}\n{}", title, aligned(&header, &summary_rows(summary)))
            }
            None => format!("{}\n(no data)\n", title),
        },
    }
}

/// Render the whole report as text
pub fn render(report: &StatisticsReport) -> String {
    let mut out = String::from("```\n");
    for section in report.sections() {
        out.push_str(&render_section(section));
        out.push('\n');
    }
    out.push_str("```\n");
    out
}

pub fn write_report<P: AsRef<Path>>(path: P, report: &StatisticsReport) -> PipelineResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
    }
    let text = render(report);
    fs::write(path, &text).map_err(|e| PipelineError::io(path, e))?;
    info!(
        file = %path.display(),
        sections = report.sections().len(),
        bytes = text.len(),
        "report_written"
    );
    Ok(())
}
