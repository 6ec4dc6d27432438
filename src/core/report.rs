//! Plain-text rendering of a [`MonthlyReport`].
//!
//! The document follows the standard seven-section layout used for area reports. All
//! functions are pure and framework-agnostic; the HTTP layer serves the result as text.

use crate::core::{
    monthly::{ComplianceStatus, IndicatorRow, MonthlyReport},
    period::Period,
};
use std::fmt::Write as _;

/// Section headings in document order.
pub const SECTION_TITLES: [&str; 7] = [
    "I. Executive Summary",
    "II. Key Performance Indicators (KPIs)",
    "III. Results Analysis",
    "IV. Projects and Actions Executed",
    "V. Challenges or Risks of the Month",
    "VI. Next Month's Action Plan",
    "VII. Conclusion",
];

/// Generates a compliance bar like: `[████████░░] 80.0%`
///
/// # Arguments
/// * `percent` - Compliance percentage (0-100)
/// * `bar_length` - Length of the bar in characters (default 10)
#[must_use]
pub fn format_compliance_bar(percent: f64, bar_length: Option<usize>) -> String {
    let length = bar_length.unwrap_or(10);
    let clamped = percent.clamp(0.0, 100.0);

    // clamped is within [0, 100] and length is small, so the product fits a usize.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let filled = ((clamped / 100.0) * length as f64).round() as usize;
    let empty = length.saturating_sub(filled);

    format!("[{}{}] {percent:.1}%", "█".repeat(filled), "░".repeat(empty))
}

/// Formats an optional value with its unit, e.g. `98%`, `2.5 h` or `no data`.
#[must_use]
pub fn format_value(value: Option<f64>, unit: &str) -> String {
    match value {
        None => "no data".to_string(),
        Some(v) if unit.is_empty() => format!("{v}"),
        Some(v) if unit == "%" => format!("{v}%"),
        Some(v) if unit == "$" => format!("${v}"),
        Some(v) => format!("{v} {unit}"),
    }
}

/// One line of the KPI section.
#[must_use]
pub fn format_indicator_line(row: &IndicatorRow) -> String {
    let mark = match row.meets_target {
        Some(true) => "✅",
        Some(false) => "❌",
        None => "➖",
    };
    let mut line = format!(
        "{mark} {}: {}",
        row.indicator,
        format_value(row.month_value, &row.unit)
    );
    if let Some(target) = row.target {
        let symbol = row
            .target_mode
            .map_or_else(|| "≥".to_string(), |m| m.to_string());
        let _ = write!(line, " (target {symbol} {})", format_value(Some(target), &row.unit));
    }
    if let Some(ytd) = row.ytd_value {
        let _ = write!(line, " | YTD {}", format_value(Some(ytd), &row.unit));
    }
    line
}

fn push_section(out: &mut String, index: usize, lines: &[String], empty: &str) {
    let _ = writeln!(out, "{}", SECTION_TITLES[index]);
    if lines.is_empty() {
        let _ = writeln!(out, "{empty}");
    } else {
        for line in lines {
            let _ = writeln!(out, "{line}");
        }
    }
    out.push('\n');
}

fn conclusion(report: &MonthlyReport) -> String {
    match (report.summary.status, report.summary.compliance_percentage) {
        (ComplianceStatus::InsufficientData, _) | (_, None) => format!(
            "Not enough judged indicators to rate {} this month. Record the pending indicators \
             to complete the evaluation.",
            report.area
        ),
        (status, Some(pct)) => format!(
            "Overall status: {status} {}. {} of {} indicators have an entry this month.",
            format_compliance_bar(pct, None),
            report.summary.total_indicators - report.missing_this_month.len(),
            report.summary.total_indicators
        ),
    }
}

/// Renders the full text document.
#[must_use]
pub fn format_monthly_report(report: &MonthlyReport) -> String {
    let mut out = String::new();
    let period_name = report
        .period
        .parse::<Period>()
        .map_or_else(|_| report.period.clone(), |p| p.long_name());

    let _ = writeln!(out, "MONTHLY REPORT - {}", report.area.to_uppercase());
    let _ = writeln!(out, "Period: {period_name} ({})", report.period);
    out.push('\n');

    let mut summary = vec![report.executive_summary.clone()];
    if let Some(narrative) = report.narrative.as_deref().filter(|n| !n.trim().is_empty()) {
        summary.push(String::new());
        summary.push(narrative.trim().to_string());
    }
    push_section(&mut out, 0, &summary, "");

    let kpis: Vec<String> = report.indicators.iter().map(format_indicator_line).collect();
    push_section(&mut out, 1, &kpis, "No KPI entries recorded.");

    let analysis: Vec<String> = report.analysis.iter().map(|l| format!("- {l}")).collect();
    push_section(&mut out, 2, &analysis, "No analysis available.");

    let projects: Vec<String> = report
        .projects
        .iter()
        .map(|p| match p.notes.as_deref().filter(|n| !n.is_empty()) {
            Some(notes) => format!("- {} [{}]: {notes}", p.name, p.status),
            None => format!("- {} [{}]", p.name, p.status),
        })
        .collect();
    push_section(&mut out, 3, &projects, "No projects recorded.");

    let mut risks: Vec<String> = report
        .deviations
        .iter()
        .filter(|d| d.deviation_pct < 0.0)
        .map(|d| {
            format!(
                "- {} at {} against a target of {} ({}% from target)",
                d.indicator,
                format_value(Some(d.month_value), &d.unit),
                format_value(Some(d.target), &d.unit),
                d.deviation_pct
            )
        })
        .collect();
    if !report.missing_this_month.is_empty() {
        risks.push(format!(
            "- {} indicator(s) without an entry this month",
            report.missing_this_month.len()
        ));
    }
    push_section(&mut out, 4, &risks, "No significant deviations.");

    let actions: Vec<String> = report
        .action_plan
        .iter()
        .map(|a| {
            let due = a
                .due_date
                .map_or_else(|| "no date".to_string(), |d| d.format("%Y-%m-%d").to_string());
            format!("- {} (owner: {}, due: {due})", a.action, a.owner)
        })
        .collect();
    push_section(&mut out, 5, &actions, "No actions planned.");

    push_section(&mut out, 6, &[conclusion(report)], "");

    out.truncate(out.trim_end().len());
    out.push('\n');
    out
}
