//! Formatted terminal output.
//!
//! Formatting lives in one place so the calculation code stays clean and
//! output changes are localized.

use crate::app::pipeline::LoadOutcome;
use crate::data::WeightTable;
use crate::domain::{ConsensusResult, HealthReport};

/// Consensus breakdown plus the data-source flags a reader needs to judge it.
pub fn format_consensus(result: &ConsensusResult, outcome: &LoadOutcome) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== infl - Consensus inflation ({}) ===\n", result.currency));
    out.push_str(&format!(
        "Requested: {} -> {} | Used: {} -> {}\n",
        result.requested_from_year, result.requested_to_year, result.actual_from_year, result.actual_to_year
    ));
    out.push_str(&format!(
        "Amount: {:.2} -> {:.2} ({:+.2}%, {:.2}%/yr)\n",
        result.amount,
        result.adjusted_amount,
        result.total_inflation_pct,
        result.annualized_rate * 100.0
    ));
    out.push_str(&format!(
        "Real data: {} | Fallback used: {}{}\n",
        yes_no(outcome.has_real_data),
        yes_no(outcome.fallback_used),
        outcome
            .strategy
            .as_deref()
            .map(|s| format!(" ({s})"))
            .unwrap_or_default()
    ));

    out.push_str("\nMeasures:\n");
    out.push_str(&format!(
        "{:<18} {:>8} {:>12} {:>9} {:<10} {:>11}\n",
        "measure", "weight", "adjusted", "change", "confidence", "years"
    ));
    for m in &result.measures {
        out.push_str(&format!(
            "{:<18} {:>7.1}% {:>12.2} {:>+8.2}% {:<10} {:>5}-{:<5}\n",
            m.measure,
            m.weight * 100.0,
            m.adjusted_amount,
            m.pct_change,
            m.confidence.display_name(),
            m.actual_from_year,
            m.actual_to_year
        ));
    }
    for (name, reason) in &result.skipped {
        out.push_str(&format!("  (skipped {name}) {reason}\n"));
    }
    if result.coverage_mismatch {
        out.push_str("Note: measures resolved different year ranges; see the years column.\n");
    }

    push_list(&mut out, "Warnings", &outcome.warnings);
    out
}

pub fn format_health(report: &HealthReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== infl - Data health ({}) ===\n", report.currency));
    out.push_str(&format!(
        "Overall score: {:.1} | valid measures: {}/{}\n",
        report.overall_score, report.valid_measures, report.total_measures
    ));

    out.push_str("\nMeasures:\n");
    for (name, result) in &report.measures {
        let status = if result.is_valid { "ok" } else { "FAIL" };
        out.push_str(&format!(
            "{:<18} {:>5.1} {:<4} points={} missing={} outliers={} warnings={}\n",
            name,
            result.score,
            status,
            result.details.data_points,
            result.details.missing_years.len(),
            result.details.outliers.len(),
            result.warnings.len()
        ));
    }

    push_list(&mut out, "Critical issues", &report.critical_issues);
    push_list(&mut out, "Recommendations", &report.recommendations);
    out
}

/// The compiled-in weight table, optionally for one currency.
pub fn format_weights(table: &WeightTable, currency: Option<&str>) -> String {
    let mut out = String::new();
    for code in table.currencies() {
        if currency.is_some_and(|c| !c.eq_ignore_ascii_case(code)) {
            continue;
        }
        let Some(weights) = table.for_currency(code) else {
            continue;
        };
        let mut rows: Vec<(&String, &f64)> = weights.iter().collect();
        rows.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));

        out.push_str(&format!("{code}:\n"));
        for (name, w) in rows {
            out.push_str(&format!("  {name:<18} {:>5.1}%\n", w * 100.0));
        }
    }
    out
}

fn push_list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("\n{title}:\n"));
    for item in items {
        out.push_str(&format!("- {item}\n"));
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
