//! Plain-text rendering of a risk report

use crate::pipeline::RiskReport;
use std::fmt::Write;

/// Width of the longest bar in the driver chart
const BAR_WIDTH: usize = 30;

/// Shown when no recommendation applies
pub const NO_RISK_MESSAGE: &str = "No critical risk factors detected. Keep maintaining good engagement!";

/// Render the report for a terminal
pub fn render_text(report: &RiskReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Attrition Risk Analysis");
    let _ = writeln!(out, "=======================");
    let _ = writeln!(
        out,
        "Probability of leaving: {:.1}% ({})",
        report.probability * 100.0,
        report.band
    );
    let _ = writeln!(out, "Estimated replacement cost: ${:.2}", report.expected_loss);
    let _ = writeln!(out);

    let _ = writeln!(out, "Key drivers (log-odds, + raises risk):");
    out.push_str(&render_drivers(report));
    let _ = writeln!(out);

    let _ = writeln!(out, "Recommended interventions:");
    if report.no_critical_risk() {
        let _ = writeln!(out, "  {NO_RISK_MESSAGE}");
    } else {
        for rec in &report.recommendations {
            let _ = writeln!(out, "  * {}: {}", rec.title, rec.action);
        }
    }

    out
}

fn render_drivers(report: &RiskReport) -> String {
    let mut out = String::new();
    if report.top_drivers.is_empty() {
        let _ = writeln!(out, "  (none)");
        return out;
    }

    let label_width = report
        .top_drivers
        .iter()
        .map(|d| d.feature.chars().count())
        .max()
        .unwrap_or(0);
    let max_abs = report
        .top_drivers
        .iter()
        .map(|d| d.value.abs())
        .fold(0.0_f64, f64::max);

    for driver in &report.top_drivers {
        let len = if max_abs > 0.0 {
            ((driver.value.abs() / max_abs) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let glyph = if driver.value > 0.0 { "+" } else { "-" };
        let bar = glyph.repeat(len);
        let _ = writeln!(
            out,
            "  {:<label_width$}  {:>+8.4}  {}",
            driver.feature, driver.value, bar
        );
    }

    out
}
