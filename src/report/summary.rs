//! Terminal summary of an analysis run

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::pipeline::{AnalysisOutput, NormalizationReport};

/// Offsets shown in the retention table
const RETENTION_COLUMNS: [u32; 5] = [1, 3, 6, 9, 12];

fn section_header(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

fn money(value: f64) -> String {
    format!("£{:.2}", value)
}

fn pct(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

/// Row accounting from normalization
pub fn display_normalization(report: &NormalizationReport) {
    let mut table = new_table(&["Rows", "Count"]);
    table.add_row(vec![Cell::new("📥 Input"), Cell::new(report.input_rows)]);
    for (label, count) in [
        ("Missing customer id", report.missing_customer),
        ("Missing invoice", report.missing_invoice),
        ("Invalid date", report.invalid_date),
        ("Invalid quantity/price", report.invalid_amount),
    ] {
        table.add_row(vec![
            Cell::new(format!("🗑️  {}", label)),
            Cell::new(count).fg(if count == 0 { Color::White } else { Color::Red }),
        ]);
    }
    table.add_row(vec![
        Cell::new("✅ Kept"),
        Cell::new(report.kept_rows)
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
    ]);
    print_indented(&table);
}

/// Headline KPIs, segments, retention and CLV
pub fn display_analysis(output: &AnalysisOutput) {
    section_header("📋", "KPI OVERVIEW");
    let kpis = &output.kpis;
    let mut table = new_table(&["Metric", "Value"]);
    table.add_row(vec![
        Cell::new("🧾 Transactions analysed"),
        Cell::new(output.transactions_analyzed),
    ]);
    table.add_row(vec![
        Cell::new("👥 Active customers"),
        Cell::new(kpis.active_customers),
    ]);
    table.add_row(vec![Cell::new("🛒 Invoices"), Cell::new(kpis.invoices)]);
    table.add_row(vec![
        Cell::new("💷 Total revenue"),
        Cell::new(money(kpis.total_revenue)).fg(Color::Green),
    ]);
    table.add_row(vec![
        Cell::new("🧺 Average basket"),
        Cell::new(money(kpis.average_basket)),
    ]);
    table.add_row(vec![
        Cell::new("📈 Empirical CLV"),
        Cell::new(kpis.empirical_clv.map(money).unwrap_or_else(|| "n/a".into())),
    ]);
    if let Some(reference) = output.reference_date {
        table.add_row(vec![
            Cell::new("📅 Reference date"),
            Cell::new(reference.format("%Y-%m-%d").to_string()),
        ]);
    }
    print_indented(&table);

    display_segments(output);
    display_retention(output);
    display_clv(output);
}

fn display_segments(output: &AnalysisOutput) {
    if output.segments.is_empty() {
        return;
    }
    section_header("🎯", "CUSTOMER SEGMENTS");

    let total = output.rfm.len();
    let mut table = new_table(&[
        "Segment",
        "Customers",
        "Share",
        "Recency (d)",
        "Frequency",
        "Monetary",
        "Action",
    ]);
    for summary in &output.segments {
        table.add_row(vec![
            Cell::new(summary.segment.label()).add_attribute(Attribute::Bold),
            Cell::new(summary.customers).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}%", summary.share_pct(total)))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.0}", summary.mean_recency_days))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}", summary.mean_frequency))
                .set_alignment(CellAlignment::Right),
            Cell::new(money(summary.mean_monetary)).set_alignment(CellAlignment::Right),
            Cell::new(summary.segment.recommended_action()).fg(Color::DarkGrey),
        ]);
    }
    print_indented(&table);
}

fn display_retention(output: &AnalysisOutput) {
    if output.cohorts.is_empty() {
        return;
    }
    section_header("🔁", "COHORT RETENTION");

    let mut headers = vec!["Cohort".to_string(), "Size".to_string()];
    headers.extend(RETENTION_COLUMNS.iter().map(|m| format!("M+{}", m)));
    let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
    let mut table = new_table(&header_refs);

    for cohort in output.cohorts.cohorts() {
        let mut row = vec![
            Cell::new(cohort.to_string()),
            Cell::new(output.cohorts.cohort_size(cohort).unwrap_or(0)),
        ];
        for &offset in &RETENTION_COLUMNS {
            row.push(match output.cohorts.retention(cohort, offset) {
                Some(ratio) => Cell::new(pct(ratio)).fg(retention_color(ratio)),
                None => Cell::new("·").fg(Color::DarkGrey),
            });
        }
        table.add_row(row);
    }
    print_indented(&table);

    for curve in &output.retention_by_client_type {
        let m3 = curve
            .curve
            .iter()
            .find(|p| p.period_offset == 3)
            .map(|p| pct(p.average_retention))
            .unwrap_or_else(|| "n/a".into());
        println!(
            "      {} {} customers: {} at M+3",
            style("•").dim(),
            style(format!("{} ({})", curve.client_type, curve.customers)).cyan(),
            style(m3).yellow()
        );
    }
}

fn retention_color(ratio: f64) -> Color {
    if ratio >= 0.4 {
        Color::Green
    } else if ratio >= 0.2 {
        Color::Yellow
    } else {
        Color::Red
    }
}

fn display_clv(output: &AnalysisOutput) {
    let Some(projection) = &output.clv else {
        return;
    };
    section_header("💰", "CUSTOMER LIFETIME VALUE");

    let scenario = &projection.scenario;
    let mut table = new_table(&["Parameter", "Value"]);
    table.add_row(vec![
        Cell::new("Average monetary"),
        Cell::new(money(scenario.average_monetary)),
    ]);
    table.add_row(vec![Cell::new("Margin"), Cell::new(pct(scenario.margin_rate))]);
    table.add_row(vec![
        Cell::new("Retention"),
        Cell::new(pct(scenario.retention_rate)),
    ]);
    table.add_row(vec![
        Cell::new("Discount"),
        Cell::new(pct(scenario.discount_rate)),
    ]);
    let clv_cell = match (projection.clv, &projection.undefined_reason) {
        (Some(value), _) => Cell::new(money(value))
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
        (None, Some(reason)) => Cell::new(format!("undefined: {}", reason)).fg(Color::Red),
        (None, None) => Cell::new("undefined").fg(Color::Red),
    };
    table.add_row(vec![Cell::new("Projected CLV"), clv_cell]);
    print_indented(&table);

    display_segment_clv(output);
    display_scenarios(output);

    if let Some((margin, retention, value)) =
        output.sensitivity.as_ref().and_then(|s| s.max_cell())
    {
        println!();
        println!(
            "      {} Sensitivity peak: {} at margin {} / retention {}",
            style("•").dim(),
            style(money(value)).yellow().bold(),
            pct(margin),
            pct(retention)
        );
    }
}

fn optional_money(value: Option<f64>) -> Cell {
    match value {
        Some(v) => Cell::new(money(v)).set_alignment(CellAlignment::Right),
        None => Cell::new("undefined").fg(Color::Red),
    }
}

fn display_segment_clv(output: &AnalysisOutput) {
    if output.segment_clv.is_empty() {
        return;
    }
    println!();
    let mut table = new_table(&["Segment", "Monetary", "CLV baseline", "CLV scenario"]);
    for value in &output.segment_clv {
        table.add_row(vec![
            Cell::new(value.segment.label()).add_attribute(Attribute::Bold),
            Cell::new(money(value.mean_monetary)).set_alignment(CellAlignment::Right),
            optional_money(value.clv_baseline),
            optional_money(value.clv_scenario),
        ]);
    }
    print_indented(&table);
}

fn display_scenarios(output: &AnalysisOutput) {
    if output.scenarios.is_empty() {
        return;
    }
    println!();
    let mut table = new_table(&["Scenario", "Margin", "Retention", "CLV", "vs baseline"]);
    for comparison in &output.scenarios {
        let delta = match (comparison.delta, comparison.delta_pct) {
            (Some(d), Some(p)) => Cell::new(format!("{:+.2} ({:+.1}%)", d, p))
                .fg(if d >= 0.0 { Color::Green } else { Color::Red }),
            (Some(d), None) => Cell::new(format!("{:+.2}", d)),
            _ => Cell::new("n/a").fg(Color::DarkGrey),
        };
        table.add_row(vec![
            Cell::new(&comparison.name).add_attribute(Attribute::Bold),
            Cell::new(pct(comparison.scenario.margin_rate)),
            Cell::new(pct(comparison.scenario.retention_rate)),
            optional_money(comparison.clv),
            delta,
        ]);
    }
    print_indented(&table);

    if let Some(roi) = &output.initiative {
        println!();
        println!(
            "      {} Initiative: {} created, ROI {}, payback {}",
            style("•").dim(),
            style(money(roi.value_created)).yellow().bold(),
            roi.roi_pct
                .map(|r| format!("{:+.1}%", r))
                .unwrap_or_else(|| "n/a".into()),
            roi.payback_days
                .map(|d| format!("{:.0} days", d))
                .unwrap_or_else(|| "never".into())
        );
    }
}
