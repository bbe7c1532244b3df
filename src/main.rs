//! RetailScope: customer analytics CLI
//!
//! Loads a retail transaction file, cleans it, and reports RFM segments,
//! monthly cohort retention and projected customer lifetime value.

use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use console::style;

use retailscope::cli::Cli;
use retailscope::pipeline::{
    load_dataset_with_progress, normalize_dataframe, run_analysis, ColumnMapping,
};
use retailscope::report::{display_analysis, display_normalization, export_analysis_json, ExportParams};
use retailscope::utils::{
    print_banner, print_completion, print_config, print_count, print_info, print_step_header,
    print_step_time, print_success, print_warning, with_spinner,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = cli.analysis_config()?;
    let show_progress = !cli.no_progress;

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&cli.input, &config);

    // Step 1: Load dataset
    print_step_header(1, "Load Transactions");
    let step_start = Instant::now();
    let (df, rows, cols, memory_mb) =
        load_dataset_with_progress(&cli.input, cli.infer_schema_length, show_progress)?;
    print_success("Dataset loaded");
    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", rows);
    println!("      Columns: {}", cols);
    println!("      Estimated memory: {:.2} MB", memory_mb);
    print_step_time(step_start.elapsed());

    // Step 2: Normalize
    print_step_header(2, "Clean Transactions");
    let step_start = Instant::now();
    let mapping = ColumnMapping::detect(&df);
    let normalized = normalize_dataframe(&df, &mapping)?;
    drop(df);
    display_normalization(&normalized.report);
    if normalized.report.dropped() > 0 {
        print_warning(&format!(
            "{} row(s) dropped during cleaning",
            normalized.report.dropped()
        ));
    }
    print_step_time(step_start.elapsed());

    // Step 3: Analyse
    print_step_header(3, "Segments, Cohorts and CLV");
    let step_start = Instant::now();
    let output = with_spinner(
        show_progress,
        "Scoring customers and building cohorts...",
        "Analysis complete",
        || run_analysis(&normalized.transactions, &config),
    );

    if output.transactions_analyzed == 0 {
        print_warning("No transactions match the filter; nothing to analyse");
    } else {
        print_count("customer(s) scored", output.rfm.len(), None);
        print_count(
            "cohort(s)",
            output.cohorts.cohort_sizes.len(),
            output
                .cohorts
                .max_offset()
                .map(|m| format!("(up to M+{})", m))
                .as_deref(),
        );
    }
    if let Some(warning) = output.rfm.scoring.warning() {
        print_warning(&warning);
    }
    if let Some(reason) = output.clv.as_ref().and_then(|c| c.undefined_reason.as_deref()) {
        print_warning(reason);
    }
    print_step_time(step_start.elapsed());

    display_analysis(&output);

    // Step 4: Export
    if let Some(json_path) = cli.json_path() {
        print_step_header(4, "Save Results");
        let input_file = cli.input.display().to_string();
        export_analysis_json(
            &output,
            &json_path,
            &ExportParams {
                input_file: &input_file,
                columns: &mapping,
                config: &config,
                normalization: &normalized.report,
            },
        )?;
        print_success(&format!("Saved to {}", json_path.display()));
    } else {
        print_info("No JSON report requested (use --json or --export-json)");
    }

    print_completion();

    Ok(())
}
