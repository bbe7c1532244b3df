//! Command-line argument definitions using clap

use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

use crate::pipeline::{AnalysisConfig, AnalysisFilter, GridSpec, ReturnMode};

/// RetailScope - RFM segments, cohort retention and CLV from retail transactions
#[derive(Parser, Debug)]
#[command(name = "retailscope")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input transaction file (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// First calendar date of the analysis window (YYYY-MM-DD, inclusive).
    /// Requires --end.
    #[arg(long, value_parser = parse_date)]
    pub start: Option<NaiveDate>,

    /// Last calendar date of the analysis window (YYYY-MM-DD, inclusive).
    /// Also the reference date for recency. Requires --start.
    #[arg(long, value_parser = parse_date)]
    pub end: Option<NaiveDate>,

    /// Country to keep. Repeat for several; omit to keep all countries.
    #[arg(long = "country")]
    pub countries: Vec<String>,

    /// Return handling: "exclude" (default), "include" or "only"
    #[arg(long, default_value = "exclude")]
    pub returns: ReturnMode,

    /// Gross margin rate used for CLV (0.0 to 1.0)
    #[arg(long, default_value = "0.20", value_parser = validate_rate)]
    pub margin: f64,

    /// Annual retention rate used for CLV (0.0 to 1.0)
    #[arg(long, default_value = "0.60", value_parser = validate_rate)]
    pub retention: f64,

    /// Discount rate used for CLV (0.0 to 1.0)
    #[arg(long, default_value = "0.10", value_parser = validate_rate)]
    pub discount: f64,

    /// Budget of the retention initiative used for the ROI estimate
    #[arg(long, default_value = "5000", value_parser = validate_cost)]
    pub initiative_cost: f64,

    /// Customers reached by the initiative (default: a tenth of active customers)
    #[arg(long)]
    pub affected_customers: Option<usize>,

    /// Points along each axis of the CLV sensitivity grid
    #[arg(long, default_value = "15", value_parser = validate_grid_points)]
    pub grid_points: usize,

    /// Write the full analysis as JSON to this path
    #[arg(long, conflicts_with = "export_json")]
    pub json: Option<PathBuf>,

    /// Write the JSON report next to the input as '<stem>_analysis.json'
    #[arg(long, default_value = "false")]
    pub export_json: bool,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan (very slow for large files).
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,

    /// Disable spinners
    #[arg(long, default_value = "false")]
    pub no_progress: bool,
}

impl Cli {
    /// Where the JSON report goes, if anywhere.
    /// `--export-json` derives the path from the input file.
    pub fn json_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.json {
            return Some(path.clone());
        }
        if !self.export_json {
            return None;
        }
        let parent = self
            .input
            .parent()
            .unwrap_or_else(|| std::path::Path::new("."));
        let stem = self
            .input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("retailscope");
        Some(parent.join(format!("{}_analysis.json", stem)))
    }

    /// Analysis parameters described by the flags
    pub fn analysis_config(&self) -> Result<AnalysisConfig> {
        let date_range = match (self.start, self.end) {
            (Some(start), Some(end)) => {
                if start > end {
                    anyhow::bail!("--start ({}) must not be after --end ({})", start, end);
                }
                Some((start, end))
            }
            (None, None) => None,
            _ => anyhow::bail!("--start and --end must be given together"),
        };

        Ok(AnalysisConfig {
            filter: AnalysisFilter {
                date_range,
                countries: self.countries.iter().cloned().collect(),
                return_mode: self.returns,
            },
            margin_rate: self.margin,
            retention_rate: self.retention,
            discount_rate: self.discount,
            grid: GridSpec {
                points: self.grid_points,
                ..GridSpec::default()
            },
            initiative_cost: self.initiative_cost,
            affected_customers: self.affected_customers,
            ..AnalysisConfig::default()
        })
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("'{}' is not a valid date (expected YYYY-MM-DD)", s))
}

/// Validator for rate parameters
fn validate_rate(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !(0.0..=1.0).contains(&value) {
        Err(format!("rate must be between 0.0 and 1.0, got {}", value))
    } else {
        Ok(value)
    }
}

/// Validator for monetary amounts
fn validate_cost(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid amount", s))?;

    if !value.is_finite() || value < 0.0 {
        Err(format!("amount must be a non-negative number, got {}", s))
    } else {
        Ok(value)
    }
}

/// Validator for grid_points parameter
fn validate_grid_points(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid count", s))?;

    if value < 2 {
        Err(format!("grid_points must be at least 2, got {}", value))
    } else {
        Ok(value)
    }
}
