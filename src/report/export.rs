//! JSON export of an analysis run

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::pipeline::{
    AnalysisConfig, AnalysisFilter, AnalysisOutput, ColumnMapping, NormalizationReport,
};

/// Metadata about the analysis run
#[derive(Serialize)]
pub struct AnalysisMetadata {
    /// Timestamp of the analysis (ISO 8601 format)
    pub timestamp: String,
    pub retailscope_version: String,
    pub input_file: String,
    pub columns: ColumnMapping,
    pub filter: AnalysisFilter,
    pub margin_rate: f64,
    pub retention_rate: f64,
    pub discount_rate: f64,
}

/// Complete report file
#[derive(Serialize)]
pub struct AnalysisExport<'a> {
    pub metadata: AnalysisMetadata,
    pub normalization: &'a NormalizationReport,
    #[serde(flatten)]
    pub analysis: &'a AnalysisOutput,
}

/// Parameters recorded in the export metadata
pub struct ExportParams<'a> {
    pub input_file: &'a str,
    pub columns: &'a ColumnMapping,
    pub config: &'a AnalysisConfig,
    pub normalization: &'a NormalizationReport,
}

/// Write the analysis with its run metadata as pretty-printed JSON.
pub fn export_analysis_json(
    output: &AnalysisOutput,
    output_path: &Path,
    params: &ExportParams,
) -> Result<()> {
    let export = AnalysisExport {
        metadata: AnalysisMetadata {
            timestamp: Utc::now().to_rfc3339(),
            retailscope_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: params.input_file.to_string(),
            columns: params.columns.clone(),
            filter: params.config.filter.clone(),
            margin_rate: params.config.margin_rate,
            retention_rate: params.config.retention_rate,
            discount_rate: params.config.discount_rate,
        },
        normalization: params.normalization,
        analysis: output,
    };

    let file = File::create(output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &export)
        .with_context(|| format!("Failed to write analysis to {}", output_path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to write analysis to {}", output_path.display()))?;

    Ok(())
}
