//! One-call analysis over a transaction batch
//!
//! [`run_analysis`] filters the batch, then derives every artifact from the
//! same filtered set. It performs no I/O, so it can be re-run on the same
//! batch with different configurations.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::clv::{
    compare_scenarios, initiative_roi, predefined_scenarios, retention_curve,
    sensitivity_surface, ClvScenario, CurvePoint, GridSpec, InitiativeRoi, ScenarioComparison,
    SensitivitySurface, DEFAULT_DISCOUNT_RATE, DEFAULT_MARGIN_RATE, DEFAULT_RETENTION_RATE,
};
use super::cohort::{
    build_cohort_matrix, empirical_clv_by_cohort, retention_by_client_type, ClientTypeRetention,
    CohortCell, CohortMatrix, CohortValue, PeriodRetention, DEFAULT_RETENTION_HORIZON,
};
use super::filter::AnalysisFilter;
use super::kpi::{compute_kpis, KpiOverview};
use super::rfm::{build_rfm_table, RfmTable};
use super::segment::{project_segment_clv, summarize_segments, SegmentClv, SegmentSummary};
use super::transaction::Transaction;

pub const DEFAULT_INITIATIVE_COST: f64 = 5000.0;

/// Without an explicit count, an initiative reaches one customer in this many
pub const DEFAULT_INITIATIVE_REACH: usize = 10;

/// Parameters of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisConfig {
    pub filter: AnalysisFilter,
    /// Overrides the reference date derived from the filter
    pub reference_date: Option<NaiveDateTime>,
    pub margin_rate: f64,
    pub retention_rate: f64,
    pub discount_rate: f64,
    pub grid: GridSpec,
    /// Months after acquisition covered by the retention curves
    pub retention_horizon: u32,
    /// Budget of the retention initiative whose ROI is reported
    pub initiative_cost: f64,
    /// Customers reached by the initiative; `None` means a tenth of the
    /// active customers
    pub affected_customers: Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            filter: AnalysisFilter::default(),
            reference_date: None,
            margin_rate: DEFAULT_MARGIN_RATE,
            retention_rate: DEFAULT_RETENTION_RATE,
            discount_rate: DEFAULT_DISCOUNT_RATE,
            grid: GridSpec::default(),
            retention_horizon: DEFAULT_RETENTION_HORIZON,
            initiative_cost: DEFAULT_INITIATIVE_COST,
            affected_customers: None,
        }
    }
}

/// The projected CLV, or why it is undefined
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClvProjection {
    pub scenario: ClvScenario,
    pub clv: Option<f64>,
    pub undefined_reason: Option<String>,
}

/// Everything derived from one filtered batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOutput {
    pub transactions_analyzed: usize,
    pub reference_date: Option<NaiveDateTime>,
    pub rfm: RfmTable,
    pub segments: Vec<SegmentSummary>,
    pub segment_clv: Vec<SegmentClv>,
    pub cohorts: CohortMatrix,
    /// Retention ratio of every defined (cohort, offset) cell
    pub cohort_cells: Vec<CohortCell>,
    pub retention_curve: Vec<PeriodRetention>,
    pub retention_by_client_type: Vec<ClientTypeRetention>,
    pub cohort_values: Vec<CohortValue>,
    pub kpis: KpiOverview,
    /// `None` when no customer has a positive monetary value
    pub clv: Option<ClvProjection>,
    pub clv_by_retention: Vec<CurvePoint>,
    pub sensitivity: Option<SensitivitySurface>,
    /// Predefined what-if scenarios against the default-rate baseline
    pub scenarios: Vec<ScenarioComparison>,
    /// Value of moving the affected customers from baseline to configured CLV
    pub initiative: Option<InitiativeRoi>,
}

pub fn run_analysis(transactions: &[Transaction], config: &AnalysisConfig) -> AnalysisOutput {
    let filtered = config.filter.apply(transactions);
    let reference_date = config
        .reference_date
        .or_else(|| config.filter.reference_date(&filtered));

    let rfm = match reference_date {
        Some(reference) => build_rfm_table(&filtered, reference),
        None => RfmTable::empty(None),
    };
    let segments = summarize_segments(&rfm);
    let segment_clv = project_segment_clv(
        &segments,
        config.margin_rate,
        config.retention_rate,
        config.discount_rate,
    );

    let cohorts = build_cohort_matrix(&filtered);
    let cohort_cells = cohorts.cells();
    let retention_curve_by_period = cohorts.average_retention_by_period(config.retention_horizon);
    let by_client_type = retention_by_client_type(&filtered, config.retention_horizon);
    let cohort_values = empirical_clv_by_cohort(&filtered);

    let kpis = compute_kpis(&filtered, &rfm);

    let configured = rfm.average_monetary().map(|average_monetary| {
        ClvScenario::new(
            average_monetary,
            config.margin_rate,
            config.retention_rate,
            config.discount_rate,
        )
    });
    let baseline = configured.map(|s| ClvScenario::baseline(s.average_monetary));

    let clv = configured.map(project);
    let clv_by_retention = configured
        .map(|s| {
            retention_curve(
                s.average_monetary,
                s.margin_rate,
                s.discount_rate,
                &config.grid.retention_values(),
            )
        })
        .unwrap_or_default();
    let sensitivity =
        configured.map(|s| sensitivity_surface(s.average_monetary, s.discount_rate, &config.grid));
    let scenarios = baseline
        .map(|b| compare_scenarios(&b, &predefined_scenarios(&b)))
        .unwrap_or_default();

    let affected = config
        .affected_customers
        .unwrap_or(kpis.active_customers / DEFAULT_INITIATIVE_REACH);
    let initiative = baseline
        .and_then(|b| b.project().ok())
        .zip(clv.as_ref().and_then(|p| p.clv))
        .filter(|_| affected > 0)
        .map(|(base, simulated)| initiative_roi(base, simulated, affected, config.initiative_cost));

    log::info!(
        "analysis: {} transactions, {} customers, {} cohorts",
        filtered.len(),
        rfm.len(),
        cohorts.cohort_sizes.len()
    );

    AnalysisOutput {
        transactions_analyzed: filtered.len(),
        reference_date,
        rfm,
        segments,
        segment_clv,
        cohorts,
        cohort_cells,
        retention_curve: retention_curve_by_period,
        retention_by_client_type: by_client_type,
        cohort_values,
        kpis,
        clv,
        clv_by_retention,
        sensitivity,
        scenarios,
        initiative,
    }
}

fn project(scenario: ClvScenario) -> ClvProjection {
    match scenario.project() {
        Ok(value) => ClvProjection {
            scenario,
            clv: Some(value),
            undefined_reason: None,
        },
        Err(e) => {
            log::warn!("clv: {}", e);
            ClvProjection {
                scenario,
                clv: None,
                undefined_reason: Some(e.to_string()),
            }
        }
    }
}
