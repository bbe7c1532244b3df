//! RFM (Recency / Frequency / Monetary) profiling
//!
//! Customers are aggregated from their transactions, restricted to a positive
//! lifetime value, and scored 1-4 on each dimension by quartile:
//!
//! - Recency: fewer days since the last purchase scores higher.
//! - Frequency: ranked first (ties broken by customer order) before the cut,
//!   since most customers share a handful of small invoice counts.
//! - Monetary: cut on the raw totals.
//!
//! When any dimension cannot form four distinct quartiles, every customer is
//! scored 1/1/1 and the table records which dimension failed.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDateTime;
use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;

use super::scoring::{first_seen_ranks, qcut, QUARTILES};
use super::segment::{classify, Segment};
use super::transaction::Transaction;

/// Lowest score, also used for every dimension when scoring is degenerate
const FALLBACK_SCORE: u8 = 1;

/// Quartile scores of one customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RfmScores {
    pub r: u8,
    pub f: u8,
    pub m: u8,
}

impl RfmScores {
    pub fn new(r: u8, f: u8, m: u8) -> Self {
        Self { r, f, m }
    }

    /// Mean of the frequency and monetary scores
    pub fn fm_average(&self) -> f64 {
        (self.f as f64 + self.m as f64) / 2.0
    }
}

/// One scored customer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmProfile {
    pub customer_id: String,
    pub recency_days: i64,
    /// Distinct invoices
    pub frequency: usize,
    /// Sum of line totals
    pub monetary: f64,
    pub r_score: u8,
    pub f_score: u8,
    pub m_score: u8,
    pub segment: Segment,
}

impl RfmProfile {
    pub fn scores(&self) -> RfmScores {
        RfmScores::new(self.r_score, self.f_score, self.m_score)
    }
}

/// RFM dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RfmDimension {
    Recency,
    Frequency,
    Monetary,
}

impl std::fmt::Display for RfmDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RfmDimension::Recency => write!(f, "recency"),
            RfmDimension::Frequency => write!(f, "frequency"),
            RfmDimension::Monetary => write!(f, "monetary"),
        }
    }
}

/// How the quartile scores were obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScoringOutcome {
    /// No customer with a positive monetary value
    Empty,
    /// All three dimensions were cut into quartiles
    Quartiles,
    /// `dimension` could not form four bins; every score is 1
    Degenerate { dimension: RfmDimension },
}

impl ScoringOutcome {
    /// Warning text for a degenerate outcome
    pub fn warning(&self) -> Option<String> {
        match self {
            ScoringOutcome::Degenerate { dimension } => Some(format!(
                "Too few distinct {} values to form {} quantile bins; all customers scored {}",
                dimension, QUARTILES, FALLBACK_SCORE
            )),
            _ => None,
        }
    }
}

/// Scored customer table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmTable {
    /// Instant recency was measured from; `None` when nothing was analysed
    pub reference_date: Option<NaiveDateTime>,
    /// One row per customer, ascending by customer id
    pub profiles: Vec<RfmProfile>,
    pub scoring: ScoringOutcome,
}

impl RfmTable {
    /// A table with no customers
    pub fn empty(reference_date: Option<NaiveDateTime>) -> Self {
        Self {
            reference_date,
            profiles: Vec::new(),
            scoring: ScoringOutcome::Empty,
        }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Mean monetary value across customers
    pub fn average_monetary(&self) -> Option<f64> {
        if self.profiles.is_empty() {
            return None;
        }
        let total: f64 = self.profiles.iter().map(|p| p.monetary).sum();
        Some(total / self.profiles.len() as f64)
    }

    /// Profiles whose segment is one of `segments`
    pub fn select_segments(&self, segments: &[Segment]) -> Vec<&RfmProfile> {
        self.profiles
            .iter()
            .filter(|p| segments.contains(&p.segment))
            .collect()
    }

    /// Flat table: customer_id, recency_days, frequency, monetary, r/f/m scores
    /// and segment_label. An empty table keeps the full schema.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let customer_ids: Vec<&str> = self.profiles.iter().map(|p| p.customer_id.as_str()).collect();
        let recency: Vec<i64> = self.profiles.iter().map(|p| p.recency_days).collect();
        let frequency: Vec<i64> = self.profiles.iter().map(|p| p.frequency as i64).collect();
        let monetary: Vec<f64> = self.profiles.iter().map(|p| p.monetary).collect();
        let r_scores: Vec<i32> = self.profiles.iter().map(|p| p.r_score as i32).collect();
        let f_scores: Vec<i32> = self.profiles.iter().map(|p| p.f_score as i32).collect();
        let m_scores: Vec<i32> = self.profiles.iter().map(|p| p.m_score as i32).collect();
        let labels: Vec<&str> = self.profiles.iter().map(|p| p.segment.label()).collect();

        DataFrame::new(vec![
            Column::new("customer_id".into(), customer_ids),
            Column::new("recency_days".into(), recency),
            Column::new("frequency".into(), frequency),
            Column::new("monetary".into(), monetary),
            Column::new("r_score".into(), r_scores),
            Column::new("f_score".into(), f_scores),
            Column::new("m_score".into(), m_scores),
            Column::new("segment_label".into(), labels),
        ])
    }
}

/// Raw per-customer aggregates before scoring
#[derive(Debug, Clone, PartialEq)]
struct CustomerAggregate {
    customer_id: String,
    recency_days: i64,
    frequency: usize,
    monetary: f64,
}

/// Build the scored RFM table.
///
/// `reference_date` is the "as of" instant for recency. Purchases after it
/// count as recency 0.
pub fn build_rfm_table(transactions: &[Transaction], reference_date: NaiveDateTime) -> RfmTable {
    let aggregates: Vec<CustomerAggregate> = aggregate_customers(transactions, reference_date)
        .into_iter()
        .filter(|c| c.monetary > 0.0)
        .collect();

    if aggregates.is_empty() {
        log::info!("rfm: no customer with positive monetary value");
        return RfmTable::empty(Some(reference_date));
    }

    let (scores, scoring) = score_customers(&aggregates);
    if let Some(warning) = scoring.warning() {
        log::warn!("rfm: {}", warning);
    }

    let profiles: Vec<RfmProfile> = aggregates
        .into_iter()
        .zip(scores)
        .map(|(agg, s)| RfmProfile {
            customer_id: agg.customer_id,
            recency_days: agg.recency_days,
            frequency: agg.frequency,
            monetary: agg.monetary,
            r_score: s.r,
            f_score: s.f,
            m_score: s.m,
            segment: classify(s),
        })
        .collect();

    log::debug!("rfm: scored {} customers", profiles.len());

    RfmTable {
        reference_date: Some(reference_date),
        profiles,
        scoring,
    }
}

/// Group by customer and aggregate each customer independently.
///
/// Customers are sharded across the rayon pool; each customer's lines are
/// summed in input order so the totals do not depend on scheduling.
fn aggregate_customers(
    transactions: &[Transaction],
    reference_date: NaiveDateTime,
) -> Vec<CustomerAggregate> {
    let mut by_customer: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
    for tx in transactions {
        by_customer
            .entry(tx.customer_id.as_str())
            .or_default()
            .push(tx);
    }

    let groups: Vec<(&str, Vec<&Transaction>)> = by_customer.into_iter().collect();

    groups
        .par_iter()
        .filter_map(|(customer_id, lines)| {
            let latest = lines.iter().map(|tx| tx.invoice_date).max()?;
            let invoices: HashSet<&str> = lines.iter().map(|tx| tx.invoice_id.as_str()).collect();
            let monetary: f64 = lines.iter().map(|tx| tx.line_total).sum();

            Some(CustomerAggregate {
                customer_id: customer_id.to_string(),
                recency_days: (reference_date - latest).num_days().max(0),
                frequency: invoices.len(),
                monetary,
            })
        })
        .collect()
}

fn score_customers(aggregates: &[CustomerAggregate]) -> (Vec<RfmScores>, ScoringOutcome) {
    let recency: Vec<f64> = aggregates.iter().map(|c| c.recency_days as f64).collect();
    let frequency: Vec<f64> = aggregates.iter().map(|c| c.frequency as f64).collect();
    let monetary: Vec<f64> = aggregates.iter().map(|c| c.monetary).collect();

    let cuts = qcut(&recency, QUARTILES)
        .map_err(|_| RfmDimension::Recency)
        .and_then(|r| {
            qcut(&first_seen_ranks(&frequency), QUARTILES)
                .map(|f| (r, f))
                .map_err(|_| RfmDimension::Frequency)
        })
        .and_then(|(r, f)| {
            qcut(&monetary, QUARTILES)
                .map(|m| (r, f, m))
                .map_err(|_| RfmDimension::Monetary)
        });

    match cuts {
        Ok((r_bins, f_bins, m_bins)) => {
            let scores = r_bins
                .iter()
                .zip(&f_bins)
                .zip(&m_bins)
                .map(|((&r, &f), &m)| {
                    // Recency labels run in reverse: the most recent bin scores highest
                    RfmScores::new((QUARTILES - r) as u8, (f + 1) as u8, (m + 1) as u8)
                })
                .collect();
            (scores, ScoringOutcome::Quartiles)
        }
        Err(dimension) => (
            vec![RfmScores::new(FALLBACK_SCORE, FALLBACK_SCORE, FALLBACK_SCORE); aggregates.len()],
            ScoringOutcome::Degenerate { dimension },
        ),
    }
}
