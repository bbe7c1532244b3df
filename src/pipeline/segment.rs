//! Rule-based customer segments
//!
//! Segments are assigned from RFM scores by an ordered rule table: the first
//! rule that matches wins, and a customer matching none is `Other`.

use std::collections::BTreeMap;

use serde::Serialize;

use super::clv::ClvScenario;
use super::rfm::{RfmScores, RfmTable};

/// Business segment derived from RFM scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Segment {
    Champions,
    #[serde(rename = "Loyal-Potential")]
    LoyalPotential,
    #[serde(rename = "Promising-New")]
    PromisingNew,
    #[serde(rename = "At-Risk")]
    AtRisk,
    Hibernating,
    Other,
}

impl Segment {
    /// Every segment, in rule order
    pub const ALL: [Segment; 6] = [
        Segment::Champions,
        Segment::LoyalPotential,
        Segment::PromisingNew,
        Segment::AtRisk,
        Segment::Hibernating,
        Segment::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Segment::Champions => "Champions",
            Segment::LoyalPotential => "Loyal-Potential",
            Segment::PromisingNew => "Promising-New",
            Segment::AtRisk => "At-Risk",
            Segment::Hibernating => "Hibernating",
            Segment::Other => "Other",
        }
    }

    /// Suggested marketing action for the segment
    pub fn recommended_action(&self) -> &'static str {
        match self {
            Segment::Champions => "Reward and retain: loyalty perks, early access, referrals",
            Segment::LoyalPotential => "Upsell and cross-sell to grow basket size",
            Segment::PromisingNew => "Onboard: welcome offers to drive a second purchase",
            Segment::AtRisk => "Win back high-value lapsing customers with personal offers",
            Segment::Hibernating => "Low-cost reactivation campaigns or let lapse",
            Segment::Other => "Monitor",
        }
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for Segment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['_', ' '], "-");
        Segment::ALL
            .iter()
            .find(|seg| seg.label().to_lowercase() == wanted)
            .copied()
            .ok_or_else(|| format!("Unknown segment: '{}'", s))
    }
}

/// One entry of the rule table
pub struct SegmentRule {
    pub segment: Segment,
    pub applies: fn(RfmScores) -> bool,
}

fn is_champion(s: RfmScores) -> bool {
    s.r >= 4 && s.fm_average() >= 3.5
}

fn is_loyal_potential(s: RfmScores) -> bool {
    s.r >= 3 && s.fm_average() >= 2.0
}

fn is_promising_new(s: RfmScores) -> bool {
    s.r >= 3
}

fn is_at_risk(s: RfmScores) -> bool {
    s.r <= 2 && s.fm_average() >= 3.0
}

fn is_hibernating(s: RfmScores) -> bool {
    s.r <= 2
}

/// Ordered segment rules; evaluation stops at the first match
pub const SEGMENT_RULES: &[SegmentRule] = &[
    SegmentRule {
        segment: Segment::Champions,
        applies: is_champion,
    },
    SegmentRule {
        segment: Segment::LoyalPotential,
        applies: is_loyal_potential,
    },
    SegmentRule {
        segment: Segment::PromisingNew,
        applies: is_promising_new,
    },
    SegmentRule {
        segment: Segment::AtRisk,
        applies: is_at_risk,
    },
    SegmentRule {
        segment: Segment::Hibernating,
        applies: is_hibernating,
    },
];

/// Segment for a set of scores
pub fn classify(scores: RfmScores) -> Segment {
    SEGMENT_RULES
        .iter()
        .find(|rule| (rule.applies)(scores))
        .map(|rule| rule.segment)
        .unwrap_or(Segment::Other)
}

/// Per-segment aggregate of an RFM table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSummary {
    pub segment: Segment,
    pub customers: usize,
    pub total_monetary: f64,
    pub mean_recency_days: f64,
    pub mean_frequency: f64,
    pub mean_monetary: f64,
}

impl SegmentSummary {
    /// Share of all customers in the table, in percent
    pub fn share_pct(&self, total_customers: usize) -> f64 {
        if total_customers == 0 {
            0.0
        } else {
            self.customers as f64 / total_customers as f64 * 100.0
        }
    }
}

/// Aggregate the table per segment, highest mean monetary first.
///
/// Segments without customers are omitted.
pub fn summarize_segments(table: &RfmTable) -> Vec<SegmentSummary> {
    #[derive(Default)]
    struct Acc {
        customers: usize,
        recency: f64,
        frequency: f64,
        monetary: f64,
    }

    let mut acc: BTreeMap<Segment, Acc> = BTreeMap::new();
    for profile in &table.profiles {
        let entry = acc.entry(profile.segment).or_default();
        entry.customers += 1;
        entry.recency += profile.recency_days as f64;
        entry.frequency += profile.frequency as f64;
        entry.monetary += profile.monetary;
    }

    let mut summaries: Vec<SegmentSummary> = acc
        .into_iter()
        .map(|(segment, a)| {
            let n = a.customers as f64;
            SegmentSummary {
                segment,
                customers: a.customers,
                total_monetary: a.monetary,
                mean_recency_days: a.recency / n,
                mean_frequency: a.frequency / n,
                mean_monetary: a.monetary / n,
            }
        })
        .collect();

    summaries.sort_by(|a, b| b.mean_monetary.total_cmp(&a.mean_monetary));
    summaries
}

/// Projected CLV of a segment's average customer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentClv {
    pub segment: Segment,
    pub mean_monetary: f64,
    /// Under the default margin, retention and discount
    pub clv_baseline: Option<f64>,
    /// Under the configured rates
    pub clv_scenario: Option<f64>,
}

/// Baseline and configured-rate CLV for each segment, projected from the
/// segment's mean monetary value. Undefined projections are `None`.
pub fn project_segment_clv(
    summaries: &[SegmentSummary],
    margin_rate: f64,
    retention_rate: f64,
    discount_rate: f64,
) -> Vec<SegmentClv> {
    summaries
        .iter()
        .map(|summary| {
            let baseline = ClvScenario::baseline(summary.mean_monetary);
            let scenario = ClvScenario::new(
                summary.mean_monetary,
                margin_rate,
                retention_rate,
                discount_rate,
            );
            SegmentClv {
                segment: summary.segment,
                mean_monetary: summary.mean_monetary,
                clv_baseline: baseline.project().ok(),
                clv_scenario: scenario.project().ok(),
            }
        })
        .collect()
}
