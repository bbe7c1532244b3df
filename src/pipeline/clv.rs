//! Customer lifetime value projection
//!
//! Uses the simple retention/discount model
//!
//! ```text
//! clv = average_monetary * margin * retention / (1 + discount - retention)
//! ```
//!
//! A zero denominator has no meaningful value; it is reported as an error
//! (or `None` on the sensitivity grid) rather than as zero or infinity.

use serde::Serialize;
use thiserror::Error;

/// Denominators closer to zero than this are treated as zero
pub const DENOMINATOR_TOLERANCE: f64 = 1e-12;

pub const DEFAULT_MARGIN_RATE: f64 = 0.20;
pub const DEFAULT_RETENTION_RATE: f64 = 0.60;
pub const DEFAULT_DISCOUNT_RATE: f64 = 0.10;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClvError {
    #[error(
        "CLV is undefined: 1 + discount ({discount_rate}) - retention ({retention_rate}) is zero"
    )]
    DegenerateDenominator {
        retention_rate: f64,
        discount_rate: f64,
    },

    #[error("Invalid CLV parameter '{name}': {value} is not a finite number")]
    InvalidParameter { name: &'static str, value: f64 },
}

/// Inputs of one CLV projection
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClvScenario {
    pub average_monetary: f64,
    pub margin_rate: f64,
    pub retention_rate: f64,
    pub discount_rate: f64,
}

impl ClvScenario {
    pub fn new(
        average_monetary: f64,
        margin_rate: f64,
        retention_rate: f64,
        discount_rate: f64,
    ) -> Self {
        Self {
            average_monetary,
            margin_rate,
            retention_rate,
            discount_rate,
        }
    }

    /// Default margin, retention and discount applied to `average_monetary`
    pub fn baseline(average_monetary: f64) -> Self {
        Self::new(
            average_monetary,
            DEFAULT_MARGIN_RATE,
            DEFAULT_RETENTION_RATE,
            DEFAULT_DISCOUNT_RATE,
        )
    }

    pub fn denominator(&self) -> f64 {
        1.0 + self.discount_rate - self.retention_rate
    }

    fn validate(&self) -> Result<(), ClvError> {
        let params = [
            ("average_monetary", self.average_monetary),
            ("margin_rate", self.margin_rate),
            ("retention_rate", self.retention_rate),
            ("discount_rate", self.discount_rate),
        ];
        for (name, value) in params {
            if !value.is_finite() {
                return Err(ClvError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }

    /// Projected lifetime value of one customer
    pub fn project(&self) -> Result<f64, ClvError> {
        self.validate()?;
        let denominator = self.denominator();
        if denominator.abs() < DENOMINATOR_TOLERANCE {
            return Err(ClvError::DegenerateDenominator {
                retention_rate: self.retention_rate,
                discount_rate: self.discount_rate,
            });
        }
        Ok(self.average_monetary * self.margin_rate * self.retention_rate / denominator)
    }
}

/// Project CLV from the four scalar inputs.
pub fn project_clv(
    average_monetary: f64,
    margin_rate: f64,
    retention_rate: f64,
    discount_rate: f64,
) -> Result<f64, ClvError> {
    ClvScenario::new(average_monetary, margin_rate, retention_rate, discount_rate).project()
}

/// `points` evenly spaced values from `start` to `end` inclusive
pub fn linspace(start: f64, end: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![start],
        n => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Axes of the sensitivity grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridSpec {
    pub retention_min: f64,
    pub retention_max: f64,
    pub margin_min: f64,
    pub margin_max: f64,
    /// Points along each axis
    pub points: usize,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            retention_min: 0.3,
            retention_max: 0.9,
            margin_min: 0.1,
            margin_max: 0.4,
            points: 15,
        }
    }
}

impl GridSpec {
    pub fn retention_values(&self) -> Vec<f64> {
        linspace(self.retention_min, self.retention_max, self.points)
    }

    pub fn margin_values(&self) -> Vec<f64> {
        linspace(self.margin_min, self.margin_max, self.points)
    }
}

/// CLV over a retention x margin grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivitySurface {
    pub average_monetary: f64,
    pub discount_rate: f64,
    pub retention_values: Vec<f64>,
    pub margin_values: Vec<f64>,
    /// `values[margin_index][retention_index]`; `None` where undefined
    pub values: Vec<Vec<Option<f64>>>,
}

impl SensitivitySurface {
    pub fn get(&self, margin_index: usize, retention_index: usize) -> Option<f64> {
        self.values
            .get(margin_index)
            .and_then(|row| row.get(retention_index))
            .copied()
            .flatten()
    }

    /// Largest defined value and its (margin, retention) coordinates
    pub fn max_cell(&self) -> Option<(f64, f64, f64)> {
        self.values
            .iter()
            .zip(&self.margin_values)
            .flat_map(|(row, &margin)| {
                row.iter()
                    .zip(&self.retention_values)
                    .filter_map(move |(v, &retention)| v.map(|v| (margin, retention, v)))
            })
            .max_by(|a, b| a.2.total_cmp(&b.2))
    }
}

/// Sensitivity surface over explicit axis values
pub fn sensitivity_surface_over(
    average_monetary: f64,
    discount_rate: f64,
    retention_values: &[f64],
    margin_values: &[f64],
) -> SensitivitySurface {
    let values = margin_values
        .iter()
        .map(|&margin| {
            retention_values
                .iter()
                .map(|&retention| {
                    project_clv(average_monetary, margin, retention, discount_rate).ok()
                })
                .collect()
        })
        .collect();

    SensitivitySurface {
        average_monetary,
        discount_rate,
        retention_values: retention_values.to_vec(),
        margin_values: margin_values.to_vec(),
        values,
    }
}

/// Sensitivity surface over the axes described by `grid`
pub fn sensitivity_surface(
    average_monetary: f64,
    discount_rate: f64,
    grid: &GridSpec,
) -> SensitivitySurface {
    sensitivity_surface_over(
        average_monetary,
        discount_rate,
        &grid.retention_values(),
        &grid.margin_values(),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurvePoint {
    pub retention_rate: f64,
    pub clv: Option<f64>,
}

/// CLV as a function of retention at a fixed margin
pub fn retention_curve(
    average_monetary: f64,
    margin_rate: f64,
    discount_rate: f64,
    retention_values: &[f64],
) -> Vec<CurvePoint> {
    retention_values
        .iter()
        .map(|&retention_rate| CurvePoint {
            retention_rate,
            clv: project_clv(average_monetary, margin_rate, retention_rate, discount_rate).ok(),
        })
        .collect()
}

/// Named what-if variants of the baseline
pub fn predefined_scenarios(baseline: &ClvScenario) -> Vec<(&'static str, ClvScenario)> {
    vec![
        (
            "Optimistic",
            ClvScenario {
                retention_rate: baseline.retention_rate + 0.10,
                ..*baseline
            },
        ),
        (
            "Aggressive",
            ClvScenario {
                margin_rate: baseline.margin_rate + 0.10,
                ..*baseline
            },
        ),
        (
            "Conservative",
            ClvScenario {
                retention_rate: baseline.retention_rate - 0.05,
                ..*baseline
            },
        ),
    ]
}

/// One scenario evaluated against the baseline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioComparison {
    pub name: String,
    pub scenario: ClvScenario,
    pub clv: Option<f64>,
    /// `clv - baseline`; `None` when either side is undefined
    pub delta: Option<f64>,
    /// Delta relative to the baseline, in percent
    pub delta_pct: Option<f64>,
}

/// Evaluate each named scenario against `baseline`.
pub fn compare_scenarios(
    baseline: &ClvScenario,
    scenarios: &[(&str, ClvScenario)],
) -> Vec<ScenarioComparison> {
    let base = baseline.project().ok();

    scenarios
        .iter()
        .map(|(name, scenario)| {
            let clv = scenario.project().ok();
            let delta = clv.zip(base).map(|(c, b)| c - b);
            let delta_pct = delta
                .zip(base)
                .and_then(|(d, b)| (b != 0.0).then(|| d / b * 100.0));
            ScenarioComparison {
                name: name.to_string(),
                scenario: *scenario,
                clv,
                delta,
                delta_pct,
            }
        })
        .collect()
}

/// Return on a retention or margin initiative
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InitiativeRoi {
    pub value_created: f64,
    /// `None` when the initiative costs nothing
    pub roi_pct: Option<f64>,
    /// `None` when no value is created
    pub payback_days: Option<f64>,
}

pub fn initiative_roi(
    clv_baseline: f64,
    clv_scenario: f64,
    affected_customers: usize,
    cost: f64,
) -> InitiativeRoi {
    let value_created = (clv_scenario - clv_baseline) * affected_customers as f64;
    let roi_pct = (cost != 0.0).then(|| (value_created - cost) / cost * 100.0);
    let payback_days = (value_created > 0.0).then(|| cost / (value_created / 365.0));

    InitiativeRoi {
        value_created,
        roi_pct,
        payback_days,
    }
}
