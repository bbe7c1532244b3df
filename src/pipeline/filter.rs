//! Analysis window filtering
//!
//! The filter is an explicit value handed to the analysis, so the same
//! transaction batch can be re-analysed under different windows without any
//! shared state.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::transaction::Transaction;

/// How return lines (negative quantity) are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ReturnMode {
    /// Keep only positive-quantity lines (default)
    #[default]
    ExcludeReturns,
    /// Keep sales and returns
    IncludeAll,
    /// Keep only return lines
    ReturnsOnly,
}

impl ReturnMode {
    fn keeps(&self, tx: &Transaction) -> bool {
        match self {
            ReturnMode::ExcludeReturns => tx.quantity > 0,
            ReturnMode::IncludeAll => true,
            ReturnMode::ReturnsOnly => tx.is_return(),
        }
    }
}

impl std::fmt::Display for ReturnMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReturnMode::ExcludeReturns => write!(f, "exclude"),
            ReturnMode::IncludeAll => write!(f, "include"),
            ReturnMode::ReturnsOnly => write!(f, "only"),
        }
    }
}

impl std::str::FromStr for ReturnMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exclude" => Ok(ReturnMode::ExcludeReturns),
            "include" | "all" => Ok(ReturnMode::IncludeAll),
            "only" => Ok(ReturnMode::ReturnsOnly),
            _ => Err(format!(
                "Unknown return mode: '{}'. Use 'exclude', 'include' or 'only'.",
                s
            )),
        }
    }
}

/// Which transactions enter the analysis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisFilter {
    /// Inclusive calendar-date window; `None` keeps every date
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    /// Countries to keep; empty keeps every country
    pub countries: BTreeSet<String>,
    pub return_mode: ReturnMode,
}

impl AnalysisFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        if let Some((start, end)) = self.date_range {
            let day = tx.invoice_date.date();
            if day < start || day > end {
                return false;
            }
        }

        if !self.countries.is_empty() && !self.countries.contains(&tx.country) {
            return false;
        }

        self.return_mode.keeps(tx)
    }

    /// Transactions passing the filter, in input order
    pub fn apply(&self, transactions: &[Transaction]) -> Vec<Transaction> {
        let kept: Vec<Transaction> = transactions
            .iter()
            .filter(|tx| self.matches(tx))
            .cloned()
            .collect();
        log::debug!(
            "filter: kept {} of {} transactions ({})",
            kept.len(),
            transactions.len(),
            self.return_mode
        );
        kept
    }

    /// The "as of" instant used for recency.
    ///
    /// With a date window this is the start of the window's end date. Without
    /// one it is the start of the day after the latest transaction. `None` for
    /// an empty batch without a window.
    pub fn reference_date(&self, transactions: &[Transaction]) -> Option<NaiveDateTime> {
        match self.date_range {
            Some((_, end)) => end.and_hms_opt(0, 0, 0),
            None => transactions
                .iter()
                .map(|tx| tx.invoice_date.date())
                .max()
                .and_then(|d| d.checked_add_signed(Duration::days(1)))
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
        }
    }
}
