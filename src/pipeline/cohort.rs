//! Monthly acquisition cohorts and retention
//!
//! A customer's cohort is the calendar month of their first transaction in
//! the batch. Each later month in which they buy again counts them as active
//! at that month's offset. Retention at an offset is the active count divided
//! by the cohort size (the active count at offset 0).

use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;

use super::calendar::YearMonth;
use super::transaction::Transaction;

/// Lines with more units than this are wholesale
pub const WHOLESALE_QUANTITY_THRESHOLD: i64 = 50;

/// Default horizon (months after acquisition) for retention curves
pub const DEFAULT_RETENTION_HORIZON: u32 = 12;

/// Active-customer counts per cohort and month offset
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CohortMatrix {
    /// Customers acquired per cohort month
    pub cohort_sizes: BTreeMap<YearMonth, usize>,
    /// cohort -> offset -> distinct active customers. Offsets without any
    /// activity are absent.
    pub active: BTreeMap<YearMonth, BTreeMap<u32, usize>>,
}

/// One defined cell of the matrix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortCell {
    pub cohort_month: YearMonth,
    pub period_offset: u32,
    pub active_customers: usize,
    pub retention_ratio: f64,
}

/// Retention at one offset averaged across cohorts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodRetention {
    pub period_offset: u32,
    pub average_retention: f64,
    /// Cohorts contributing a defined value
    pub cohorts: usize,
}

impl CohortMatrix {
    pub fn is_empty(&self) -> bool {
        self.cohort_sizes.is_empty()
    }

    /// Cohort months in chronological order
    pub fn cohorts(&self) -> impl Iterator<Item = &YearMonth> {
        self.cohort_sizes.keys()
    }

    pub fn cohort_size(&self, cohort: &YearMonth) -> Option<usize> {
        self.cohort_sizes.get(cohort).copied()
    }

    /// Largest offset with any activity
    pub fn max_offset(&self) -> Option<u32> {
        self.active
            .values()
            .filter_map(|offsets| offsets.keys().next_back().copied())
            .max()
    }

    /// Share of the cohort active at `offset`.
    ///
    /// `None` when the cohort is unknown, has size zero, or has no activity
    /// recorded at that offset.
    pub fn retention(&self, cohort: &YearMonth, offset: u32) -> Option<f64> {
        let size = self.cohort_size(cohort)?;
        if size == 0 {
            return None;
        }
        let active = self.active.get(cohort)?.get(&offset)?;
        Some(*active as f64 / size as f64)
    }

    /// Every defined cell, by cohort then offset
    pub fn cells(&self) -> Vec<CohortCell> {
        self.active
            .iter()
            .flat_map(|(cohort, offsets)| {
                offsets.iter().filter_map(move |(&offset, &active)| {
                    self.retention(cohort, offset).map(|ratio| CohortCell {
                        cohort_month: *cohort,
                        period_offset: offset,
                        active_customers: active,
                        retention_ratio: ratio,
                    })
                })
            })
            .collect()
    }

    /// Mean retention across cohorts for offsets `0..=max_offset`.
    ///
    /// Undefined cells are skipped; an offset with no defined cell is omitted.
    pub fn average_retention_by_period(&self, max_offset: u32) -> Vec<PeriodRetention> {
        (0..=max_offset)
            .filter_map(|offset| {
                let ratios: Vec<f64> = self
                    .cohorts()
                    .filter_map(|cohort| self.retention(cohort, offset))
                    .collect();
                if ratios.is_empty() {
                    return None;
                }
                Some(PeriodRetention {
                    period_offset: offset,
                    average_retention: ratios.iter().sum::<f64>() / ratios.len() as f64,
                    cohorts: ratios.len(),
                })
            })
            .collect()
    }

    /// Sparse table: cohort_month, period_offset, active_customers, retention_ratio
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let cells = self.cells();
        let months: Vec<String> = cells.iter().map(|c| c.cohort_month.to_string()).collect();
        let offsets: Vec<u32> = cells.iter().map(|c| c.period_offset).collect();
        let active: Vec<i64> = cells.iter().map(|c| c.active_customers as i64).collect();
        let ratios: Vec<f64> = cells.iter().map(|c| c.retention_ratio).collect();

        DataFrame::new(vec![
            Column::new("cohort_month".into(), months),
            Column::new("period_offset".into(), offsets),
            Column::new("active_customers".into(), active),
            Column::new("retention_ratio".into(), ratios),
        ])
    }
}

/// Distinct active months per customer, ascending by customer id
fn customer_months(transactions: &[Transaction]) -> Vec<(&str, BTreeSet<YearMonth>)> {
    let mut by_customer: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
    for tx in transactions {
        by_customer
            .entry(tx.customer_id.as_str())
            .or_default()
            .push(tx);
    }

    by_customer
        .into_par_iter()
        .map(|(customer, lines)| {
            let months: BTreeSet<YearMonth> =
                lines.iter().map(|tx| YearMonth::of(&tx.invoice_date)).collect();
            (customer, months)
        })
        .collect()
}

/// Build the cohort matrix from cleaned transactions.
pub fn build_cohort_matrix(transactions: &[Transaction]) -> CohortMatrix {
    let customers = customer_months(transactions);

    let counts: BTreeMap<(YearMonth, u32), usize> = customers
        .par_iter()
        .fold(BTreeMap::new, |mut acc, (_, months)| {
            if let Some(cohort) = months.first() {
                for month in months {
                    // months are deduplicated and never precede the cohort
                    let offset = cohort.months_until(month) as u32;
                    *acc.entry((*cohort, offset)).or_insert(0) += 1;
                }
            }
            acc
        })
        .reduce(BTreeMap::new, |mut left, right| {
            for (key, count) in right {
                *left.entry(key).or_insert(0) += count;
            }
            left
        });

    let mut matrix = CohortMatrix::default();
    for ((cohort, offset), count) in counts {
        if offset == 0 {
            matrix.cohort_sizes.insert(cohort, count);
        }
        matrix.active.entry(cohort).or_default().insert(offset, count);
    }

    log::debug!(
        "cohort: {} customers in {} cohorts",
        customers.len(),
        matrix.cohort_sizes.len()
    );
    matrix
}

/// Realised revenue of one acquisition cohort
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortValue {
    pub cohort_month: YearMonth,
    pub customers: usize,
    pub revenue: f64,
    pub revenue_per_customer: f64,
}

/// Revenue per acquired customer for each cohort
pub fn empirical_clv_by_cohort(transactions: &[Transaction]) -> Vec<CohortValue> {
    let mut first_month: BTreeMap<&str, YearMonth> = BTreeMap::new();
    for tx in transactions {
        let month = YearMonth::of(&tx.invoice_date);
        first_month
            .entry(tx.customer_id.as_str())
            .and_modify(|m| *m = (*m).min(month))
            .or_insert(month);
    }

    let mut per_cohort: BTreeMap<YearMonth, (BTreeSet<&str>, f64)> = BTreeMap::new();
    for tx in transactions {
        if let Some(cohort) = first_month.get(tx.customer_id.as_str()) {
            let entry = per_cohort.entry(*cohort).or_default();
            entry.0.insert(tx.customer_id.as_str());
            entry.1 += tx.line_total;
        }
    }

    per_cohort
        .into_iter()
        .map(|(cohort_month, (customers, revenue))| CohortValue {
            cohort_month,
            customers: customers.len(),
            revenue,
            revenue_per_customer: revenue / customers.len() as f64,
        })
        .collect()
}

/// Customer type derived from line quantities
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ClientType {
    Wholesale,
    Retail,
}

impl ClientType {
    pub fn of_quantity(quantity: i64) -> Self {
        if quantity.abs() > WHOLESALE_QUANTITY_THRESHOLD {
            ClientType::Wholesale
        } else {
            ClientType::Retail
        }
    }
}

impl std::fmt::Display for ClientType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientType::Wholesale => write!(f, "Wholesale"),
            ClientType::Retail => write!(f, "Retail"),
        }
    }
}

/// Most frequent line type per customer; ties go to the type seen first.
pub fn main_client_types(transactions: &[Transaction]) -> BTreeMap<String, ClientType> {
    // customer -> (first seen type, wholesale lines, retail lines)
    let mut tally: BTreeMap<&str, (ClientType, usize, usize)> = BTreeMap::new();
    for tx in transactions {
        let kind = ClientType::of_quantity(tx.quantity);
        let entry = tally
            .entry(tx.customer_id.as_str())
            .or_insert((kind, 0, 0));
        match kind {
            ClientType::Wholesale => entry.1 += 1,
            ClientType::Retail => entry.2 += 1,
        }
    }

    tally
        .into_iter()
        .map(|(customer, (first, wholesale, retail))| {
            let main = if wholesale > retail {
                ClientType::Wholesale
            } else if retail > wholesale {
                ClientType::Retail
            } else {
                first
            };
            (customer.to_string(), main)
        })
        .collect()
}

/// Average retention curve of one client type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientTypeRetention {
    pub client_type: ClientType,
    pub customers: usize,
    pub curve: Vec<PeriodRetention>,
}

/// Retention curves for wholesale and retail customers separately.
///
/// Types without customers are omitted.
pub fn retention_by_client_type(
    transactions: &[Transaction],
    max_offset: u32,
) -> Vec<ClientTypeRetention> {
    let types = main_client_types(transactions);

    [ClientType::Wholesale, ClientType::Retail]
        .into_iter()
        .filter_map(|client_type| {
            let subset: Vec<Transaction> = transactions
                .iter()
                .filter(|tx| types.get(&tx.customer_id) == Some(&client_type))
                .cloned()
                .collect();
            if subset.is_empty() {
                return None;
            }
            let matrix = build_cohort_matrix(&subset);
            Some(ClientTypeRetention {
                client_type,
                customers: types.values().filter(|t| **t == client_type).count(),
                curve: matrix.average_retention_by_period(max_offset),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn tx(customer: &str, date: NaiveDateTime, qty: i64) -> Transaction {
        Transaction::new(customer, format!("{}-{}", customer, date), date, qty, 1.0, "France")
    }

    fn ym(y: i32, m: u32) -> YearMonth {
        YearMonth::new(y, m).unwrap()
    }

    #[test]
    fn test_repeat_purchases_in_one_month_count_once() {
        let txs = vec![
            tx("A", at(2011, 1, 2), 1),
            tx("A", at(2011, 1, 20), 1),
            tx("A", at(2011, 3, 5), 1),
        ];
        let matrix = build_cohort_matrix(&txs);
        assert_eq!(matrix.cohort_size(&ym(2011, 1)), Some(1));
        assert_eq!(matrix.retention(&ym(2011, 1), 0), Some(1.0));
        assert_eq!(matrix.retention(&ym(2011, 1), 1), None);
        assert_eq!(matrix.retention(&ym(2011, 1), 2), Some(1.0));
        assert_eq!(matrix.max_offset(), Some(2));
    }

    #[test]
    fn test_empty_input() {
        let matrix = build_cohort_matrix(&[]);
        assert!(matrix.is_empty());
        assert!(matrix.cells().is_empty());
        assert!(matrix.average_retention_by_period(12).is_empty());
        assert_eq!(matrix.max_offset(), None);
    }

    #[test]
    fn test_zero_size_cohort_is_undefined() {
        let mut matrix = CohortMatrix::default();
        matrix.cohort_sizes.insert(ym(2011, 1), 0);
        matrix
            .active
            .entry(ym(2011, 1))
            .or_default()
            .insert(1, 3);
        assert_eq!(matrix.retention(&ym(2011, 1), 1), None);
        assert!(matrix.cells().is_empty());
    }

    #[test]
    fn test_average_retention_skips_missing_cells() {
        let txs = vec![
            tx("A", at(2011, 1, 1), 1),
            tx("A", at(2011, 2, 1), 1),
            tx("B", at(2011, 1, 1), 1),
            tx("C", at(2011, 2, 1), 1),
        ];
        let matrix = build_cohort_matrix(&txs);
        let curve = matrix.average_retention_by_period(12);
        assert_eq!(curve.len(), 2);
        assert_eq!(curve[0].period_offset, 0);
        assert_eq!(curve[0].average_retention, 1.0);
        assert_eq!(curve[0].cohorts, 2);
        assert_eq!(curve[1].period_offset, 1);
        assert_eq!(curve[1].average_retention, 0.5);
        assert_eq!(curve[1].cohorts, 1);
    }

    #[test]
    fn test_client_type_threshold() {
        assert_eq!(ClientType::of_quantity(50), ClientType::Retail);
        assert_eq!(ClientType::of_quantity(51), ClientType::Wholesale);
        assert_eq!(ClientType::of_quantity(-60), ClientType::Wholesale);
    }

    #[test]
    fn test_main_client_type_tie_goes_to_first_seen() {
        let txs = vec![
            tx("A", at(2011, 1, 1), 100),
            tx("A", at(2011, 1, 2), 1),
            tx("B", at(2011, 1, 1), 1),
            tx("B", at(2011, 1, 2), 100),
            tx("C", at(2011, 1, 1), 1),
            tx("C", at(2011, 1, 2), 100),
            tx("C", at(2011, 1, 3), 100),
        ];
        let types = main_client_types(&txs);
        assert_eq!(types["A"], ClientType::Wholesale);
        assert_eq!(types["B"], ClientType::Retail);
        assert_eq!(types["C"], ClientType::Wholesale);
    }

    #[test]
    fn test_empirical_clv_by_cohort() {
        let txs = vec![
            tx("A", at(2011, 1, 1), 10),
            tx("A", at(2011, 3, 1), 10),
            tx("B", at(2011, 1, 5), 4),
            tx("C", at(2011, 2, 1), 6),
        ];
        let values = empirical_clv_by_cohort(&txs);
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].cohort_month, ym(2011, 1));
        assert_eq!(values[0].customers, 2);
        assert_eq!(values[0].revenue, 24.0);
        assert_eq!(values[0].revenue_per_customer, 12.0);
        assert_eq!(values[1].customers, 1);
    }

    #[test]
    fn test_to_dataframe_has_one_row_per_cell() {
        let txs = vec![tx("A", at(2011, 1, 1), 1), tx("A", at(2011, 2, 1), 1)];
        let df = build_cohort_matrix(&txs).to_dataframe().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 4);
    }
}
