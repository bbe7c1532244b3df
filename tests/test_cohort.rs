//! Tests for the cohort retention matrix

use retailscope::pipeline::*;

#[path = "common/mod.rs"]
mod common;

use common::*;

fn ym(year: i32, month: u32) -> YearMonth {
    YearMonth::new(year, month).unwrap()
}

#[test]
fn test_three_customer_jan_feb_scenario() {
    let matrix = build_cohort_matrix(&jan_feb_cohort_transactions());

    assert_eq!(matrix.cohort_size(&ym(2011, 1)), Some(2));
    assert_eq!(matrix.retention(&ym(2011, 1), 0), Some(1.0));
    assert_eq!(matrix.retention(&ym(2011, 1), 1), Some(0.5));
    assert_eq!(matrix.cohort_size(&ym(2011, 2)), Some(1));
    assert_eq!(matrix.retention(&ym(2011, 2), 0), Some(1.0));
    assert_eq!(matrix.retention(&ym(2011, 2), 1), None);
}

#[test]
fn test_offset_zero_is_always_full_retention() {
    let matrix = build_cohort_matrix(&synthetic_transactions(300, 5000, 17));
    assert!(!matrix.is_empty());
    for cohort in matrix.cohorts() {
        assert_eq!(matrix.retention(cohort, 0), Some(1.0), "cohort {}", cohort);
    }
}

#[test]
fn test_retention_values_are_ratios() {
    let matrix = build_cohort_matrix(&synthetic_transactions(300, 5000, 19));
    let cells = matrix.cells();
    assert!(!cells.is_empty());
    for cell in &cells {
        assert!(
            (0.0..=1.0).contains(&cell.retention_ratio),
            "{} M+{} = {}",
            cell.cohort_month,
            cell.period_offset,
            cell.retention_ratio
        );
        assert!(cell.active_customers <= matrix.cohort_size(&cell.cohort_month).unwrap());
    }
}

#[test]
fn test_cohort_sizes_partition_customers() {
    let txs = synthetic_transactions(120, 1500, 23);
    let matrix = build_cohort_matrix(&txs);
    let customers: std::collections::HashSet<&str> =
        txs.iter().map(|t| t.customer_id.as_str()).collect();
    let total: usize = matrix.cohort_sizes.values().sum();
    assert_eq!(total, customers.len());
}

#[test]
fn test_cross_year_offsets() {
    let txs = vec![
        tx("A", "1", at(2010, 12, 15), 1, 1.0),
        tx("A", "2", at(2011, 1, 2), 1, 1.0),
        tx("A", "3", at(2011, 12, 2), 1, 1.0),
    ];
    let matrix = build_cohort_matrix(&txs);
    assert_eq!(matrix.retention(&ym(2010, 12), 1), Some(1.0));
    assert_eq!(matrix.retention(&ym(2010, 12), 12), Some(1.0));
    assert_eq!(matrix.max_offset(), Some(12));
}

#[test]
fn test_average_curve_covers_horizon() {
    let matrix = build_cohort_matrix(&synthetic_transactions(300, 6000, 29));
    let curve = matrix.average_retention_by_period(12);
    assert_eq!(curve[0].period_offset, 0);
    assert_eq!(curve[0].average_retention, 1.0);
    assert!(curve.iter().all(|p| p.period_offset <= 12));
    assert!(curve.iter().all(|p| (0.0..=1.0).contains(&p.average_retention)));
}

#[test]
fn test_client_type_curves() {
    let txs = vec![
        tx("W", "1", at(2011, 1, 3), 200, 1.0),
        tx("W", "2", at(2011, 2, 3), 120, 1.0),
        tx("R1", "3", at(2011, 1, 4), 2, 1.0),
        tx("R2", "4", at(2011, 1, 5), 1, 1.0),
        tx("R2", "5", at(2011, 3, 5), 3, 1.0),
    ];
    let curves = retention_by_client_type(&txs, 12);
    assert_eq!(curves.len(), 2);

    let wholesale = &curves[0];
    assert_eq!(wholesale.client_type, ClientType::Wholesale);
    assert_eq!(wholesale.customers, 1);
    assert_eq!(wholesale.curve[1].period_offset, 1);
    assert_eq!(wholesale.curve[1].average_retention, 1.0);

    let retail = &curves[1];
    assert_eq!(retail.client_type, ClientType::Retail);
    assert_eq!(retail.customers, 2);
    let m2 = retail.curve.iter().find(|p| p.period_offset == 2).unwrap();
    assert_eq!(m2.average_retention, 0.5);
}

#[test]
fn test_cohort_dataframe() {
    let df = build_cohort_matrix(&jan_feb_cohort_transactions())
        .to_dataframe()
        .unwrap();
    // Jan M+0, Jan M+1, Feb M+0
    assert_eq!(df.height(), 3);
    let ratios: Vec<Option<f64>> = df
        .column("retention_ratio")
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(ratios, vec![Some(1.0), Some(0.5), Some(1.0)]);
}
