//! Shared test utilities and fixture generators

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use retailscope::pipeline::Transaction;
use std::path::PathBuf;
use tempfile::TempDir;

/// Timestamp at 10:00 on the given day
pub fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

pub fn tx(customer: &str, invoice: &str, date: NaiveDateTime, quantity: i64, price: f64) -> Transaction {
    Transaction::new(customer, invoice, date, quantity, price, "United Kingdom")
}

/// Three customers across January and February 2011:
/// A buys in both months (two invoices), B only in January, C only in February.
pub fn jan_feb_cohort_transactions() -> Vec<Transaction> {
    vec![
        tx("A", "1001", at(2011, 1, 5), 2, 10.0),
        tx("B", "1002", at(2011, 1, 12), 1, 25.0),
        tx("A", "1003", at(2011, 2, 3), 3, 10.0),
        tx("C", "1004", at(2011, 2, 20), 5, 4.0),
    ]
}

/// Deterministic synthetic transactions over twelve months of 2011.
///
/// Customer ids are `C0000..`, invoices are unique per line, quantities are
/// mostly positive with roughly one return in twenty lines.
pub fn synthetic_transactions(customers: usize, lines: usize, seed: u64) -> Vec<Transaction> {
    let mut rng = StdRng::seed_from_u64(seed);
    let countries = ["United Kingdom", "France", "Germany", "EIRE"];

    (0..lines)
        .map(|i| {
            let customer = format!("C{:04}", rng.gen_range(0..customers));
            let month = rng.gen_range(1..=12);
            let day = rng.gen_range(1..=28);
            let quantity = if rng.gen_bool(0.05) {
                -rng.gen_range(1..5)
            } else {
                rng.gen_range(1..120)
            };
            let price = (rng.gen_range(0.1..20.0f64) * 100.0).round() / 100.0;
            Transaction::new(
                customer,
                format!("{}", 500000 + i),
                at(2011, month, day),
                quantity,
                price,
                countries[rng.gen_range(0..countries.len())],
            )
        })
        .collect()
}

/// A small table in the Online Retail II column layout, with one row of each
/// kind of defect
pub fn create_retail_dataframe() -> DataFrame {
    df! {
        "Invoice" => ["536365", "536365", "536366", "C536379", "536380", "536381", "536382"],
        "StockCode" => ["85123A", "71053", "22633", "D", "22728", "22727", "22726"],
        "Quantity" => [Some(6i64), Some(6), Some(6), Some(-1), Some(24), Some(3), None],
        "InvoiceDate" => [
            "2010-12-01 08:26:00",
            "2010-12-01 08:26:00",
            "2010-12-01 08:28:00",
            "2010-12-01 09:41:00",
            "not a date",
            "2010-12-02 10:00:00",
            "2010-12-02 11:00:00",
        ],
        "Price" => [2.55f64, 3.39, 1.85, 27.5, 3.75, 2.1, 1.0],
        "Customer ID" => [Some(17850.0f64), Some(17850.0), Some(17850.0), Some(14527.0), Some(13047.0), None, Some(13047.0)],
        "Country" => ["United Kingdom", "United Kingdom", "United Kingdom", "United Kingdom", "France", "France", "France"],
    }
    .unwrap()
}

/// Write `df` to a CSV file inside `dir`
pub fn write_csv(dir: &TempDir, name: &str, df: &mut DataFrame) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();
    path
}

/// Write `df` to a Parquet file inside `dir`
pub fn write_parquet(dir: &TempDir, name: &str, df: &mut DataFrame) -> PathBuf {
    let path = dir.path().join(name);
    let file = std::fs::File::create(&path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();
    path
}

/// Synthetic transactions as an Online Retail II style table
pub fn transactions_to_dataframe(transactions: &[Transaction]) -> DataFrame {
    let invoices: Vec<&str> = transactions.iter().map(|t| t.invoice_id.as_str()).collect();
    let quantities: Vec<i64> = transactions.iter().map(|t| t.quantity).collect();
    let dates: Vec<String> = transactions
        .iter()
        .map(|t| t.invoice_date.format("%Y-%m-%d %H:%M:%S").to_string())
        .collect();
    let prices: Vec<f64> = transactions.iter().map(|t| t.unit_price).collect();
    let customers: Vec<&str> = transactions.iter().map(|t| t.customer_id.as_str()).collect();
    let countries: Vec<&str> = transactions.iter().map(|t| t.country.as_str()).collect();

    DataFrame::new(vec![
        Column::new("Invoice".into(), invoices),
        Column::new("Quantity".into(), quantities),
        Column::new("InvoiceDate".into(), dates),
        Column::new("Price".into(), prices),
        Column::new("Customer ID".into(), customers),
        Column::new("Country".into(), countries),
    ])
    .unwrap()
}
