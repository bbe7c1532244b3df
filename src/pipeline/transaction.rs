//! Transaction record types

use chrono::NaiveDateTime;
use serde::Serialize;

/// A canonical, validated transaction line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub customer_id: String,
    pub invoice_id: String,
    pub invoice_date: NaiveDateTime,
    /// Negative quantities are returns
    pub quantity: i64,
    pub unit_price: f64,
    pub country: String,
    /// `quantity * unit_price`
    pub line_total: f64,
}

impl Transaction {
    /// Build a transaction, deriving the line total.
    pub fn new(
        customer_id: impl Into<String>,
        invoice_id: impl Into<String>,
        invoice_date: NaiveDateTime,
        quantity: i64,
        unit_price: f64,
        country: impl Into<String>,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            invoice_id: invoice_id.into(),
            invoice_date,
            quantity,
            unit_price,
            country: country.into(),
            line_total: quantity as f64 * unit_price,
        }
    }

    pub fn is_return(&self) -> bool {
        self.quantity < 0
    }
}

/// Invoice timestamp as found in the source table.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTimestamp {
    /// Already typed by the source (e.g. a Parquet datetime column)
    Parsed(NaiveDateTime),
    /// Free text still to be parsed
    Text(String),
}

/// An untyped transaction row. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTransaction {
    pub customer_id: Option<String>,
    pub invoice_id: Option<String>,
    pub invoice_date: Option<RawTimestamp>,
    pub quantity: Option<i64>,
    pub unit_price: Option<f64>,
    pub country: Option<String>,
}
