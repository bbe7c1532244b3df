//! Transaction normalization
//!
//! Turns raw transaction rows into canonical [`Transaction`] records. Rows that
//! cannot be used are dropped and counted, never fatal: a missing customer id,
//! a missing or unparsable invoice date, or an unusable amount excludes the row
//! and the rest of the batch proceeds.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone as _};
use polars::prelude::*;
use serde::Serialize;

use super::error::AnalysisError;
use super::transaction::{RawTimestamp, RawTransaction, Transaction};

/// Text layouts accepted for invoice timestamps, tried in order
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

const CUSTOMER_ID_ALIASES: &[&str] = &["Customer ID", "CustomerID", "customer_id"];
const INVOICE_ID_ALIASES: &[&str] = &["Invoice", "InvoiceNo", "invoice_id"];
const INVOICE_DATE_ALIASES: &[&str] = &["InvoiceDate", "invoice_date"];
const QUANTITY_ALIASES: &[&str] = &["Quantity", "quantity"];
const UNIT_PRICE_ALIASES: &[&str] = &["Price", "UnitPrice", "unit_price"];
const COUNTRY_ALIASES: &[&str] = &["Country", "country"];

/// Source column names for each transaction field.
///
/// Defaults follow the Online Retail II export layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    pub customer_id: String,
    pub invoice_id: String,
    pub invoice_date: String,
    pub quantity: String,
    pub unit_price: String,
    /// Optional in the source; rows get an empty country when absent
    pub country: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            customer_id: CUSTOMER_ID_ALIASES[0].to_string(),
            invoice_id: INVOICE_ID_ALIASES[0].to_string(),
            invoice_date: INVOICE_DATE_ALIASES[0].to_string(),
            quantity: QUANTITY_ALIASES[0].to_string(),
            unit_price: UNIT_PRICE_ALIASES[0].to_string(),
            country: COUNTRY_ALIASES[0].to_string(),
        }
    }
}

impl ColumnMapping {
    /// Pick column names from the known aliases present in `df`.
    ///
    /// Fields with no matching alias keep the default name, so a genuinely
    /// missing column is still reported by [`normalize_dataframe`].
    pub fn detect(df: &DataFrame) -> Self {
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let pick = |aliases: &[&str]| -> String {
            aliases
                .iter()
                .find(|alias| names.iter().any(|n| n == *alias))
                .unwrap_or(&aliases[0])
                .to_string()
        };

        Self {
            customer_id: pick(CUSTOMER_ID_ALIASES),
            invoice_id: pick(INVOICE_ID_ALIASES),
            invoice_date: pick(INVOICE_DATE_ALIASES),
            quantity: pick(QUANTITY_ALIASES),
            unit_price: pick(UNIT_PRICE_ALIASES),
            country: pick(COUNTRY_ALIASES),
        }
    }
}

/// Counts of rows kept and dropped during normalization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationReport {
    pub input_rows: usize,
    pub kept_rows: usize,
    pub missing_customer: usize,
    pub missing_invoice: usize,
    /// Missing or unparsable invoice date
    pub invalid_date: usize,
    /// Missing or fractional quantity, missing price, or a negative or
    /// non-finite price
    pub invalid_amount: usize,
}

impl NormalizationReport {
    /// Total rows excluded from the canonical set
    pub fn dropped(&self) -> usize {
        self.missing_customer + self.missing_invoice + self.invalid_date + self.invalid_amount
    }
}

/// Canonical transactions plus the drop accounting
#[derive(Debug, Clone, Default)]
pub struct NormalizedTransactions {
    pub transactions: Vec<Transaction>,
    pub report: NormalizationReport,
}

/// Why a single row was excluded
enum RowRejection {
    MissingCustomer,
    MissingInvoice,
    InvalidDate,
    InvalidAmount,
}

/// Normalize raw rows into canonical transactions.
pub fn normalize_rows(rows: &[RawTransaction]) -> NormalizedTransactions {
    let mut report = NormalizationReport {
        input_rows: rows.len(),
        ..Default::default()
    };
    let mut transactions = Vec::with_capacity(rows.len());

    for row in rows {
        match normalize_row(row) {
            Ok(tx) => transactions.push(tx),
            Err(RowRejection::MissingCustomer) => report.missing_customer += 1,
            Err(RowRejection::MissingInvoice) => report.missing_invoice += 1,
            Err(RowRejection::InvalidDate) => report.invalid_date += 1,
            Err(RowRejection::InvalidAmount) => report.invalid_amount += 1,
        }
    }
    report.kept_rows = transactions.len();

    if report.dropped() > 0 {
        log::warn!(
            "normalize: dropped {} of {} rows (missing customer: {}, missing invoice: {}, invalid date: {}, invalid amount: {})",
            report.dropped(),
            report.input_rows,
            report.missing_customer,
            report.missing_invoice,
            report.invalid_date,
            report.invalid_amount
        );
    } else {
        log::debug!("normalize: kept all {} rows", report.input_rows);
    }

    NormalizedTransactions {
        transactions,
        report,
    }
}

fn normalize_row(row: &RawTransaction) -> Result<Transaction, RowRejection> {
    let customer_id = non_blank(row.customer_id.as_deref()).ok_or(RowRejection::MissingCustomer)?;
    let invoice_id = non_blank(row.invoice_id.as_deref()).ok_or(RowRejection::MissingInvoice)?;

    let invoice_date = match &row.invoice_date {
        Some(RawTimestamp::Parsed(ts)) => *ts,
        Some(RawTimestamp::Text(text)) => {
            parse_invoice_date(text).ok_or(RowRejection::InvalidDate)?
        }
        None => return Err(RowRejection::InvalidDate),
    };

    let quantity = row.quantity.ok_or(RowRejection::InvalidAmount)?;
    let unit_price = row
        .unit_price
        .filter(|p| p.is_finite() && *p >= 0.0)
        .ok_or(RowRejection::InvalidAmount)?;

    let country = row
        .country
        .as_deref()
        .map(str::trim)
        .unwrap_or_default();

    Ok(Transaction::new(
        customer_id,
        invoice_id,
        invoice_date,
        quantity,
        unit_price,
        country,
    ))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Parse an invoice timestamp from text.
///
/// Accepts RFC 3339, `YYYY-MM-DD[ T]HH:MM[:SS[.fff]]`, `MM/DD/YYYY HH:MM[:SS]`
/// and bare dates (taken as midnight). Returns `None` for anything else.
/// An explicit offset is kept as the local wall-clock time it annotates.
pub fn parse_invoice_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Normalize a transaction table.
///
/// Columns are read through `mapping`; the country column is optional. Row
/// problems are counted in the report, while a missing required column is an
/// error.
pub fn normalize_dataframe(
    df: &DataFrame,
    mapping: &ColumnMapping,
) -> Result<NormalizedTransactions, AnalysisError> {
    let height = df.height();

    let customer_ids = identifier_values(df, &mapping.customer_id)?;
    let invoice_ids = identifier_values(df, &mapping.invoice_id)?;
    let invoice_dates = timestamp_values(df, &mapping.invoice_date)?;
    let quantities = integer_values(df, &mapping.quantity)?;
    let unit_prices = float_values(df, &mapping.unit_price)?;
    let countries = if has_column(df, &mapping.country) {
        identifier_values(df, &mapping.country)?
    } else {
        vec![None; height]
    };

    for (name, len) in [
        (&mapping.customer_id, customer_ids.len()),
        (&mapping.invoice_id, invoice_ids.len()),
        (&mapping.invoice_date, invoice_dates.len()),
        (&mapping.quantity, quantities.len()),
        (&mapping.unit_price, unit_prices.len()),
        (&mapping.country, countries.len()),
    ] {
        if len != height {
            return Err(AnalysisError::RaggedColumn {
                column: name.clone(),
                expected: height,
                actual: len,
            });
        }
    }

    let rows: Vec<RawTransaction> = customer_ids
        .into_iter()
        .zip(invoice_ids)
        .zip(invoice_dates)
        .zip(quantities)
        .zip(unit_prices)
        .zip(countries)
        .map(
            |(((((customer_id, invoice_id), invoice_date), quantity), unit_price), country)| {
                RawTransaction {
                    customer_id,
                    invoice_id,
                    invoice_date,
                    quantity,
                    unit_price,
                    country,
                }
            },
        )
        .collect();

    Ok(normalize_rows(&rows))
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, AnalysisError> {
    df.column(name).map_err(|_| AnalysisError::MissingColumn {
        column: name.to_string(),
    })
}

/// Read an identifier column as text.
///
/// Spreadsheet exports often store ids as floats (`17850.0`); whole floats are
/// rendered without the fractional part.
fn identifier_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, AnalysisError> {
    let column = require_column(df, name)?;

    let values = match column.dtype() {
        DataType::Float32 | DataType::Float64 => {
            let cast = column.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| v.filter(|f| f.is_finite()).map(format_identifier))
                .collect()
        }
        _ => {
            let cast = column.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.map(|s| s.trim().to_string()))
                .collect()
        }
    };

    Ok(values)
}

fn format_identifier(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Zone of a timezone-aware datetime column
enum LocalZone {
    Named(chrono_tz::Tz),
    Fixed(FixedOffset),
}

impl LocalZone {
    /// IANA name (`Europe/London`) or fixed offset (`+01:00`)
    fn parse(name: &str) -> Option<Self> {
        name.parse::<chrono_tz::Tz>()
            .ok()
            .map(LocalZone::Named)
            .or_else(|| name.parse::<FixedOffset>().ok().map(LocalZone::Fixed))
    }

    /// Wall-clock time in this zone of a UTC instant
    fn local(&self, utc: &NaiveDateTime) -> NaiveDateTime {
        match self {
            LocalZone::Named(tz) => tz.from_utc_datetime(utc).naive_local(),
            LocalZone::Fixed(offset) => offset.from_utc_datetime(utc).naive_local(),
        }
    }
}

/// Read invoice timestamps.
///
/// Timezone-aware datetimes are stored as UTC instants; they are converted to
/// the column's local time so cohort months follow the invoice's own calendar.
fn timestamp_values(df: &DataFrame, name: &str) -> Result<Vec<Option<RawTimestamp>>, AnalysisError> {
    let column = require_column(df, name)?;

    let values = match column.dtype() {
        DataType::Datetime(unit, tz) => {
            let unit = *unit;
            let zone = match tz.as_ref().map(|tz| tz.as_str()) {
                Some(tz_name) => {
                    let zone = LocalZone::parse(tz_name);
                    if zone.is_none() {
                        log::warn!(
                            "normalize: unknown time zone '{}' on column '{}'; using UTC",
                            tz_name,
                            name
                        );
                    }
                    zone
                }
                None => None,
            };
            let cast = column.cast(&DataType::Int64)?;
            cast.i64()?
                .into_iter()
                .map(|v| {
                    v.and_then(|raw| datetime_from_epoch(raw, unit))
                        .map(|utc| match &zone {
                            Some(zone) => zone.local(&utc),
                            None => utc,
                        })
                        .map(RawTimestamp::Parsed)
                })
                .collect()
        }
        DataType::Date => {
            let cast = column.cast(&DataType::Int32)?;
            cast.i32()?
                .into_iter()
                .map(|v| v.and_then(date_from_epoch_days).map(RawTimestamp::Parsed))
                .collect()
        }
        _ => {
            let cast = column.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.map(|s| RawTimestamp::Text(s.to_string())))
                .collect()
        }
    };

    Ok(values)
}

fn datetime_from_epoch(raw: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let per_second: i64 = match unit {
        TimeUnit::Nanoseconds => 1_000_000_000,
        TimeUnit::Microseconds => 1_000_000,
        TimeUnit::Milliseconds => 1_000,
    };
    let secs = raw.div_euclid(per_second);
    let nanos = raw.rem_euclid(per_second) * (1_000_000_000 / per_second);
    DateTime::from_timestamp(secs, nanos as u32).map(|dt| dt.naive_utc())
}

fn date_from_epoch_days(days: i32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1970, 1, 1)?
        .checked_add_signed(chrono::Duration::days(days as i64))?
        .and_hms_opt(0, 0, 0)
}

/// Read a whole-number column.
///
/// Float columns are accepted, but a fractional or non-finite value reads as
/// missing rather than being truncated.
fn integer_values(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>, AnalysisError> {
    let column = require_column(df, name)?;

    let values = match column.dtype() {
        DataType::Float32 | DataType::Float64 => {
            let cast = column.cast(&DataType::Float64)?;
            cast.f64()?.into_iter().map(|v| v.and_then(whole_number)).collect()
        }
        _ => {
            let cast = column.cast(&DataType::Int64)?;
            cast.i64()?.into_iter().collect()
        }
    };

    Ok(values)
}

fn whole_number(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15).then_some(value as i64)
}

fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, AnalysisError> {
    let column = require_column(df, name)?;
    let cast = column.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}
