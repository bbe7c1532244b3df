//! Headline business figures

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use super::calendar::YearMonth;
use super::rfm::RfmTable;
use super::transaction::Transaction;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyActivity {
    pub month: YearMonth,
    pub revenue: f64,
    pub active_customers: usize,
}

/// Overview of the analysed transactions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiOverview {
    pub active_customers: usize,
    pub total_revenue: f64,
    pub invoices: usize,
    /// Revenue per distinct invoice; 0 without invoices
    pub average_basket: f64,
    /// Mean monetary value of the scored customers
    pub empirical_clv: Option<f64>,
    pub monthly_activity: Vec<MonthlyActivity>,
}

pub fn compute_kpis(transactions: &[Transaction], rfm: &RfmTable) -> KpiOverview {
    let customers: HashSet<&str> = transactions.iter().map(|tx| tx.customer_id.as_str()).collect();
    let invoices: HashSet<&str> = transactions.iter().map(|tx| tx.invoice_id.as_str()).collect();
    let total_revenue: f64 = transactions.iter().map(|tx| tx.line_total).sum();

    let average_basket = if invoices.is_empty() {
        0.0
    } else {
        total_revenue / invoices.len() as f64
    };

    let mut months: BTreeMap<YearMonth, (f64, HashSet<&str>)> = BTreeMap::new();
    for tx in transactions {
        let entry = months.entry(YearMonth::of(&tx.invoice_date)).or_default();
        entry.0 += tx.line_total;
        entry.1.insert(tx.customer_id.as_str());
    }

    let monthly_activity = months
        .into_iter()
        .map(|(month, (revenue, active))| MonthlyActivity {
            month,
            revenue,
            active_customers: active.len(),
        })
        .collect();

    KpiOverview {
        active_customers: customers.len(),
        total_revenue,
        invoices: invoices.len(),
        average_basket,
        empirical_clv: rfm.average_monetary(),
        monthly_activity,
    }
}
