//! RetailScope: customer analytics library
//!
//! Cleans retail transaction tables and derives RFM scores with rule-based
//! segments, monthly cohort retention, and customer lifetime value
//! projections with a sensitivity grid.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
