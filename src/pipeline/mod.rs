//! Pipeline module - normalization, filtering and the customer analytics

pub mod analysis;
pub mod calendar;
pub mod clv;
pub mod cohort;
pub mod error;
pub mod filter;
pub mod kpi;
pub mod loader;
pub mod normalize;
pub mod rfm;
pub mod scoring;
pub mod segment;
pub mod transaction;

pub use analysis::*;
pub use calendar::YearMonth;
pub use clv::*;
pub use cohort::*;
pub use error::AnalysisError;
pub use filter::*;
pub use kpi::*;
pub use loader::*;
pub use normalize::*;
pub use rfm::*;
pub use scoring::{first_seen_ranks, qcut, quantile_edges, BinningError, QUARTILES};
pub use segment::*;
pub use transaction::*;
