//! Equal-frequency (quantile) binning
//!
//! Bin edges are the sample quantiles at `0, 1/k, ..., 1`, computed by linear
//! interpolation between order statistics. A value lands in bin `i` when
//! `edge[i] < v <= edge[i + 1]`; the first bin also takes its lower edge.
//! When two adjacent edges coincide the bins cannot be formed and the cut
//! fails rather than silently merging bins.

use thiserror::Error;

/// Number of bins used for RFM scoring
pub const QUARTILES: usize = 4;

/// Why a sample could not be cut into equal-frequency bins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BinningError {
    #[error("cannot bin an empty sample")]
    Empty,
    #[error("at least one bin is required")]
    NoBins,
    #[error("quantile edges are not unique: {bins} bins cannot be formed")]
    DuplicateEdges { bins: usize },
}

/// Interpolated quantile at `q` of an ascending, non-empty sample
fn interpolated_quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Quantile edges (`bins + 1` values) of a sample
pub fn quantile_edges(values: &[f64], bins: usize) -> Result<Vec<f64>, BinningError> {
    if values.is_empty() {
        return Err(BinningError::Empty);
    }
    if bins == 0 {
        return Err(BinningError::NoBins);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    Ok((0..=bins)
        .map(|i| interpolated_quantile(&sorted, i as f64 / bins as f64))
        .collect())
}

/// Cut `values` into `bins` equal-frequency bins.
///
/// Returns the zero-based bin index of every value, in input order.
pub fn qcut(values: &[f64], bins: usize) -> Result<Vec<usize>, BinningError> {
    let edges = quantile_edges(values, bins)?;

    if edges.windows(2).any(|w| w[0] == w[1]) {
        return Err(BinningError::DuplicateEdges { bins });
    }

    let inner = &edges[1..];
    Ok(values
        .iter()
        .map(|v| inner.partition_point(|edge| edge < v).min(bins - 1))
        .collect())
}

/// Rank values 1..=n, breaking ties by position (first seen ranks lower).
///
/// The ranks are all distinct, so a sample dominated by one repeated value
/// still yields unique quantile edges.
pub fn first_seen_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    // sort_by is stable: equal values keep their input order
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    for (rank, idx) in order.into_iter().enumerate() {
        ranks[idx] = (rank + 1) as f64;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_edges_interpolate() {
        let edges = quantile_edges(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], 4).unwrap();
        assert_eq!(edges, vec![1.0, 2.75, 4.5, 6.25, 8.0]);
    }

    #[test]
    fn test_qcut_even_sample() {
        let bins = qcut(&[8.0, 1.0, 7.0, 2.0, 6.0, 3.0, 5.0, 4.0], 4).unwrap();
        assert_eq!(bins, vec![3, 0, 3, 0, 2, 1, 2, 1]);
    }

    #[test]
    fn test_qcut_upper_edge_is_inclusive() {
        // edges: 1, 1.5, 2, 2.5, 3 -> 2.0 sits on an edge and belongs to bin 1
        let bins = qcut(&[1.0, 2.0, 3.0], 4).unwrap();
        assert_eq!(bins, vec![0, 1, 3]);
    }

    #[test]
    fn test_qcut_fails_on_duplicate_edges() {
        let result = qcut(&[1.0, 1.0, 1.0, 1.0, 2.0], 4);
        assert_eq!(result, Err(BinningError::DuplicateEdges { bins: 4 }));
    }

    #[test]
    fn test_qcut_single_value_fails() {
        assert!(qcut(&[42.0], 4).is_err());
        assert_eq!(qcut(&[], 4), Err(BinningError::Empty));
    }

    #[test]
    fn test_first_seen_ranks_breaks_ties_by_position() {
        let ranks = first_seen_ranks(&[1.0, 3.0, 1.0, 2.0, 1.0]);
        assert_eq!(ranks, vec![1.0, 5.0, 2.0, 4.0, 3.0]);
    }

    #[test]
    fn test_ranks_make_tied_sample_binnable() {
        let values = vec![1.0; 8];
        assert!(qcut(&values, QUARTILES).is_err());
        let bins = qcut(&first_seen_ranks(&values), QUARTILES).unwrap();
        assert_eq!(bins, vec![0, 0, 1, 1, 2, 2, 3, 3]);
    }
}
