//! Ordinal binning of a numeric column into labelled groups
//!
//! Two strategies are tried in order, chosen by a precondition rather than by
//! attempting one and recovering from its failure:
//!
//! 1. **Quantile** - equal-count bins with edges at the 0, 1/q, ..., 1 quantiles.
//!    Selected only when every edge is distinct.
//! 2. **Percentile cut** - interior cut points at evenly spaced percentiles of
//!    the raw values (20/40/60/80 for five labels) with open outer bins.
//!    Duplicate cut points are merged, so heavy ties yield fewer bins; labels
//!    are then taken from the front of the label list.
//!
//! Bins are right-closed `(lo, hi]` with the lowest bin also closed on the left.

use serde::Serialize;

/// Value preparation before quantile edges are computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankMode {
    /// Bin the raw values; ties share a bin
    Raw,
    /// Bin the ordinal rank of each value, ties broken by position
    FirstOccurrence,
}

/// Which strategy produced a binning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinningStrategy {
    Quantile,
    PercentileCut,
}

/// Labels assigned to each input value, in input order
#[derive(Debug, Clone, PartialEq)]
pub struct Binning<L> {
    pub labels: Vec<L>,
    pub strategy: BinningStrategy,
    /// Number of bins actually formed (may be below the label count)
    pub bins: usize,
}

/// Assign one of `labels` to every value, lowest values getting `labels[0]`
pub fn bin_values<L: Copy>(values: &[f64], labels: &[L], mode: RankMode) -> Binning<L> {
    if values.is_empty() || labels.is_empty() {
        return Binning {
            labels: Vec::new(),
            strategy: BinningStrategy::Quantile,
            bins: 0,
        };
    }

    let prepared = match mode {
        RankMode::Raw => values.to_vec(),
        RankMode::FirstOccurrence => rank_first(values),
    };

    if let Some(edges) = quantile_edges(&prepared, labels.len()) {
        return Binning {
            labels: assign(&prepared, &edges, labels),
            strategy: BinningStrategy::Quantile,
            bins: labels.len(),
        };
    }

    log::warn!(
        "Quantile edges not distinct for {} values, using percentile cut points",
        values.len()
    );
    let edges = percentile_cut_edges(values, labels.len());
    Binning {
        labels: assign(values, &edges, labels),
        strategy: BinningStrategy::PercentileCut,
        bins: edges.len() - 1,
    }
}

/// 1-based ordinal ranks; equal values rank in order of appearance
pub fn rank_first(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    // stable sort keeps positional order among ties
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; values.len()];
    for (rank, &idx) in order.iter().enumerate() {
        ranks[idx] = (rank + 1) as f64;
    }
    ranks
}

/// Linear-interpolated percentile (`p` in 0..=100) of unsorted values
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Some(percentile_sorted(&sorted, p))
}

fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let pos = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Equal-count edges, or `None` when any two edges coincide
fn quantile_edges(values: &[f64], bins: usize) -> Option<Vec<f64>> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let edges: Vec<f64> = (0..=bins)
        .map(|i| percentile_sorted(&sorted, 100.0 * i as f64 / bins as f64))
        .collect();

    let distinct = edges.windows(2).all(|w| w[0] < w[1]);
    distinct.then_some(edges)
}

/// Open-ended edges with interior cuts at evenly spaced percentiles, deduplicated
fn percentile_cut_edges(values: &[f64], bins: usize) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut edges = vec![f64::NEG_INFINITY];
    for i in 1..bins {
        let cut = percentile_sorted(&sorted, 100.0 * i as f64 / bins as f64);
        if edges.last().map_or(true, |&last| cut > last) {
            edges.push(cut);
        }
    }
    edges.push(f64::INFINITY);
    edges
}

fn assign<L: Copy>(values: &[f64], edges: &[f64], labels: &[L]) -> Vec<L> {
    let bins = edges.len() - 1;
    values
        .iter()
        .map(|&v| {
            // first bin whose upper edge covers v; the lowest bin is left-closed
            let bin = edges[1..]
                .iter()
                .position(|&hi| v <= hi)
                .unwrap_or(bins - 1)
                .min(labels.len() - 1);
            labels[bin]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SCORES: [u8; 5] = [1, 2, 3, 4, 5];

    #[test]
    fn test_percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(percentile(&values, 50.0).unwrap(), 2.5);
        assert_relative_eq!(percentile(&values, 0.0).unwrap(), 1.0);
        assert_relative_eq!(percentile(&values, 100.0).unwrap(), 4.0);
        assert_eq!(percentile(&[], 50.0), None);
    }

    #[test]
    fn test_rank_first_breaks_ties_by_position() {
        let ranks = rank_first(&[5.0, 1.0, 5.0, 3.0]);
        assert_eq!(ranks, vec![3.0, 1.0, 4.0, 2.0]);
    }

    #[test]
    fn test_quantile_equal_groups() {
        let values: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let binning = bin_values(&values, &SCORES, RankMode::Raw);

        assert_eq!(binning.strategy, BinningStrategy::Quantile);
        assert_eq!(binning.labels, vec![1, 1, 2, 2, 3, 3, 4, 4, 5, 5]);
    }

    #[test]
    fn test_ranked_ties_still_form_five_groups() {
        let values = vec![1.0; 10];
        let binning = bin_values(&values, &SCORES, RankMode::FirstOccurrence);

        assert_eq!(binning.strategy, BinningStrategy::Quantile);
        for score in SCORES {
            assert_eq!(binning.labels.iter().filter(|&&l| l == score).count(), 2);
        }
    }

    #[test]
    fn test_heavy_ties_fall_back_to_percentile_cut() {
        let values = vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 3.0, 4.0];
        let binning = bin_values(&values, &SCORES, RankMode::Raw);

        assert_eq!(binning.strategy, BinningStrategy::PercentileCut);
        // 20th..60th percentiles are all 1.0 and merge into one cut
        assert!(binning.bins < 5);
        assert_eq!(binning.labels[0], 1);
        assert!(binning.labels[9] > binning.labels[0]);
    }

    #[test]
    fn test_constant_values_degrade_to_fewer_labels() {
        let values = vec![7.0; 4];
        let binning = bin_values(&values, &SCORES, RankMode::Raw);

        assert_eq!(binning.strategy, BinningStrategy::PercentileCut);
        assert_eq!(binning.bins, 2);
        assert!(binning.labels.iter().all(|&l| l == 1));
    }

    #[test]
    fn test_reversed_labels() {
        let values = vec![10.0, 400.0, 30.0, 200.0, 90.0];
        let binning = bin_values(&values, &[5u8, 4, 3, 2, 1], RankMode::Raw);
        assert_eq!(binning.labels, vec![5, 1, 4, 2, 3]);
    }

    #[test]
    fn test_single_value() {
        let binning = bin_values(&[42.0], &SCORES, RankMode::FirstOccurrence);
        assert_eq!(binning.labels.len(), 1);
        assert_eq!(binning.strategy, BinningStrategy::PercentileCut);
    }

    #[test]
    fn test_empty() {
        let binning = bin_values::<u8>(&[], &SCORES, RankMode::Raw);
        assert!(binning.labels.is_empty());
    }
}
