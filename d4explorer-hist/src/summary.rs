use serde::Serialize;
use tracing::info;

use crate::annotated::D4AnnotatedHist;
use crate::hist::D4Hist;

/// Default number of depth values drawn per feature.
pub const DEFAULT_SAMPLE_SIZE: usize = 1_000_000;

///
/// Coverage statistics of one feature, computed from a weighted sample of
/// its covered bins (`x > 0`, within the mask). Values are rounded to two
/// decimals.
///
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageSummary {
    pub feature: String,
    /// Feature length in bases
    pub size: u64,
    /// Bases with non-zero depth in the selected bins
    pub selected: u64,
    pub selected_pct: f64,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub pct60: f64,
    pub pct70: f64,
    pub pct80: f64,
    pub pct90: f64,
    pub median_plus_1sd: f64,
    pub median_plus_2sd: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn median(sorted: &[i64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2] as f64
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0
    }
}

impl CoverageSummary {
    pub fn from_hist(hist: &D4Hist, sample_size: usize, seed: Option<u64>) -> CoverageSummary {
        let feature = hist.feature_name().unwrap_or_default().to_string();
        let size = match hist.feature() {
            Some(f) => f.total_length(),
            None => hist.counts().iter().sum(),
        };
        let selected: u64 = hist
            .x()
            .iter()
            .zip(hist.counts())
            .zip(hist.mask())
            .filter(|((x, _), keep)| **x > 0 && **keep)
            .map(|((_, c), _)| c)
            .sum();
        let selected_pct = if size == 0 {
            0.0
        } else {
            round2(selected as f64 / size as f64 * 100.0)
        };

        let mut sample = hist.sample_where(sample_size, seed, |x| x > 0);
        sample.sort_unstable();

        let (mean, median, std) = if sample.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let n = sample.len() as f64;
            let mean = sample.iter().map(|v| *v as f64).sum::<f64>() / n;
            let var = sample
                .iter()
                .map(|v| (*v as f64 - mean).powi(2))
                .sum::<f64>()
                / n;
            (round2(mean), round2(median(&sample)), round2(var.sqrt()))
        };

        CoverageSummary {
            feature,
            size,
            selected,
            selected_pct,
            mean,
            median,
            std,
            pct60: round2(mean * 0.6),
            pct70: round2(mean * 0.7),
            pct80: round2(mean * 0.8),
            pct90: round2(mean * 0.9),
            median_plus_1sd: round2(median + std),
            median_plus_2sd: round2(median + 2.0 * std),
        }
    }
}

///
/// One summary per member, in member order.
///
pub fn summarize(
    collection: &D4AnnotatedHist,
    sample_size: usize,
    seed: Option<u64>,
) -> Vec<CoverageSummary> {
    collection
        .members()
        .iter()
        .map(|member| {
            info!(
                feature = member.feature_name().unwrap_or("-"),
                sample_size, "sampling values"
            );
            CoverageSummary::from_hist(member, sample_size, seed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use d4explorer_core::models::{Feature, Interval};
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_single_depth_summary() {
        let hist = D4Hist::from_raw(&[("<0", 0), ("0", 5), ("1", 0), ("2", 5)])
            .unwrap()
            .with_feature(Feature::new("gene", vec![Interval::new("chr1", 0, 10)]));
        let summary = CoverageSummary::from_hist(&hist, 100, Some(7));

        assert_eq!(summary.feature, "gene");
        assert_eq!(summary.size, 10);
        assert_eq!(summary.selected, 5);
        assert_eq!(summary.selected_pct, 50.0);
        assert_eq!(summary.mean, 2.0);
        assert_eq!(summary.median, 2.0);
        assert_eq!(summary.std, 0.0);
        assert_eq!(summary.pct60, 1.2);
        assert_eq!(summary.pct70, 1.4);
        assert_eq!(summary.pct90, 1.8);
        assert_eq!(summary.median_plus_2sd, 2.0);
    }

    #[rstest]
    fn test_uncovered_feature_summary() {
        let hist = D4Hist::from_raw(&[("0", 10), ("1", 0)]).unwrap();
        let summary = CoverageSummary::from_hist(&hist, 10, Some(1));
        assert_eq!(summary.selected, 0);
        assert_eq!(summary.mean, 0.0);
        assert_eq!(summary.feature, "");
    }

    #[rstest]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[1, 2, 3]), 2.0);
        assert_eq!(median(&[1, 2, 3, 4]), 2.5);
    }

    #[rstest]
    fn test_summary_within_bounds() {
        let hist = D4Hist::from_raw(&[("0", 1), ("1", 10), ("2", 20), ("3", 10), (">3", 1)])
            .unwrap();
        let summary = CoverageSummary::from_hist(&hist, 1_000, Some(42));
        assert!(summary.mean >= 1.0 && summary.mean <= 4.0);
        assert!(summary.median_plus_1sd >= summary.median);
        assert_eq!(summary.selected, 41);
    }
}
