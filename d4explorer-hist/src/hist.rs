use std::sync::Arc;

use rand::SeedableRng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use tracing::warn;

use d4explorer_core::models::Feature;

use crate::errors::{HistError, Result};

/// `x` value the "below range" bin is rewritten to.
pub const LOW_SENTINEL_X: i64 = -1;

///
/// Depth histogram of one feature.
///
/// Rows are `(x, counts)` sorted by `x`: `counts[i]` bases have depth
/// `x[i]`. The depth tool may emit an open "below range" bin (`<0`) as the
/// first row and an open "above range" bin (`>N`) as the last row; these are
/// stored as `-1` and `N + 1`, and their labels are kept for [D4Hist::original].
///
/// The mask narrows which bins take part in sampling without touching the
/// data.
///
#[derive(Debug, Clone, PartialEq)]
pub struct D4Hist {
    x: Vec<i64>,
    counts: Vec<u64>,
    low_label: Option<String>,
    high_label: Option<String>,
    feature: Option<Arc<Feature>>,
    genome_size: Option<u64>,
    mask: Vec<bool>,
}

enum BinLabel {
    Low,
    High(i64),
    Depth(i64),
}

fn parse_label(label: &str, row: usize) -> Result<BinLabel> {
    let label = label.trim();
    let invalid = || HistError::InvalidBin {
        label: label.to_string(),
        row,
    };
    if label.contains('<') {
        Ok(BinLabel::Low)
    } else if let Some(bound) = label.strip_prefix('>') {
        bound.parse::<i64>().map(BinLabel::High).map_err(|_| invalid())
    } else {
        match label.parse::<i64>() {
            Ok(x) if x >= 0 => Ok(BinLabel::Depth(x)),
            _ => Err(invalid()),
        }
    }
}

impl D4Hist {
    ///
    /// Normalize the raw `(label, count)` rows of the depth tool.
    ///
    /// A `<` label is only accepted on the first row and a `>` label only on
    /// the last; anything else must be a non-negative integer.
    ///
    pub fn from_raw<S: AsRef<str>>(rows: &[(S, u64)]) -> Result<D4Hist> {
        if rows.is_empty() {
            return Err(HistError::EmptyTable);
        }
        let last = rows.len() - 1;

        let mut bins: Vec<(i64, u64)> = Vec::with_capacity(rows.len());
        let mut low_label = None;
        let mut high_label = None;

        for (row, (label, count)) in rows.iter().enumerate() {
            let label = label.as_ref();
            let x = match parse_label(label, row)? {
                BinLabel::Low if row == 0 => {
                    low_label = Some(label.trim().to_string());
                    LOW_SENTINEL_X
                }
                BinLabel::High(bound) if row == last => {
                    high_label = Some(label.trim().to_string());
                    bound + 1
                }
                BinLabel::Depth(x) => x,
                BinLabel::Low | BinLabel::High(_) => {
                    return Err(HistError::MisplacedSentinel {
                        label: label.to_string(),
                        row,
                    });
                }
            };
            bins.push((x, *count));
        }

        bins.sort_by_key(|(x, _)| *x);
        let (x, counts) = bins.into_iter().unzip();
        D4Hist::from_parts(x, counts, low_label, high_label)
    }

    ///
    /// Rebuild a histogram from its canonical columns, e.g. when reloading
    /// from a cache. `x` must be sorted ascending; a low label requires the
    /// first `x` to be `-1`.
    ///
    pub fn from_parts(
        x: Vec<i64>,
        counts: Vec<u64>,
        low_label: Option<String>,
        high_label: Option<String>,
    ) -> Result<D4Hist> {
        if x.is_empty() {
            return Err(HistError::EmptyTable);
        }
        if x.len() != counts.len() {
            return Err(HistError::ShapeMismatch(format!(
                "{} bins, {} counts",
                x.len(),
                counts.len()
            )));
        }
        if let Some(row) = x.windows(2).position(|w| w[0] >= w[1]) {
            return Err(HistError::InvalidBin {
                label: x[row + 1].to_string(),
                row: row + 1,
            });
        }
        if let Some(row) = x.iter().skip(1).position(|x| *x < 0) {
            return Err(HistError::InvalidBin {
                label: x[row + 1].to_string(),
                row: row + 1,
            });
        }
        if low_label.is_some() && x[0] != LOW_SENTINEL_X {
            return Err(HistError::MisplacedSentinel {
                label: x[0].to_string(),
                row: 0,
            });
        }

        let mask = vec![true; x.len()];
        Ok(D4Hist {
            x,
            counts,
            low_label,
            high_label,
            feature: None,
            genome_size: None,
            mask,
        })
    }

    pub fn with_feature(mut self, feature: impl Into<Arc<Feature>>) -> D4Hist {
        self.feature = Some(feature.into());
        self
    }

    pub fn with_genome_size(mut self, genome_size: u64) -> D4Hist {
        self.genome_size = Some(genome_size);
        self
    }

    pub fn set_genome_size(&mut self, genome_size: u64) {
        self.genome_size = Some(genome_size);
    }

    pub fn x(&self) -> &[i64] {
        &self.x
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn low_label(&self) -> Option<&str> {
        self.low_label.as_deref()
    }

    pub fn high_label(&self) -> Option<&str> {
        self.high_label.as_deref()
    }

    pub fn feature(&self) -> Option<&Arc<Feature>> {
        self.feature.as_ref()
    }

    /// Name of the owning feature; `None` for a feature-less histogram.
    pub fn feature_name(&self) -> Option<&str> {
        self.feature.as_deref().map(|f| f.name.as_str())
    }

    pub fn genome_size(&self) -> Option<u64> {
        self.genome_size
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.x.len(), 2)
    }

    ///
    /// The declared upper bound of the histogram: last `x` minus one.
    ///
    pub fn max_bin(&self) -> i64 {
        self.x[self.x.len() - 1] - 1
    }

    /// Largest `x` with a non-zero count.
    pub fn max_nonzero_x(&self) -> Option<i64> {
        self.counts
            .iter()
            .rposition(|c| *c > 0)
            .map(|i| self.x[i])
    }

    ///
    /// The table with the sentinel rows relabelled as the tool emitted them.
    ///
    pub fn original(&self) -> Vec<(String, u64)> {
        let last = self.x.len() - 1;
        self.x
            .iter()
            .zip(&self.counts)
            .enumerate()
            .map(|(i, (x, c))| {
                let label = match (i, &self.low_label, &self.high_label) {
                    (0, Some(low), _) => low.clone(),
                    (i, _, Some(high)) if i == last => high.clone(),
                    _ => x.to_string(),
                };
                (label, *c)
            })
            .collect()
    }

    ///
    /// Bases per bin, `counts * x`. The first row counts its bases as they
    /// are so a `-1` sentinel does not turn them negative.
    ///
    pub fn nbases(&self) -> Vec<u64> {
        self.x
            .iter()
            .zip(&self.counts)
            .enumerate()
            .map(|(i, (x, c))| if i == 0 { *c } else { c * (*x as u64) })
            .collect()
    }

    ///
    /// Fraction of the genome per bin, `nbases / genome_size`.
    ///
    pub fn coverage(&self) -> Result<Vec<f64>> {
        let genome_size = self.genome_size.ok_or_else(|| {
            HistError::Precondition("genome size must be set to compute coverage".to_string())
        })?;
        Ok(self
            .nbases()
            .into_iter()
            .map(|n| n as f64 / genome_size as f64)
            .collect())
    }

    pub fn set_mask(&mut self, mask: Vec<bool>) -> Result<()> {
        if mask.len() != self.x.len() {
            return Err(HistError::ShapeMismatch(format!(
                "mask of length {} for {} bins",
                mask.len(),
                self.x.len()
            )));
        }
        self.mask = mask;
        Ok(())
    }

    /// Keep the bins with `low <= x <= high`.
    pub fn set_range_mask(&mut self, low: i64, high: i64) {
        self.mask = self.x.iter().map(|x| (low..=high).contains(x)).collect();
    }

    pub fn reset_mask(&mut self) {
        self.mask = vec![true; self.x.len()];
    }

    /// Number of bases in the masked bins
    pub fn masked_total(&self) -> u64 {
        self.masked_bins().map(|(_, c)| c).sum()
    }

    fn masked_bins(&self) -> impl Iterator<Item = (i64, u64)> + '_ {
        self.x
            .iter()
            .zip(&self.counts)
            .zip(&self.mask)
            .filter(|(_, keep)| **keep)
            .map(|((x, c), _)| (*x, *c))
    }

    ///
    /// Draw `n` depth values, with replacement, from the masked bins weighted
    /// by their counts.
    ///
    /// Drawing more values than there are bases only logs a warning. When the
    /// masked bins hold no bases a vector of `n` zeros is returned.
    ///
    pub fn sample(&self, n: usize, seed: Option<u64>) -> Vec<i64> {
        self.sample_where(n, seed, |_| true)
    }

    pub(crate) fn sample_where<F>(&self, n: usize, seed: Option<u64>, keep: F) -> Vec<i64>
    where
        F: Fn(i64) -> bool,
    {
        let (values, weights): (Vec<i64>, Vec<u64>) =
            self.masked_bins().filter(|(x, _)| keep(*x)).unzip();

        let total: u64 = weights.iter().sum();
        if n as u64 > total {
            warn!(
                n,
                total,
                feature = self.feature_name().unwrap_or("-"),
                "sample size is larger than the data set; resampling values"
            );
        }

        let dist = match WeightedIndex::<u64>::new(&weights) {
            Ok(dist) => dist,
            Err(e) => {
                warn!(error = %e, "resampling failed; returning zeros vector");
                return vec![0; n];
            }
        };

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        (0..n).map(|_| values[dist.sample(&mut rng)]).collect()
    }
}
