//! Weighted 1D profiling with streaming mean and standard deviation.
//!
//! Samples are binned along one field and, per bin, the weighted mean and
//! population-weighted standard deviation of a second field are
//! accumulated in a single pass:
//!
//! - `weight_total += w`
//! - `weighted_sum += w * v`
//! - `weighted_sum_sq += w * v^2`
//!
//! Partial accumulators over disjoint sample subsets merge by pairwise
//! addition of those sums, which is what makes the rayon fold/reduce
//! accumulation below correct.

use rayon::prelude::*;
use thiserror::Error;

use crate::core::dataset::{FieldId, Sample};

/// Errors that can occur while building a profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("invalid bin count: {0} (need at least 1)")]
    InvalidBinCount(usize),

    #[error("invalid extrema: low {low} must be less than high {high}")]
    InvalidExtrema { low: f64, high: f64 },

    #[error("log-spaced bins require a positive lower extremum, got {0}")]
    NonPositiveLogExtremum(f64),

    #[error("sample is missing required field '{0}'")]
    MissingField(FieldId),

    #[error("no sample carried weight into any bin")]
    EmptyProfile,
}

/// How bin edges subdivide the extrema range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinSpacing {
    /// Equal-width bins in the field's own units.
    #[default]
    Linear,
    /// Equal-width bins in log space; requires positive extrema.
    Log,
}

/// Bin edge layout over a `[low, high]` range.
///
/// The `n` bins partition the range with no gaps or overlaps: bin `i`
/// covers `[edge(i), edge(i+1))`, except the last bin whose upper edge is
/// closed so that a value exactly equal to `high` is still counted.
#[derive(Debug, Clone)]
pub struct BinEdges {
    low: f64,
    high: f64,
    n_bins: usize,
    spacing: BinSpacing,
}

impl BinEdges {
    /// Validate and build a bin layout.
    pub fn new(low: f64, high: f64, n_bins: usize, spacing: BinSpacing) -> Result<Self, ProfileError> {
        if n_bins < 1 {
            return Err(ProfileError::InvalidBinCount(n_bins));
        }
        if !(low < high) {
            return Err(ProfileError::InvalidExtrema { low, high });
        }
        if spacing == BinSpacing::Log && low <= 0.0 {
            return Err(ProfileError::NonPositiveLogExtremum(low));
        }
        Ok(Self {
            low,
            high,
            n_bins,
            spacing,
        })
    }

    #[inline]
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    #[inline]
    pub fn low(&self) -> f64 {
        self.low
    }

    #[inline]
    pub fn high(&self) -> f64 {
        self.high
    }

    #[inline]
    pub fn spacing(&self) -> BinSpacing {
        self.spacing
    }

    /// Bin index for a value, or `None` if it falls outside `[low, high]`.
    ///
    /// Values outside the extrema are excluded, not clamped; the clamp to
    /// `n_bins - 1` only absorbs the closed upper edge and floating-point
    /// edge rounding for in-range values.
    pub fn index_of(&self, value: f64) -> Option<usize> {
        if !value.is_finite() || value < self.low || value > self.high {
            return None;
        }
        let fraction = match self.spacing {
            BinSpacing::Linear => (value - self.low) / (self.high - self.low),
            BinSpacing::Log => (value.ln() - self.low.ln()) / (self.high.ln() - self.low.ln()),
        };
        let idx = (fraction * self.n_bins as f64).floor() as usize;
        Some(idx.min(self.n_bins - 1))
    }

    /// Lower and upper edge of bin `i`.
    pub fn edges_of(&self, i: usize) -> (f64, f64) {
        debug_assert!(i < self.n_bins);
        match self.spacing {
            BinSpacing::Linear => {
                let width = (self.high - self.low) / self.n_bins as f64;
                (
                    self.low + i as f64 * width,
                    self.low + (i + 1) as f64 * width,
                )
            }
            BinSpacing::Log => {
                let step = (self.high.ln() - self.low.ln()) / self.n_bins as f64;
                (
                    (self.low.ln() + i as f64 * step).exp(),
                    (self.low.ln() + (i + 1) as f64 * step).exp(),
                )
            }
        }
    }

    /// Center coordinate of bin `i`: arithmetic midpoint for linear bins,
    /// geometric mean for log bins.
    pub fn center_of(&self, i: usize) -> f64 {
        let (lower, upper) = self.edges_of(i);
        match self.spacing {
            BinSpacing::Linear => 0.5 * (lower + upper),
            BinSpacing::Log => (lower * upper).sqrt(),
        }
    }
}

/// Streaming accumulator for one bin's weighted statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BinAccumulator {
    pub count: usize,
    pub weight_total: f64,
    pub weighted_sum: f64,
    pub weighted_sum_sq: f64,
}

impl BinAccumulator {
    /// Fold one weighted value into the accumulator.
    #[inline]
    pub fn push(&mut self, value: f64, weight: f64) {
        self.count += 1;
        self.weight_total += weight;
        self.weighted_sum += weight * value;
        self.weighted_sum_sq += weight * value * value;
    }

    /// Merge a partial accumulator computed over a disjoint sample subset.
    #[inline]
    pub fn merge(&mut self, other: &Self) {
        self.count += other.count;
        self.weight_total += other.weight_total;
        self.weighted_sum += other.weighted_sum;
        self.weighted_sum_sq += other.weighted_sum_sq;
    }

    /// A bin is empty when no weight landed in it.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.weight_total == 0.0
    }

    /// Weighted mean, or 0 for an empty bin.
    pub fn mean(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.weighted_sum / self.weight_total
        }
    }

    /// Population-weighted variance. Negative values from floating-point
    /// cancellation are clamped to zero.
    pub fn variance(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        (self.weighted_sum_sq / self.weight_total - mean * mean).max(0.0)
    }

    pub fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// Accumulating state of a profile computation.
///
/// One-way lifecycle: accumulate (and merge) samples, then
/// [`finalize`](Self::finalize) into an immutable [`Profile`].
#[derive(Debug, Clone)]
pub struct ProfileAccumulator {
    edges: BinEdges,
    bins: Vec<BinAccumulator>,
}

impl ProfileAccumulator {
    pub fn new(edges: BinEdges) -> Self {
        let bins = vec![BinAccumulator::default(); edges.n_bins()];
        Self { edges, bins }
    }

    /// Assign one weighted value to its bin. Values outside the extrema
    /// are dropped.
    pub fn accumulate(&mut self, bin_value: f64, value: f64, weight: f64) {
        if let Some(idx) = self.edges.index_of(bin_value) {
            self.bins[idx].push(value, weight);
        }
    }

    /// Merge a partial accumulator with the same bin layout.
    pub fn merge(mut self, other: Self) -> Self {
        debug_assert_eq!(self.bins.len(), other.bins.len());
        for (bin, partial) in self.bins.iter_mut().zip(other.bins.iter()) {
            bin.merge(partial);
        }
        self
    }

    /// Finalize into a read-only profile.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::EmptyProfile`] when every bin ended with
    /// zero total weight.
    pub fn finalize(self) -> Result<Profile, ProfileError> {
        if self.bins.iter().all(BinAccumulator::is_empty) {
            return Err(ProfileError::EmptyProfile);
        }

        let x = (0..self.edges.n_bins())
            .map(|i| self.edges.center_of(i))
            .collect();
        let mean = self.bins.iter().map(BinAccumulator::mean).collect();
        let stddev = self.bins.iter().map(BinAccumulator::stddev).collect();
        let weight_total = self.bins.iter().map(|b| b.weight_total).collect();
        let count = self.bins.iter().map(|b| b.count).collect();

        Ok(Profile {
            edges: self.edges,
            x,
            mean,
            stddev,
            weight_total,
            count,
        })
    }
}

/// A finalized 1D weighted profile.
///
/// All arrays have one entry per bin; `x[i]` is the center coordinate of
/// bin `i` and `mean[i]`/`stddev[i]` are that bin's weighted statistics.
/// Empty bins report mean 0, stddev 0, and `weight_total == 0`.
#[derive(Debug, Clone)]
pub struct Profile {
    edges: BinEdges,
    pub x: Vec<f64>,
    pub mean: Vec<f64>,
    pub stddev: Vec<f64>,
    pub weight_total: Vec<f64>,
    pub count: Vec<usize>,
}

impl Profile {
    #[inline]
    pub fn n_bins(&self) -> usize {
        self.x.len()
    }

    #[inline]
    pub fn edges(&self) -> &BinEdges {
        &self.edges
    }

    /// Whether bin `i` received no weight.
    #[inline]
    pub fn is_bin_empty(&self, i: usize) -> bool {
        self.weight_total[i] == 0.0
    }

    /// Total number of samples that landed in any bin.
    pub fn total_count(&self) -> usize {
        self.count.iter().sum()
    }
}

/// Profile request parameters.
#[derive(Debug, Clone)]
pub struct ProfileRequest {
    /// Field whose value selects the bin (e.g. `index:radius`).
    pub bin_field: FieldId,
    /// Field whose weighted statistics are accumulated.
    pub value_field: FieldId,
    /// Weight field; `None` uses the weight each sample already carries
    /// from region selection (the mass column by default).
    pub weight_field: Option<FieldId>,
    /// `(low, high)` range of the bin field; samples outside are excluded.
    pub extrema: (f64, f64),
    pub n_bins: usize,
    pub spacing: BinSpacing,
}

/// Compute a weighted 1D profile over a sample set.
///
/// Accumulation is parallelized with rayon: per-thread partial
/// accumulators are folded over sample chunks and merged pairwise, which
/// yields the same sums as a sequential pass.
///
/// # Errors
///
/// * [`ProfileError::MissingField`] if any sample lacks the bin, value,
///   or weight field.
/// * [`ProfileError::EmptyProfile`] if no sample carried weight into any
///   bin (all samples outside the extrema, or all weights zero).
/// * Extrema and bin-count validation errors from [`BinEdges::new`].
pub fn weighted_profile(samples: &[Sample], request: &ProfileRequest) -> Result<Profile, ProfileError> {
    let edges = BinEdges::new(
        request.extrema.0,
        request.extrema.1,
        request.n_bins,
        request.spacing,
    )?;

    // Validate field presence up front so the parallel pass below is
    // infallible per sample.
    for sample in samples {
        for field in [&request.bin_field, &request.value_field]
            .into_iter()
            .chain(request.weight_field.as_ref())
        {
            if sample.field(field).is_none() {
                return Err(ProfileError::MissingField(field.clone()));
            }
        }
    }

    let accumulator = samples
        .par_iter()
        .fold(
            || ProfileAccumulator::new(edges.clone()),
            |mut acc, sample| {
                let bin_value = sample.field(&request.bin_field).unwrap_or(f64::NAN);
                let value = sample.field(&request.value_field).unwrap_or(f64::NAN);
                let weight = match &request.weight_field {
                    Some(field) => sample.field(field).unwrap_or(0.0),
                    None => sample.weight,
                };
                acc.accumulate(bin_value, value, weight);
                acc
            },
        )
        .reduce(|| ProfileAccumulator::new(edges.clone()), ProfileAccumulator::merge);

    accumulator.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample(radius: f64, value: f64, weight: f64) -> Sample {
        let mut fields = BTreeMap::new();
        fields.insert(FieldId::radius(), radius);
        fields.insert(FieldId::gas("velocity_magnitude"), value);
        Sample::new([radius, 0.0, 0.0], fields, weight)
    }

    fn request(extrema: (f64, f64), n_bins: usize) -> ProfileRequest {
        ProfileRequest {
            bin_field: FieldId::radius(),
            value_field: FieldId::gas("velocity_magnitude"),
            weight_field: None,
            extrema,
            n_bins,
            spacing: BinSpacing::Linear,
        }
    }

    #[test]
    fn test_bin_edges_validation() {
        assert!(BinEdges::new(0.0, 1.0, 0, BinSpacing::Linear).is_err());
        assert!(BinEdges::new(1.0, 1.0, 4, BinSpacing::Linear).is_err());
        assert!(BinEdges::new(2.0, 1.0, 4, BinSpacing::Linear).is_err());
        assert!(BinEdges::new(0.0, 1.0, 4, BinSpacing::Log).is_err());
        assert!(BinEdges::new(0.1, 1000.0, 64, BinSpacing::Log).is_ok());
    }

    #[test]
    fn test_bin_index_linear() {
        let edges = BinEdges::new(0.0, 10.0, 2, BinSpacing::Linear).unwrap();

        assert_eq!(edges.index_of(0.0), Some(0));
        assert_eq!(edges.index_of(4.999), Some(0));
        assert_eq!(edges.index_of(5.0), Some(1));
        // Closed upper edge: high lands in the last bin, not outside
        assert_eq!(edges.index_of(10.0), Some(1));
        // Outside the extrema is excluded, not clamped
        assert_eq!(edges.index_of(-0.1), None);
        assert_eq!(edges.index_of(10.1), None);
        assert_eq!(edges.index_of(f64::NAN), None);
    }

    #[test]
    fn test_bin_index_log() {
        let edges = BinEdges::new(1.0, 100.0, 2, BinSpacing::Log).unwrap();

        assert_eq!(edges.index_of(1.0), Some(0));
        assert_eq!(edges.index_of(9.0), Some(0));
        assert_eq!(edges.index_of(11.0), Some(1));
        assert_eq!(edges.index_of(100.0), Some(1));
        assert_eq!(edges.index_of(0.5), None);
    }

    #[test]
    fn test_bin_centers() {
        let linear = BinEdges::new(0.0, 10.0, 2, BinSpacing::Linear).unwrap();
        assert!((linear.center_of(0) - 2.5).abs() < 1e-12);
        assert!((linear.center_of(1) - 7.5).abs() < 1e-12);

        // Log bins over [1, 100]: edges at 1, 10, 100; geometric centers
        let log = BinEdges::new(1.0, 100.0, 2, BinSpacing::Log).unwrap();
        assert!((log.center_of(0) - (10.0f64).sqrt()).abs() < 1e-9);
        assert!((log.center_of(1) - (1000.0f64).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_single_sample_bin() {
        let samples = vec![sample(1.0, 42.0, 3.0)];
        let profile = weighted_profile(&samples, &request((0.0, 10.0), 2)).unwrap();

        assert_eq!(profile.mean[0], 42.0);
        assert_eq!(profile.stddev[0], 0.0);
        assert!(profile.is_bin_empty(1));
    }

    #[test]
    fn test_equal_weight_pair_mean() {
        let samples = vec![sample(1.0, 10.0, 1.0), sample(1.5, 30.0, 1.0)];
        let profile = weighted_profile(&samples, &request((0.0, 10.0), 1)).unwrap();

        assert!((profile.mean[0] - 20.0).abs() < 1e-12);
        assert!((profile.stddev[0] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_two_bin_scenario() {
        // r=1 v=10 w=1; r=1 v=20 w=1; r=5 v=0 w=1; 2 bins over [0, 10]
        let samples = vec![
            sample(1.0, 10.0, 1.0),
            sample(1.0, 20.0, 1.0),
            sample(5.0, 0.0, 1.0),
        ];
        let profile = weighted_profile(&samples, &request((0.0, 10.0), 2)).unwrap();

        assert!((profile.mean[0] - 15.0).abs() < 1e-12);
        assert!((profile.stddev[0] - 5.0).abs() < 1e-12);
        assert_eq!(profile.mean[1], 0.0);
        assert_eq!(profile.stddev[1], 0.0);
        assert_eq!(profile.count, vec![2, 1]);
    }

    #[test]
    fn test_extrema_filter_excludes_samples() {
        let samples = vec![
            sample(1.0, 10.0, 1.0),
            sample(50.0, 99.0, 1.0), // outside [0, 10]
        ];
        let profile = weighted_profile(&samples, &request((0.0, 10.0), 2)).unwrap();

        assert_eq!(profile.total_count(), 1);
        assert!(profile.total_count() <= samples.len());
    }

    #[test]
    fn test_all_zero_weights_is_empty_profile() {
        let samples = vec![sample(1.0, 10.0, 0.0), sample(2.0, 20.0, 0.0)];
        let err = weighted_profile(&samples, &request((0.0, 10.0), 2)).unwrap_err();
        assert!(matches!(err, ProfileError::EmptyProfile));
    }

    #[test]
    fn test_all_samples_outside_extrema_is_empty_profile() {
        let samples = vec![sample(100.0, 10.0, 1.0)];
        let err = weighted_profile(&samples, &request((0.0, 10.0), 2)).unwrap_err();
        assert!(matches!(err, ProfileError::EmptyProfile));
    }

    #[test]
    fn test_missing_field_detected() {
        let mut fields = BTreeMap::new();
        fields.insert(FieldId::radius(), 1.0);
        // No velocity_magnitude field
        let samples = vec![Sample::new([1.0, 0.0, 0.0], fields, 1.0)];

        let err = weighted_profile(&samples, &request((0.0, 10.0), 2)).unwrap_err();
        assert!(matches!(err, ProfileError::MissingField(_)));
    }

    #[test]
    fn test_explicit_weight_field() {
        let mut a = sample(1.0, 10.0, 1.0);
        a.set_field(FieldId::gas("cell_mass"), 3.0);
        let mut b = sample(1.0, 20.0, 1.0);
        b.set_field(FieldId::gas("cell_mass"), 1.0);

        let mut req = request((0.0, 10.0), 1);
        req.weight_field = Some(FieldId::gas("cell_mass"));

        let profile = weighted_profile(&[a, b], &req).unwrap();
        // (3*10 + 1*20) / 4 = 12.5
        assert!((profile.mean[0] - 12.5).abs() < 1e-12);
        assert!((profile.weight_total[0] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let edges = BinEdges::new(0.0, 10.0, 4, BinSpacing::Linear).unwrap();
        let data = [
            (1.0, 3.0, 0.5),
            (2.5, -1.0, 2.0),
            (2.6, 7.0, 1.5),
            (6.0, 2.0, 0.25),
            (9.9, 11.0, 3.0),
        ];

        let mut whole = ProfileAccumulator::new(edges.clone());
        for &(r, v, w) in &data {
            whole.accumulate(r, v, w);
        }

        let mut left = ProfileAccumulator::new(edges.clone());
        let mut right = ProfileAccumulator::new(edges);
        for &(r, v, w) in &data[..2] {
            left.accumulate(r, v, w);
        }
        for &(r, v, w) in &data[2..] {
            right.accumulate(r, v, w);
        }

        let merged = left.merge(right).finalize().unwrap();
        let whole = whole.finalize().unwrap();

        for i in 0..whole.n_bins() {
            assert!((merged.mean[i] - whole.mean[i]).abs() < 1e-12);
            assert!((merged.stddev[i] - whole.stddev[i]).abs() < 1e-12);
            assert_eq!(merged.count[i], whole.count[i]);
        }
    }

    #[test]
    fn test_variance_clamp_never_negative() {
        // Identical large values: wsq/wt - mean^2 cancels and can round
        // slightly below zero in naive arithmetic.
        let v = 1.0e8 + 0.1;
        let mut bin = BinAccumulator::default();
        for _ in 0..1000 {
            bin.push(v, 1.0);
        }

        assert!(bin.variance() >= 0.0);
        assert!(bin.stddev().is_finite());
    }

    #[test]
    fn test_count_bound_property() {
        let samples: Vec<Sample> = (0..100)
            .map(|i| sample(i as f64 * 0.2, i as f64, 1.0))
            .collect();
        let profile = weighted_profile(&samples, &request((0.0, 30.0), 7)).unwrap();

        // No sample is filtered (max radius 19.8 < 30), so counts are equal
        assert_eq!(profile.total_count(), samples.len());
    }

    #[test]
    fn test_log_profile() {
        let mut req = request((0.1, 1000.0), 4);
        req.spacing = BinSpacing::Log;

        // Bins: [0.1,1), [1,10), [10,100), [100,1000]
        let samples = vec![
            sample(0.5, 1.0, 1.0),
            sample(5.0, 2.0, 1.0),
            sample(50.0, 3.0, 1.0),
            sample(500.0, 4.0, 1.0),
        ];
        let profile = weighted_profile(&samples, &req).unwrap();

        assert_eq!(profile.count, vec![1, 1, 1, 1]);
        assert_eq!(profile.mean, vec![1.0, 2.0, 3.0, 4.0]);
    }
}
