/// Summary statistics over the present values of a series.
///
/// Percentiles use linear interpolation between order statistics (the
/// Hyndman–Fan type 7 rule, also the R and pandas default). Values are
/// sorted with `f64::total_cmp`, so the result depends only on the multiset
/// of present values and is bit-reproducible for a given input.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::ObservationSeries;

/// Percentiles reported when the configuration does not override them.
pub const DEFAULT_PERCENTILES: &[u8] = &[10, 25, 50, 75, 90];

/// Descriptive statistics over present values only.
///
/// Every value field is `None` exactly when `count == 0`; callers branch on
/// [`SummaryResult::is_empty`] before reading them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryResult {
    pub count: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// Sample standard deviation (N-1 denominator). Exactly 0 for one value.
    pub stddev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Whole-percent key -> interpolated value.
    pub percentiles: BTreeMap<u8, f64>,
}

impl SummaryResult {
    /// The "undefined" summary of a series with no present values.
    pub fn undefined() -> Self {
        Self {
            count: 0,
            mean: None,
            median: None,
            stddev: None,
            min: None,
            max: None,
            percentiles: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn percentile(&self, p: u8) -> Option<f64> {
        self.percentiles.get(&p).copied()
    }
}

/// Computes the summary for `series`. Never fails.
pub fn summarize(series: &ObservationSeries, percentiles: &[u8]) -> SummaryResult {
    let mut values = series.present_values();
    if values.is_empty() {
        return SummaryResult::undefined();
    }

    values.sort_by(f64::total_cmp);

    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let stddev = sample_stddev(&values, mean);

    let percentiles = percentiles
        .iter()
        .map(|&p| (p, quantile_sorted(&values, f64::from(p) / 100.0)))
        .collect();

    SummaryResult {
        count,
        mean: Some(mean),
        median: Some(quantile_sorted(&values, 0.5)),
        stddev: Some(stddev),
        min: values.first().copied(),
        max: values.last().copied(),
        percentiles,
    }
}

/// Type 7 quantile of pre-sorted, non-empty data; `q` is clamped to [0, 1].
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    let h = (n - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let f = h - h.floor();
    if f == 0.0 || sorted[lo] == sorted[hi] {
        return sorted[lo];
    }
    // Weighted form stays finite where `hi - lo` would overflow.
    sorted[lo] * (1.0 - f) + sorted[hi] * f
}

fn sample_stddev(values: &[f64], mean: f64) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    (ss / (n - 1) as f64).sqrt()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
