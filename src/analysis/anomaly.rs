/// Anomaly detection against physical limits and the series' own baseline.
///
/// Two rules run independently over present values and their results are
/// unioned:
///
/// - **Range rule** - the value lies outside the configured plausible range.
///   Score: distance beyond the violated bound divided by the range width.
/// - **Statistical rule** - `|value - mean| > k * stddev`.
///   Score: `|value - mean| / stddev`.
///
/// Both scores are unitless. A reading that trips both rules is flagged once,
/// carrying the larger score and the reason of the rule that produced it
/// (ties resolve to `out_of_range`).

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::summary::SummaryResult;
use crate::model::ObservationSeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyReason {
    OutOfRange,
    StatisticalOutlier,
}

/// Thresholds for both detection rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyParams {
    pub plausible_min: f64,
    pub plausible_max: f64,
    /// Standard-deviation multiplier for the statistical rule.
    pub k: f64,
}

impl Default for AnomalyParams {
    fn default() -> Self {
        Self {
            plausible_min: 0.0,
            plausible_max: 3_000_000.0,
            k: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyFlag {
    /// Position in the series, absent readings included.
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub score: f64,
    pub reason: AnomalyReason,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AnomalyResult {
    /// Flags in series order.
    pub flags: Vec<AnomalyFlag>,
}

impl AnomalyResult {
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn count_by_reason(&self, reason: AnomalyReason) -> usize {
        self.flags.iter().filter(|f| f.reason == reason).count()
    }
}

/// Flags readings of `series` that break either rule.
pub fn detect_anomalies(
    series: &ObservationSeries,
    summary: &SummaryResult,
    params: &AnomalyParams,
) -> AnomalyResult {
    // The statistical rule needs a baseline with spread. A constant series
    // has stddev == 0 and would flag nothing meaningful, so it is skipped.
    let baseline = match (summary.mean, summary.stddev) {
        (Some(mean), Some(stddev)) if stddev > 0.0 => Some((mean, stddev)),
        _ => None,
    };

    let flags = series
        .present()
        .filter_map(|(index, timestamp, value)| {
            let range = range_score(value, params).map(|s| (s, AnomalyReason::OutOfRange));
            let stat = baseline
                .and_then(|(mean, stddev)| statistical_score(value, mean, stddev, params.k))
                .map(|s| (s, AnomalyReason::StatisticalOutlier));

            let (score, reason) = match (range, stat) {
                (Some(r), Some(s)) => {
                    if s.0 > r.0 {
                        s
                    } else {
                        r
                    }
                }
                (Some(r), None) => r,
                (None, Some(s)) => s,
                (None, None) => return None,
            };

            Some(AnomalyFlag {
                index,
                timestamp,
                value,
                score,
                reason,
            })
        })
        .collect();

    AnomalyResult { flags }
}

fn range_score(value: f64, params: &AnomalyParams) -> Option<f64> {
    let width = (params.plausible_max - params.plausible_min).max(f64::EPSILON);
    if value < params.plausible_min {
        Some((params.plausible_min - value) / width)
    } else if value > params.plausible_max {
        Some((value - params.plausible_max) / width)
    } else {
        None
    }
}

fn statistical_score(value: f64, mean: f64, stddev: f64, k: f64) -> Option<f64> {
    let deviation = (value - mean).abs();
    if deviation > k * stddev {
        Some(deviation / stddev)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
