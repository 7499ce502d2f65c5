/// Linear trend estimation over elapsed time.
///
/// Ordinary least squares of value against hours elapsed since the first
/// present observation, so irregular sampling intervals do not distort the
/// slope the way an index-based fit would.
///
/// `confidence` is the coefficient of determination (R²) clamped to [0, 1].
/// It is a goodness-of-fit signal only, not a p-value, and says nothing
/// about statistical significance.
///
/// # Known limitation
/// The dead-band is an absolute threshold in value units per hour taken from
/// configuration. It ignores the magnitude of the series, so the same
/// threshold is lenient for a large river and strict for a small creek.

use serde::Serialize;

use crate::model::{AnalysisError, ObservationSeries};

/// Default dead-band half-width, in value units per hour.
pub const DEFAULT_DEAD_BAND_PER_HOUR: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Falling,
    Stable,
    /// No trend could be estimated (fewer than two usable points).
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendResult {
    /// Value units per hour. `None` only for the unknown sentinel.
    pub slope: Option<f64>,
    /// Fitted value at the first present timestamp.
    pub intercept: Option<f64>,
    pub direction: TrendDirection,
    /// R² in [0, 1]; 0 for the unknown sentinel.
    pub confidence: f64,
}

impl TrendResult {
    /// The structurally complete stand-in used when no trend can be fit.
    pub fn unknown() -> Self {
        Self {
            slope: None,
            intercept: None,
            direction: TrendDirection::Unknown,
            confidence: 0.0,
        }
    }
}

/// Classifies a slope against a symmetric dead-band around zero.
pub fn direction_for_slope(slope: f64, dead_band: f64) -> TrendDirection {
    if slope > dead_band {
        TrendDirection::Rising
    } else if slope < -dead_band {
        TrendDirection::Falling
    } else {
        TrendDirection::Stable
    }
}

/// Fits the trend line for `series`.
///
/// # Errors
/// `AnalysisError::InsufficientData` when fewer than two present values
/// exist, or when every present value shares one timestamp (the time axis
/// has no spread to regress on).
pub fn estimate_trend(
    series: &ObservationSeries,
    dead_band: f64,
) -> Result<TrendResult, AnalysisError> {
    let mut points = series.present().peekable();
    let origin = match points.peek() {
        Some(&(_, ts, _)) => ts,
        None => return Err(AnalysisError::InsufficientData { needed: 2, found: 0 }),
    };

    let xy: Vec<(f64, f64)> = points
        .map(|(_, ts, v)| {
            let hours = (ts - origin).num_milliseconds() as f64 / 3_600_000.0;
            (hours, v)
        })
        .collect();

    let n = xy.len();
    if n < 2 {
        return Err(AnalysisError::InsufficientData { needed: 2, found: n });
    }

    let nf = n as f64;
    let mean_x = xy.iter().map(|(x, _)| x).sum::<f64>() / nf;
    let mean_y = xy.iter().map(|(_, y)| y).sum::<f64>() / nf;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for &(x, y) in &xy {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    if sxx == 0.0 {
        // All present readings share one timestamp.
        return Err(AnalysisError::InsufficientData { needed: 2, found: 1 });
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    // A flat series is fit exactly by a flat line.
    let r_squared = if syy == 0.0 { 1.0 } else { (sxy * sxy) / (sxx * syy) };

    Ok(TrendResult {
        slope: Some(slope),
        intercept: Some(intercept),
        direction: direction_for_slope(slope, dead_band),
        confidence: r_squared.clamp(0.0, 1.0),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Observation;
    use approx::assert_relative_eq;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    fn hourly(values: &[Option<f64>]) -> ObservationSeries {
        let obs = values
            .iter()
            .enumerate()
            .map(|(i, v)| Observation::new(start() + Duration::hours(i as i64), *v))
            .collect();
        ObservationSeries::new("01646500", obs).unwrap()
    }

    #[test]
    fn test_steady_rise_is_rising_with_full_confidence() {
        let series = hourly(&[Some(100.0), Some(110.0), Some(120.0), Some(130.0)]);
        let trend = estimate_trend(&series, 0.5).expect("four points should fit");
        assert_eq!(trend.direction, TrendDirection::Rising);
        assert_relative_eq!(trend.slope.unwrap(), 10.0, epsilon = 1e-9);
        assert_relative_eq!(trend.intercept.unwrap(), 100.0, epsilon = 1e-9);
        assert_relative_eq!(trend.confidence, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_steady_fall_is_falling() {
        let series = hourly(&[Some(130.0), Some(120.0), Some(110.0)]);
        let trend = estimate_trend(&series, 0.5).unwrap();
        assert_eq!(trend.direction, TrendDirection::Falling);
        assert!(trend.slope.unwrap() < 0.0);
    }

    #[test]
    fn test_slope_inside_dead_band_is_stable() {
        // 0.2 units/hour is below the 0.5 dead-band.
        let series = hourly(&[Some(100.0), Some(100.2), Some(100.4), Some(100.6)]);
        let trend = estimate_trend(&series, 0.5).unwrap();
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert!(trend.slope.unwrap() > 0.0, "slope itself is still reported");
    }

    #[test]
    fn test_irregular_spacing_uses_elapsed_time_not_index() {
        // Points at 0h, 1h and 10h on the line y = 100 + 2t. An index-based
        // fit would report a much larger slope.
        let obs = vec![
            Observation::present(start(), 100.0),
            Observation::present(start() + Duration::hours(1), 102.0),
            Observation::present(start() + Duration::hours(10), 120.0),
        ];
        let series = ObservationSeries::new("01646500", obs).unwrap();
        let trend = estimate_trend(&series, 0.5).unwrap();
        assert_relative_eq!(trend.slope.unwrap(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_absent_values_do_not_count_toward_minimum() {
        let series = hourly(&[None, Some(100.0), None]);
        let result = estimate_trend(&series, 0.5);
        assert_eq!(
            result,
            Err(AnalysisError::InsufficientData { needed: 2, found: 1 })
        );
    }

    #[test]
    fn test_empty_series_is_insufficient() {
        let result = estimate_trend(&hourly(&[]), 0.5);
        assert_eq!(
            result,
            Err(AnalysisError::InsufficientData { needed: 2, found: 0 })
        );
    }

    #[test]
    fn test_same_timestamp_is_insufficient() {
        let obs = vec![
            Observation::present(start(), 100.0),
            Observation::present(start(), 105.0),
        ];
        let series = ObservationSeries::new("01646500", obs).unwrap();
        assert!(matches!(
            estimate_trend(&series, 0.5),
            Err(AnalysisError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_flat_series_is_stable_with_full_confidence() {
        let series = hourly(&[Some(50.0), Some(50.0), Some(50.0)]);
        let trend = estimate_trend(&series, 0.5).unwrap();
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert_eq!(trend.slope, Some(0.0));
        assert_eq!(trend.confidence, 1.0);
    }

    #[test]
    fn test_noisy_series_confidence_is_below_one() {
        let series = hourly(&[Some(100.0), Some(140.0), Some(90.0), Some(150.0), Some(95.0)]);
        let trend = estimate_trend(&series, 0.5).unwrap();
        assert!(trend.confidence >= 0.0 && trend.confidence < 1.0);
    }
}
