/// Recent change in flow: the latest present value against the `lookback`-th
/// most recent present value, counting the latest as the first (or against
/// the first present value, for short series).

use serde::Serialize;

use crate::model::ObservationSeries;

/// Default look-back, in present readings (one day of hourly data, so the
/// reference sits 23 steps before the latest).
pub const DEFAULT_RECENT_CHANGE_LOOKBACK: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RecentChange {
    /// Latest minus reference, in value units.
    pub change: Option<f64>,
    /// Relative change in percent; `None` when the reference is zero.
    pub change_pct: Option<f64>,
}

pub fn recent_change(series: &ObservationSeries, lookback: usize) -> RecentChange {
    let values = series.present_values();
    if values.len() < 2 {
        return RecentChange::default();
    }

    let latest = values[values.len() - 1];
    let reference = values[values.len().saturating_sub(lookback.max(1))];
    let change = latest - reference;

    RecentChange {
        change: Some(change),
        change_pct: (reference != 0.0).then(|| change / reference * 100.0),
    }
}
