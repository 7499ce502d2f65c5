/// Streamflow analysis engine.
///
/// Submodules, each a pure function over an immutable `ObservationSeries`:
/// - `summary`  - central tendency, dispersion, percentiles.
/// - `trend`    - OLS trend against elapsed time with a dead-band.
/// - `anomaly`  - range and k-sigma outlier flags.
/// - `classify` - flow condition from the latest value's percentile rank.
/// - `change`   - latest value against a fixed look-back.
///
/// This module is the orchestrator. `analyze` never fails: every degraded
/// computation is represented by a labelled sentinel inside a structurally
/// complete `AnalysisRecord`, so one pathological site cannot abort a
/// multi-site batch.

pub mod anomaly;
pub mod change;
pub mod classify;
pub mod summary;
pub mod trend;

use std::sync::{Arc, mpsc};

use chrono::{DateTime, Utc};
use serde::Serialize;
use threadpool::ThreadPool;
use tracing::{debug, warn};

use crate::model::{AnalysisError, ObservationSeries};

use self::anomaly::{AnomalyParams, AnomalyResult, detect_anomalies};
use self::change::{DEFAULT_RECENT_CHANGE_LOOKBACK, RecentChange, recent_change};
use self::classify::{ClassifierParams, FlowCondition, FlowConditionResult, classify};
use self::summary::{DEFAULT_PERCENTILES, SummaryResult, summarize};
use self::trend::{DEFAULT_DEAD_BAND_PER_HOUR, TrendDirection, TrendResult, estimate_trend};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Every threshold the engine uses, passed explicitly into each call.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Percentiles reported in the summary, in whole percent.
    pub percentiles: Vec<u8>,

    /// Trend dead-band half-width, value units per hour.
    pub dead_band_per_hour: f64,

    pub anomaly: AnomalyParams,

    pub classifier: ClassifierParams,

    /// Present readings to look back for the recent change.
    pub recent_change_lookback: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            percentiles: DEFAULT_PERCENTILES.to_vec(),
            dead_band_per_hour: DEFAULT_DEAD_BAND_PER_HOUR,
            anomaly: AnomalyParams::default(),
            classifier: ClassifierParams::default(),
            recent_change_lookback: DEFAULT_RECENT_CHANGE_LOOKBACK,
        }
    }
}

// ---------------------------------------------------------------------------
// Result record
// ---------------------------------------------------------------------------

/// One site's analysis for one invocation. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    pub site_id: String,
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,
    pub summary: SummaryResult,
    pub trend: TrendResult,
    pub anomalies: AnomalyResult,
    pub flow_condition: FlowConditionResult,
    pub recent_change: RecentChange,
    /// Human-readable one-line description of the record.
    pub headline: String,
    pub generated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

/// Analyzes `series`, stamping the record with the current time.
pub fn analyze(series: &ObservationSeries, config: &AnalysisConfig) -> AnalysisRecord {
    analyze_at(series, config, Utc::now())
}

/// Analyzes `series` with an injected `generated_at`, for deterministic output.
pub fn analyze_at(
    series: &ObservationSeries,
    config: &AnalysisConfig,
    generated_at: DateTime<Utc>,
) -> AnalysisRecord {
    let summary = summarize(series, &config.percentiles);

    let trend = match estimate_trend(series, config.dead_band_per_hour) {
        Ok(trend) => trend,
        Err(AnalysisError::InsufficientData { needed, found }) => {
            debug!(site = %series.site_id(), needed, found, "trend degraded to unknown");
            TrendResult::unknown()
        }
        Err(e) => {
            debug!(site = %series.site_id(), error = %e, "trend degraded to unknown");
            TrendResult::unknown()
        }
    };

    let anomalies = detect_anomalies(series, &summary, &config.anomaly);
    let flow_condition = classify(series, &summary, &config.classifier);
    let recent_change = recent_change(series, config.recent_change_lookback);
    let headline = headline(&summary, &trend, &anomalies, &flow_condition);
    let (window_start, window_end) = series.window().unzip();

    AnalysisRecord {
        site_id: series.site_id().to_string(),
        window_start,
        window_end,
        summary,
        trend,
        anomalies,
        flow_condition,
        recent_change,
        headline,
        generated_at,
    }
}

/// Analyzes every series on a worker pool. Output order matches input order.
pub fn analyze_batch(
    batch: Vec<ObservationSeries>,
    config: &AnalysisConfig,
    generated_at: DateTime<Utc>,
    workers: usize,
) -> Vec<AnalysisRecord> {
    let total = batch.len();
    if total == 0 {
        return Vec::new();
    }

    let site_ids: Vec<String> = batch.iter().map(|s| s.site_id().to_string()).collect();
    let pool = ThreadPool::new(workers.clamp(1, total));
    let shared = Arc::new(config.clone());
    let (tx, rx) = mpsc::channel();

    for (slot, series) in batch.into_iter().enumerate() {
        let tx = tx.clone();
        let config = Arc::clone(&shared);
        pool.execute(move || {
            let record = analyze_at(&series, &config, generated_at);
            // The receiver outlives every job.
            let _ = tx.send((slot, record));
        });
    }
    drop(tx);

    let mut slots: Vec<Option<AnalysisRecord>> = vec![None; total];
    for (slot, record) in rx {
        slots[slot] = Some(record);
    }

    fill_missing(site_ids, slots, config, generated_at)
}

/// One record per site in input order. A slot left empty by a panicked
/// worker gets the empty-series record for that site.
fn fill_missing(
    site_ids: Vec<String>,
    slots: Vec<Option<AnalysisRecord>>,
    config: &AnalysisConfig,
    generated_at: DateTime<Utc>,
) -> Vec<AnalysisRecord> {
    site_ids
        .into_iter()
        .zip(slots)
        .map(|(site_id, slot)| {
            slot.unwrap_or_else(|| {
                warn!(site = %site_id, "analysis worker exited without a result");
                analyze_at(&ObservationSeries::empty(site_id), config, generated_at)
            })
        })
        .collect()
}

/// One-line description, e.g.
/// `"Normal conditions (avg: 8123 cfs, trend: rising), 2 anomalies detected"`.
pub fn headline(
    summary: &SummaryResult,
    trend: &TrendResult,
    anomalies: &AnomalyResult,
    flow: &FlowConditionResult,
) -> String {
    let Some(mean) = summary.mean else {
        return "No data available".to_string();
    };

    let trend_label = match trend.direction {
        TrendDirection::Rising => "rising",
        TrendDirection::Falling => "falling",
        TrendDirection::Stable => "stable",
        TrendDirection::Unknown => "unknown",
    };

    let mut line = match flow.condition {
        FlowCondition::Undetermined | FlowCondition::InsufficientHistory => format!(
            "{} (avg: {:.0} cfs, trend: {})",
            flow.condition.label(),
            mean,
            trend_label
        ),
        condition => format!(
            "{} conditions (avg: {:.0} cfs, trend: {})",
            condition.label(),
            mean,
            trend_label
        ),
    };

    match anomalies.len() {
        0 => {}
        1 => line.push_str(", 1 anomaly detected"),
        n => line.push_str(&format!(", {} anomalies detected", n)),
    }

    line
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
