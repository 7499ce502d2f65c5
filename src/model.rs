/// Core data types for the streamflow snapshot service.
///
/// This module defines the shared domain model imported by all other modules:
/// the validated observation series handed to the analysis engine and the
/// error kinds that originate inside the engine. It contains no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Parameter codes
// ---------------------------------------------------------------------------

/// USGS parameter code for discharge (streamflow), in cubic feet per second.
pub const PARAM_DISCHARGE: &str = "00060";

// ---------------------------------------------------------------------------
// Observation types
// ---------------------------------------------------------------------------

/// A single time-stamped reading.
///
/// `value` is `None` when the upstream reading was missing or invalid. An
/// absent value is never interpreted as zero discharge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

impl Observation {
    pub fn new(timestamp: DateTime<Utc>, value: Option<f64>) -> Self {
        Self { timestamp, value }
    }

    pub fn present(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self::new(timestamp, Some(value))
    }

    pub fn absent(timestamp: DateTime<Utc>) -> Self {
        Self::new(timestamp, None)
    }
}

/// The ordered readings for one site over one invocation window.
///
/// Construction goes through [`ObservationSeries::new`], which enforces
/// non-decreasing timestamps and finite present values. The series is never
/// mutated afterwards; every analysis module reads it by shared reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationSeries {
    site_id: String,
    observations: Vec<Observation>,
}

impl ObservationSeries {
    /// Validates and wraps a sequence of observations.
    ///
    /// An empty sequence is valid input and yields an empty series.
    ///
    /// # Errors
    /// `AnalysisError::InvalidObservation` if a timestamp goes backwards or a
    /// present value is NaN or infinite.
    pub fn new(
        site_id: impl Into<String>,
        observations: Vec<Observation>,
    ) -> Result<Self, AnalysisError> {
        for (index, obs) in observations.iter().enumerate() {
            if let Some(value) = obs.value {
                if !value.is_finite() {
                    return Err(AnalysisError::InvalidObservation {
                        index,
                        reason: format!("value {} is not finite", value),
                    });
                }
            }
            if index > 0 && obs.timestamp < observations[index - 1].timestamp {
                return Err(AnalysisError::InvalidObservation {
                    index,
                    reason: format!(
                        "timestamp {} precedes previous timestamp {}",
                        obs.timestamp.to_rfc3339(),
                        observations[index - 1].timestamp.to_rfc3339()
                    ),
                });
            }
        }

        Ok(Self {
            site_id: site_id.into(),
            observations,
        })
    }

    /// An empty series for a site whose readings could not be retrieved.
    pub fn empty(site_id: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            observations: Vec::new(),
        }
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Present readings as `(index, timestamp, value)`, in series order.
    pub fn present(&self) -> impl Iterator<Item = (usize, DateTime<Utc>, f64)> + '_ {
        self.observations
            .iter()
            .enumerate()
            .filter_map(|(i, o)| o.value.map(|v| (i, o.timestamp, v)))
    }

    /// Present values only, in series order.
    pub fn present_values(&self) -> Vec<f64> {
        self.present().map(|(_, _, v)| v).collect()
    }

    pub fn present_count(&self) -> usize {
        self.present().count()
    }

    /// The most recent present reading, skipping trailing absent ones.
    pub fn latest_present(&self) -> Option<(DateTime<Utc>, f64)> {
        self.observations
            .iter()
            .rev()
            .find_map(|o| o.value.map(|v| (o.timestamp, v)))
    }

    /// First and last timestamps of the series, absent readings included.
    pub fn window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.observations.first(), self.observations.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that originate inside the analysis engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    /// Too few present values for a specific computation. Always degraded to
    /// a sentinel by the orchestrator.
    #[error("insufficient data: need at least {needed} present values, found {found}")]
    InsufficientData { needed: usize, found: usize },

    /// Malformed input rejected while building a series.
    #[error("invalid observation at index {index}: {reason}")]
    InvalidObservation { index: usize, reason: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
