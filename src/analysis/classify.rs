/// Flow condition classification against a self-referential baseline.
///
/// The most recent present value is ranked against every present value in
/// the same series (no external climatology):
///
///   rank = 100 × (present values ≤ latest) / present count
///
/// The rank is then mapped onto the ordered condition scale through a
/// [`BreakpointTable`]. Swapping classification policy means passing a
/// different table; no other code changes.
///
/// Default breakpoints:
///
/// | rank        | condition  |
/// |-------------|------------|
/// | [0, 10)     | low        |
/// | [10, 75)    | normal     |
/// | [75, 90)    | elevated   |
/// | [90, 98)    | high       |
/// | [98, 100]   | flood      |

use serde::{Deserialize, Serialize};

use crate::analysis::summary::SummaryResult;
use crate::model::ObservationSeries;

/// Default minimum number of present values for a percentile-based label.
pub const DEFAULT_MIN_HISTORY: usize = 10;

/// Condition labels. The first five form the ordered scale (derive order
/// follows declaration order); the last two are sentinels outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowCondition {
    Low,
    Normal,
    Elevated,
    High,
    Flood,
    /// Present values exist but fewer than the configured minimum history.
    InsufficientHistory,
    /// No present value at all. Never reported as `Normal`.
    Undetermined,
}

impl FlowCondition {
    /// Whether the label sits on the ordered low..flood scale.
    pub fn is_on_scale(self) -> bool {
        !matches!(self, FlowCondition::InsufficientHistory | FlowCondition::Undetermined)
    }

    pub fn label(self) -> &'static str {
        match self {
            FlowCondition::Low => "Low Flow",
            FlowCondition::Normal => "Normal",
            FlowCondition::Elevated => "Elevated",
            FlowCondition::High => "High Flow",
            FlowCondition::Flood => "Flood",
            FlowCondition::InsufficientHistory => "Not Enough History",
            FlowCondition::Undetermined => "Undetermined",
        }
    }
}

/// One row of the breakpoint table: ranks at or above `min_percentile`
/// (and below the next row's) map to `condition`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub min_percentile: f64,
    pub condition: FlowCondition,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BreakpointError {
    #[error("breakpoint table must not be empty")]
    Empty,

    #[error("first breakpoint must start at 0, got {0}")]
    FirstNotZero(f64),

    #[error("breakpoints must be strictly ascending: {previous} then {next}")]
    NotAscending { previous: f64, next: f64 },

    #[error("{0:?} cannot be used as a breakpoint")]
    OffScale(FlowCondition),

    #[error("breakpoint {0} is outside [0, 100]")]
    OutOfRange(f64),
}

/// Ordered breakpoints, ascending by `min_percentile`, first row at 0.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakpointTable {
    rows: Vec<Breakpoint>,
}

impl BreakpointTable {
    /// Builds a table, rejecting empty, unordered or off-scale rows.
    pub fn new(rows: Vec<Breakpoint>) -> Result<Self, BreakpointError> {
        let first = rows.first().ok_or(BreakpointError::Empty)?;
        if first.min_percentile != 0.0 {
            return Err(BreakpointError::FirstNotZero(first.min_percentile));
        }
        for pair in rows.windows(2) {
            if !(pair[1].min_percentile > pair[0].min_percentile) {
                return Err(BreakpointError::NotAscending {
                    previous: pair[0].min_percentile,
                    next: pair[1].min_percentile,
                });
            }
        }
        for row in &rows {
            if !row.condition.is_on_scale() {
                return Err(BreakpointError::OffScale(row.condition));
            }
            if !(0.0..=100.0).contains(&row.min_percentile) {
                return Err(BreakpointError::OutOfRange(row.min_percentile));
            }
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Breakpoint] {
        &self.rows
    }

    /// Label for a percentile rank in [0, 100].
    pub fn lookup(&self, rank: f64) -> FlowCondition {
        self.rows
            .iter()
            .rev()
            .find(|row| rank >= row.min_percentile)
            .or_else(|| self.rows.first())
            .map(|row| row.condition)
            .unwrap_or(FlowCondition::Undetermined)
    }
}

impl Default for BreakpointTable {
    fn default() -> Self {
        let row = |min_percentile, condition| Breakpoint { min_percentile, condition };
        Self {
            rows: vec![
                row(0.0, FlowCondition::Low),
                row(10.0, FlowCondition::Normal),
                row(75.0, FlowCondition::Elevated),
                row(90.0, FlowCondition::High),
                row(98.0, FlowCondition::Flood),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierParams {
    pub min_history: usize,
    pub breakpoints: BreakpointTable,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            min_history: DEFAULT_MIN_HISTORY,
            breakpoints: BreakpointTable::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowConditionResult {
    pub condition: FlowCondition,
    /// Rank of the latest present value in [0, 100]; `None` unless the
    /// condition is on the ordered scale.
    pub percentile_rank: Option<f64>,
    pub latest_value: Option<f64>,
}

/// Percentage of `values` that are ≤ `target`.
pub fn percentile_rank(values: &[f64], target: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let at_or_below = values.iter().filter(|&&v| v <= target).count();
    100.0 * at_or_below as f64 / values.len() as f64
}

/// Classifies the most recent present value of `series`.
pub fn classify(
    series: &ObservationSeries,
    summary: &SummaryResult,
    params: &ClassifierParams,
) -> FlowConditionResult {
    let Some((_, latest)) = series.latest_present() else {
        return FlowConditionResult {
            condition: FlowCondition::Undetermined,
            percentile_rank: None,
            latest_value: None,
        };
    };

    if summary.count < params.min_history {
        return FlowConditionResult {
            condition: FlowCondition::InsufficientHistory,
            percentile_rank: None,
            latest_value: Some(latest),
        };
    }

    let rank = percentile_rank(&series.present_values(), latest);
    FlowConditionResult {
        condition: params.breakpoints.lookup(rank),
        percentile_rank: Some(rank),
        latest_value: Some(latest),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
