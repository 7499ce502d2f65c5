/// Service configuration loader - parses flostat.toml
///
/// Separates the site list, fetch window, analysis thresholds and output
/// locations from code, so sites can be added or policy constants
/// recalibrated without recompiling. Every section has defaults; only the
/// site list is required.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::AnalysisConfig;
use crate::analysis::anomaly::AnomalyParams;
use crate::analysis::change::DEFAULT_RECENT_CHANGE_LOOKBACK;
use crate::analysis::classify::{
    Breakpoint, BreakpointError, BreakpointTable, ClassifierParams, DEFAULT_MIN_HISTORY,
};
use crate::analysis::summary::DEFAULT_PERCENTILES;
use crate::analysis::trend::DEFAULT_DEAD_BAND_PER_HOUR;
use crate::model::PARAM_DISCHARGE;

/// Default configuration file name, resolved against the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "flostat.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("invalid analysis.breakpoints: {0}")]
    Breakpoints(#[from] BreakpointError),
}

// ---------------------------------------------------------------------------
// TOML structures
// ---------------------------------------------------------------------------

/// Root of flostat.toml.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(rename = "site")]
    pub sites: Vec<SiteConfig>,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub analysis: AnalysisToml,

    #[serde(default)]
    pub output: OutputConfig,
}

/// A monitored USGS site.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    pub site_code: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_parameter_code")]
    pub parameter_code: String,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            parameter_code: default_parameter_code(),
            lookback_days: default_lookback_days(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    crate::ingest::usgs::IV_BASE_URL.to_string()
}
fn default_parameter_code() -> String {
    PARAM_DISCHARGE.to_string()
}
fn default_lookback_days() -> u32 {
    7
}
fn default_timeout_secs() -> u64 {
    30
}

/// Analysis thresholds as written in TOML.
///
/// The dead-band and outlier multiplier are policy constants that should be
/// calibrated per deployment; the defaults are placeholders, not tuned values.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisToml {
    #[serde(default = "default_dead_band")]
    pub dead_band_per_hour: f64,
    #[serde(default = "default_outlier_k")]
    pub outlier_k: f64,
    #[serde(default)]
    pub plausible_min: Option<f64>,
    #[serde(default)]
    pub plausible_max: Option<f64>,
    #[serde(default = "default_min_history")]
    pub min_history: usize,
    #[serde(default = "default_percentiles")]
    pub percentiles: Vec<u8>,
    #[serde(default = "default_recent_change_lookback")]
    pub recent_change_lookback: usize,
    /// Replaces the default low/normal/elevated/high/flood table when set.
    #[serde(default)]
    pub breakpoints: Option<Vec<Breakpoint>>,
}

impl Default for AnalysisToml {
    fn default() -> Self {
        Self {
            dead_band_per_hour: default_dead_band(),
            outlier_k: default_outlier_k(),
            plausible_min: None,
            plausible_max: None,
            min_history: default_min_history(),
            percentiles: default_percentiles(),
            recent_change_lookback: default_recent_change_lookback(),
            breakpoints: None,
        }
    }
}

fn default_dead_band() -> f64 {
    DEFAULT_DEAD_BAND_PER_HOUR
}
fn default_outlier_k() -> f64 {
    AnomalyParams::default().k
}
fn default_min_history() -> usize {
    DEFAULT_MIN_HISTORY
}
fn default_percentiles() -> Vec<u8> {
    DEFAULT_PERCENTILES.to_vec()
}
fn default_recent_change_lookback() -> usize {
    DEFAULT_RECENT_CHANGE_LOOKBACK
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Worker threads for fetching and analysis.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            data_dir: default_data_dir(),
            workers: default_workers(),
        }
    }
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_workers() -> usize {
    4
}

// ---------------------------------------------------------------------------
// Loading and validation
// ---------------------------------------------------------------------------

/// Reads, parses and validates a configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<ServiceConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ServiceConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// USGS site numbers are 8 to 15 ASCII digits.
pub fn is_valid_site_code(code: &str) -> bool {
    (8..=15).contains(&code.len()) && code.chars().all(|c| c.is_ascii_digit())
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.sites.is_empty() {
            return invalid("at least one [[site]] is required".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for site in &self.sites {
            if !is_valid_site_code(&site.site_code) {
                return invalid(format!(
                    "site code '{}' is not an 8-15 digit USGS site number",
                    site.site_code
                ));
            }
            if !seen.insert(site.site_code.as_str()) {
                return invalid(format!("duplicate site code '{}'", site.site_code));
            }
        }

        if self.fetch.lookback_days == 0 {
            return invalid("fetch.lookback_days must be at least 1".to_string());
        }
        if self.output.workers == 0 {
            return invalid("output.workers must be at least 1".to_string());
        }

        let a = &self.analysis;
        if !(a.dead_band_per_hour >= 0.0 && a.dead_band_per_hour.is_finite()) {
            return invalid(format!(
                "analysis.dead_band_per_hour must be finite and >= 0, got {}",
                a.dead_band_per_hour
            ));
        }
        if !(a.outlier_k > 0.0 && a.outlier_k.is_finite()) {
            return invalid(format!("analysis.outlier_k must be > 0, got {}", a.outlier_k));
        }
        if a.recent_change_lookback == 0 {
            return invalid("analysis.recent_change_lookback must be at least 1".to_string());
        }
        if a.min_history == 0 {
            return invalid("analysis.min_history must be at least 1".to_string());
        }
        if let Some(p) = a.percentiles.iter().find(|&&p| p > 100) {
            return invalid(format!("analysis.percentiles entry {} exceeds 100", p));
        }
        let anomaly = self.anomaly_params();
        let finite = anomaly.plausible_min.is_finite() && anomaly.plausible_max.is_finite();
        if !finite || anomaly.plausible_min >= anomaly.plausible_max {
            return invalid(format!(
                "plausible range [{}, {}] must be finite and non-empty",
                anomaly.plausible_min, anomaly.plausible_max
            ));
        }
        if let Some(rows) = &a.breakpoints {
            BreakpointTable::new(rows.clone())?;
        }

        Ok(())
    }

    fn anomaly_params(&self) -> AnomalyParams {
        let defaults = AnomalyParams::default();
        AnomalyParams {
            plausible_min: self.analysis.plausible_min.unwrap_or(defaults.plausible_min),
            plausible_max: self.analysis.plausible_max.unwrap_or(defaults.plausible_max),
            k: self.analysis.outlier_k,
        }
    }

    /// The pure engine configuration derived from the `[analysis]` section.
    ///
    /// Assumes `validate` has passed; an invalid breakpoint table falls back
    /// to the default table.
    pub fn analysis_config(&self) -> AnalysisConfig {
        let breakpoints = self
            .analysis
            .breakpoints
            .clone()
            .and_then(|rows| BreakpointTable::new(rows).ok())
            .unwrap_or_default();

        AnalysisConfig {
            percentiles: self.analysis.percentiles.clone(),
            dead_band_per_hour: self.analysis.dead_band_per_hour,
            anomaly: self.anomaly_params(),
            classifier: ClassifierParams {
                min_history: self.analysis.min_history,
                breakpoints,
            },
            recent_change_lookback: self.analysis.recent_change_lookback,
        }
    }

    pub fn site_codes(&self) -> Vec<&str> {
        self.sites.iter().map(|s| s.site_code.as_str()).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::classify::FlowCondition;
    use std::io::Write;

    const MINIMAL: &str = r#"
        [[site]]
        site_code = "01646500"
        name = "Potomac River near Wash, DC Little Falls Pump Sta"
    "#;

    fn parse(toml_text: &str) -> ServiceConfig {
        toml::from_str(toml_text).expect("fixture TOML should parse")
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse(MINIMAL);
        config.validate().expect("minimal config is valid");

        assert_eq!(config.sites.len(), 1);
        assert_eq!(config.fetch.parameter_code, "00060");
        assert_eq!(config.fetch.lookback_days, 7);
        assert_eq!(config.output.results_dir, PathBuf::from("results"));
        assert_eq!(config.analysis_config(), AnalysisConfig::default());
    }

    #[test]
    fn test_analysis_section_flows_into_engine_config() {
        let config = parse(
            r#"
            [[site]]
            site_code = "01646500"

            [analysis]
            dead_band_per_hour = 2.0
            outlier_k = 4.5
            plausible_max = 500000.0
            min_history = 3
            percentiles = [5, 95]

            [[analysis.breakpoints]]
            min_percentile = 0.0
            condition = "normal"

            [[analysis.breakpoints]]
            min_percentile = 80.0
            condition = "high"
            "#,
        );
        config.validate().expect("valid config");
        let engine = config.analysis_config();

        assert_eq!(engine.dead_band_per_hour, 2.0);
        assert_eq!(engine.anomaly.k, 4.5);
        assert_eq!(engine.anomaly.plausible_min, 0.0);
        assert_eq!(engine.anomaly.plausible_max, 500_000.0);
        assert_eq!(engine.classifier.min_history, 3);
        assert_eq!(engine.percentiles, vec![5, 95]);
        assert_eq!(engine.classifier.breakpoints.lookup(85.0), FlowCondition::High);
        assert_eq!(engine.classifier.breakpoints.lookup(10.0), FlowCondition::Normal);
    }

    #[test]
    fn test_empty_site_list_is_rejected() {
        let config = parse("site = []");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_and_duplicate_site_codes_are_rejected() {
        let bad = parse(
            r#"
            [[site]]
            site_code = "ABC123"
            "#,
        );
        assert!(bad.validate().is_err());

        let dup = parse(
            r#"
            [[site]]
            site_code = "01646500"
            [[site]]
            site_code = "01646500"
            "#,
        );
        let err = dup.validate().expect_err("duplicates must fail");
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_policy_constants_are_range_checked() {
        for section in [
            "dead_band_per_hour = -1.0",
            "outlier_k = 0.0",
            "min_history = 0",
            "percentiles = [50, 101]",
            "plausible_min = 10.0\nplausible_max = 5.0",
            "plausible_min = nan",
            "plausible_max = nan",
            "plausible_max = inf",
            "recent_change_lookback = 0",
        ] {
            let config = parse(&format!("{}\n[analysis]\n{}", MINIMAL, section));
            assert!(
                config.validate().is_err(),
                "'{}' should be rejected",
                section
            );
        }
    }

    #[test]
    fn test_unsorted_breakpoints_are_rejected() {
        let config = parse(&format!(
            "{}\n{}",
            MINIMAL,
            r#"
            [[analysis.breakpoints]]
            min_percentile = 0.0
            condition = "low"
            [[analysis.breakpoints]]
            min_percentile = 90.0
            condition = "high"
            [[analysis.breakpoints]]
            min_percentile = 50.0
            condition = "normal"
            "#
        ));
        let err = config.validate().expect_err("unsorted table must fail");
        assert!(matches!(
            err,
            ConfigError::Breakpoints(BreakpointError::NotAscending { previous, next })
                if previous == 90.0 && next == 50.0
        ));
        assert!(err.to_string().contains("analysis.breakpoints"));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result: Result<ServiceConfig, _> = toml::from_str(&format!("{}\nsurprise = 1", MINIMAL));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_reads_file_and_reports_path_on_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = load_config(file.path()).expect("file should load");
        assert_eq!(config.site_codes(), vec!["01646500"]);

        let missing = load_config("/definitely/not/here/flostat.toml");
        let err = missing.expect_err("missing file must fail");
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("flostat.toml"));
    }
}
