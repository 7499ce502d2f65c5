/// USGS NWIS Instantaneous Values (IV) API client.
///
/// Handles URL construction, JSON response parsing and the blocking HTTP
/// fetch for the USGS Water Services IV endpoint:
///   https://waterservices.usgs.gov/nwis/iv/
///
/// The IV service returns WaterML rendered as JSON. See `fixtures.rs` for
/// annotated examples of the response structure.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::model::{AnalysisError, Observation, ObservationSeries};

pub const IV_BASE_URL: &str = "https://waterservices.usgs.gov/nwis/iv/";

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("USGS returned HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("failed to parse IV response: {0}")]
    Parse(String),

    #[error("no data available: {0}")]
    NoDataAvailable(String),

    #[error("invalid series for site {site}: {source}")]
    InvalidSeries {
        site: String,
        #[source]
        source: AnalysisError,
    },
}

// ---------------------------------------------------------------------------
// Serde structures for WaterML JSON deserialization
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct IvResponse {
    value: ValueWrapper,
}

#[derive(Deserialize)]
struct ValueWrapper {
    #[serde(rename = "timeSeries")]
    time_series: Vec<TimeSeries>,
}

#[derive(Deserialize)]
struct TimeSeries {
    #[serde(rename = "sourceInfo")]
    source_info: SourceInfo,
    variable: Variable,
    values: Vec<Values>,
}

#[derive(Deserialize)]
struct SourceInfo {
    #[serde(rename = "siteName")]
    site_name: String,
    #[serde(rename = "siteCode")]
    site_code: Vec<CodeValue>,
}

#[derive(Deserialize)]
struct CodeValue {
    value: String,
}

#[derive(Deserialize)]
struct Variable {
    #[serde(rename = "variableCode")]
    variable_code: Vec<CodeValue>,
    unit: Unit,
    #[serde(rename = "noDataValue")]
    no_data_value: Option<f64>,
}

#[derive(Deserialize)]
struct Unit {
    #[serde(rename = "unitCode")]
    unit_code: String,
}

#[derive(Deserialize)]
struct Values {
    value: Vec<ValueEntry>,
}

#[derive(Deserialize)]
struct ValueEntry {
    value: String, // USGS returns as string!
    #[serde(rename = "dateTime")]
    date_time: String,
}

// ---------------------------------------------------------------------------
// Parsed output
// ---------------------------------------------------------------------------

/// One `timeSeries` entry: a site's full window for one parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedSeries {
    pub site_code: String,
    pub site_name: String,
    pub parameter_code: String,
    pub unit: String,
    pub series: ObservationSeries,
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

/// Builds a USGS IV API URL for the given site codes, parameter codes and
/// date range (`YYYY-MM-DD`, inclusive).
///
/// The returned URL always requests JSON and includes inactive sites so a
/// recently decommissioned gauge still returns its history.
pub fn build_iv_url(
    base_url: &str,
    sites: &[&str],
    param_codes: &[&str],
    start_date: &str,
    end_date: &str,
) -> String {
    format!(
        "{}?format=json&sites={}&parameterCd={}&startDT={}&endDT={}&siteStatus=all",
        base_url,
        sites.join(","),
        param_codes.join(","),
        start_date,
        end_date
    )
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Parses a USGS IV JSON body into one `FetchedSeries` per `timeSeries`
/// entry, keeping every reading in the window.
///
/// Readings equal to the `noDataValue` sentinel or that do not parse as a
/// number (USGS emits strings such as `"Ice"` or `"Eqp"`) become absent
/// observations. They are never dropped or read as zero.
///
/// # Errors
/// - `IngestError::Parse` - malformed JSON, missing metadata, or a
///   `dateTime` that is not ISO 8601.
/// - `IngestError::NoDataAvailable` - the response has no `timeSeries`.
/// - `IngestError::InvalidSeries` - readings out of chronological order.
pub fn parse_iv_series(json: &str) -> Result<Vec<FetchedSeries>, IngestError> {
    let response: IvResponse = serde_json::from_str(json)
        .map_err(|e| IngestError::Parse(format!("JSON deserialization failed: {}", e)))?;

    if response.value.time_series.is_empty() {
        return Err(IngestError::NoDataAvailable(
            "No timeSeries entries in response".to_string(),
        ));
    }

    response
        .value
        .time_series
        .into_iter()
        .map(convert_time_series)
        .collect()
}

fn convert_time_series(ts: TimeSeries) -> Result<FetchedSeries, IngestError> {
    let site_code = ts
        .source_info
        .site_code
        .into_iter()
        .next()
        .ok_or_else(|| IngestError::Parse("Missing siteCode".to_string()))?
        .value;

    let parameter_code = ts
        .variable
        .variable_code
        .into_iter()
        .next()
        .ok_or_else(|| IngestError::Parse("Missing variableCode".to_string()))?
        .value;

    let entries = ts
        .values
        .into_iter()
        .next()
        .ok_or_else(|| IngestError::Parse("Missing values array".to_string()))?
        .value;

    let no_data = ts.variable.no_data_value;
    let mut observations = Vec::with_capacity(entries.len());
    for entry in &entries {
        let timestamp = DateTime::parse_from_rfc3339(&entry.date_time)
            .map_err(|e| {
                IngestError::Parse(format!("Bad dateTime '{}': {}", entry.date_time, e))
            })?
            .with_timezone(&Utc);

        let value = entry
            .value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .filter(|v| no_data.is_none_or(|sentinel| (v - sentinel).abs() >= 0.1));

        if value.is_none() {
            debug!(site = %site_code, raw = %entry.value, at = %entry.date_time, "reading marked absent");
        }
        observations.push(Observation::new(timestamp, value));
    }

    let series = ObservationSeries::new(site_code.clone(), observations).map_err(|source| {
        IngestError::InvalidSeries {
            site: site_code.clone(),
            source,
        }
    })?;

    Ok(FetchedSeries {
        site_code,
        site_name: ts.source_info.site_name,
        parameter_code,
        unit: ts.variable.unit.unit_code,
        series,
    })
}

// ---------------------------------------------------------------------------
// Fetching
// ---------------------------------------------------------------------------

/// The ingestion interface: provides one site's series for a time window.
pub trait SeriesSource: Send + Sync {
    fn fetch(
        &self,
        site_code: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FetchedSeries, IngestError>;
}

/// Blocking USGS IV client for a single parameter.
pub struct UsgsClient {
    http: reqwest::blocking::Client,
    base_url: String,
    parameter_code: String,
}

impl UsgsClient {
    pub fn new(
        base_url: impl Into<String>,
        parameter_code: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, IngestError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("flostat/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            parameter_code: parameter_code.into(),
        })
    }
}

impl SeriesSource for UsgsClient {
    fn fetch(
        &self,
        site_code: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FetchedSeries, IngestError> {
        let url = build_iv_url(
            &self.base_url,
            &[site_code],
            &[self.parameter_code.as_str()],
            &start.format("%Y-%m-%d").to_string(),
            &end.format("%Y-%m-%d").to_string(),
        );
        debug!(site = %site_code, %url, "requesting IV data");

        let response = self.http.get(&url).send()?;
        if !response.status().is_success() {
            return Err(IngestError::Http {
                status: response.status().as_u16(),
                url,
            });
        }
        let body = response.text()?;

        let fetched = parse_iv_series(&body)?
            .into_iter()
            .find(|s| s.site_code == site_code && s.parameter_code == self.parameter_code)
            .ok_or_else(|| {
                IngestError::NoDataAvailable(format!(
                    "no {} series for site {}",
                    self.parameter_code, site_code
                ))
            })?;

        info!(
            site = %site_code,
            readings = fetched.series.len(),
            present = fetched.series.present_count(),
            "fetched IV series"
        );
        Ok(fetched)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
