/// Result artifacts handed to the versioning and plotting layers.
///
/// One invocation writes two dated JSON files:
/// - `results/analysis_YYYYMMDD.json`  - every `AnalysisRecord` plus a summary
/// - `data/observations_YYYYMMDD.json` - the raw series the records came from
///
/// Each site entry in both files carries `site_name` and `unit` next to the
/// site number.
///
/// A rerun on the same day overwrites that day's files.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

use crate::analysis::AnalysisRecord;
use crate::model::ObservationSeries;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {}: {source}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Descriptive fields for a site. Both are `None` when neither the upstream
/// response nor the configuration supplied them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SiteMetadata {
    pub site_name: Option<String>,
    pub unit: Option<String>,
}

/// One site's entry in `analysis_YYYYMMDD.json`.
#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    #[serde(flatten)]
    pub metadata: SiteMetadata,
    #[serde(flatten)]
    pub record: AnalysisRecord,
}

/// One site's entry in `observations_YYYYMMDD.json`.
#[derive(Debug, Clone, Serialize)]
pub struct SiteObservations {
    #[serde(flatten)]
    pub metadata: SiteMetadata,
    #[serde(flatten)]
    pub series: ObservationSeries,
}

/// Contents of `analysis_YYYYMMDD.json`.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    /// One line covering every site.
    pub summary: String,
    pub records: Vec<SiteReport>,
}

impl Report {
    pub fn new(generated_at: DateTime<Utc>, records: Vec<SiteReport>) -> Self {
        Self {
            generated_at,
            summary: overall_summary(records.iter().map(|r| &r.record)),
            records,
        }
    }
}

/// `"<site>: <headline>; <site>: <headline>"`, or a note when nothing ran.
pub fn overall_summary<'a>(records: impl IntoIterator<Item = &'a AnalysisRecord>) -> String {
    let records: Vec<&AnalysisRecord> = records.into_iter().collect();
    match records.as_slice() {
        [] => "no sites analyzed".to_string(),
        [only] => only.headline.clone(),
        many => many
            .iter()
            .map(|r| format!("{}: {}", r.site_id, r.headline))
            .collect::<Vec<_>>()
            .join("; "),
    }
}

/// The one-line message for the day's artifact commit.
pub fn commit_message(date: NaiveDate, records: &[AnalysisRecord]) -> String {
    format!(
        "Daily update: {} - {}",
        date.format("%Y-%m-%d"),
        overall_summary(records)
    )
}

pub fn report_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("analysis_{}.json", date.format("%Y%m%d")))
}

pub fn observations_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("observations_{}.json", date.format("%Y%m%d")))
}

/// Writes the report as pretty JSON, creating `dir` if needed.
pub fn write_report(dir: &Path, report: &Report) -> Result<PathBuf, OutputError> {
    let path = report_path(dir, report.generated_at.date_naive());
    write_json(&path, report)?;
    info!(path = %path.display(), records = report.records.len(), "wrote analysis report");
    Ok(path)
}

/// Writes the raw series for the plotting layer.
pub fn write_observations(
    dir: &Path,
    date: NaiveDate,
    sites: &[SiteObservations],
) -> Result<PathBuf, OutputError> {
    let path = observations_path(dir, date);
    write_json(&path, sites)?;
    info!(path = %path.display(), sites = sites.len(), "wrote observation snapshot");
    Ok(path)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), OutputError> {
    let io_err = |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| OutputError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    writer.write_all(b"\n").map_err(io_err)?;
    writer.flush().map_err(io_err)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
