/// One invocation of the daily snapshot: fetch every configured site,
/// analyze, write artifacts.
///
/// There is no loop here. An external scheduler (cron, CI) runs the binary
/// once per day; each run is independent of the last.

use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use threadpool::ThreadPool;
use tracing::{info, warn};

use crate::analysis::{AnalysisRecord, analyze_batch};
use crate::config::{ServiceConfig, SiteConfig};
use crate::ingest::usgs::{FetchedSeries, IngestError, SeriesSource, UsgsClient};
use crate::model::ObservationSeries;
use crate::output::{self, OutputError, Report, SiteMetadata, SiteObservations, SiteReport};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to build USGS client: {0}")]
    Client(#[from] IngestError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

/// What one run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub records: Vec<AnalysisRecord>,
    /// Site codes whose fetch failed; each still has a sentinel record.
    pub fetch_failures: Vec<String>,
    pub report_path: Option<PathBuf>,
    pub observations_path: Option<PathBuf>,
    pub commit_message: String,
}

pub struct Pipeline {
    config: ServiceConfig,
    source: Arc<dyn SeriesSource>,
    dry_run: bool,
}

impl Pipeline {
    pub fn new(config: ServiceConfig, source: Arc<dyn SeriesSource>) -> Self {
        Self {
            config,
            source,
            dry_run: false,
        }
    }

    /// A pipeline backed by the live USGS IV service.
    pub fn from_config(config: ServiceConfig) -> Result<Self, PipelineError> {
        let client = UsgsClient::new(
            config.fetch.base_url.clone(),
            config.fetch.parameter_code.clone(),
            StdDuration::from_secs(config.fetch.timeout_secs),
        )?;
        Ok(Self::new(config, Arc::new(client)))
    }

    /// Skip writing artifacts.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn run_once(&self, now: DateTime<Utc>) -> Result<RunSummary, PipelineError> {
        let start = now - Duration::days(i64::from(self.config.fetch.lookback_days));
        info!(
            sites = self.config.sites.len(),
            start = %start.format("%Y-%m-%d"),
            end = %now.format("%Y-%m-%d"),
            "starting run"
        );

        let (sites, fetch_failures) = self.fetch_all(start, now);
        let records = analyze_batch(
            sites.iter().map(|site| site.series.clone()).collect(),
            &self.config.analysis_config(),
            now,
            self.config.output.workers,
        );

        for record in &records {
            info!(site = %record.site_id, headline = %record.headline, "analyzed");
        }

        let commit_message = output::commit_message(now.date_naive(), &records);
        // analyze_batch keeps input order, so records line up with sites.
        let report = Report::new(
            now,
            sites
                .iter()
                .zip(&records)
                .map(|(site, record)| SiteReport {
                    metadata: site.metadata.clone(),
                    record: record.clone(),
                })
                .collect(),
        );

        let (report_path, observations_path) = if self.dry_run {
            info!("dry run, no artifacts written");
            (None, None)
        } else {
            let report_path = output::write_report(&self.config.output.results_dir, &report)?;
            let observations_path =
                output::write_observations(&self.config.output.data_dir, now.date_naive(), &sites)?;
            (Some(report_path), Some(observations_path))
        };

        Ok(RunSummary {
            generated_at: now,
            records,
            fetch_failures,
            report_path,
            observations_path,
            commit_message,
        })
    }

    /// Fetches every site on a worker pool, in configured order. A failed site
    /// gets an empty series so it still yields a record.
    fn fetch_all(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> (Vec<SiteObservations>, Vec<String>) {
        let sites = &self.config.sites;
        if sites.is_empty() {
            return (Vec::new(), Vec::new());
        }

        let pool = ThreadPool::new(self.config.output.workers.clamp(1, sites.len()));
        let (tx, rx) = mpsc::channel();

        for (slot, site) in sites.iter().enumerate() {
            let tx = tx.clone();
            let source = Arc::clone(&self.source);
            let code = site.site_code.clone();
            pool.execute(move || {
                let result = source.fetch(&code, start, end);
                let _ = tx.send((slot, result));
            });
        }
        drop(tx);

        let mut slots: Vec<Option<Result<FetchedSeries, IngestError>>> =
            (0..sites.len()).map(|_| None).collect();
        for (slot, result) in rx {
            slots[slot] = Some(result);
        }

        let mut failures = Vec::new();
        let fetched = sites
            .iter()
            .zip(slots)
            .map(|(site, slot)| {
                let code = &site.site_code;
                match slot {
                    Some(Ok(fetched)) => site_observations(site, fetched),
                    Some(Err(e)) => {
                        warn!(site = %code, error = %e, "fetch failed, analyzing empty series");
                        failures.push(code.clone());
                        configured_only(site)
                    }
                    None => {
                        warn!(site = %code, "fetch worker exited without a result");
                        failures.push(code.clone());
                        configured_only(site)
                    }
                }
            })
            .collect();

        (fetched, failures)
    }
}

/// The upstream site name wins; the configured name fills in when the
/// response left it blank.
fn site_observations(site: &SiteConfig, fetched: FetchedSeries) -> SiteObservations {
    let non_empty = |s: String| (!s.trim().is_empty()).then_some(s);
    SiteObservations {
        metadata: SiteMetadata {
            site_name: non_empty(fetched.site_name).or_else(|| site.name.clone()),
            unit: non_empty(fetched.unit),
        },
        series: fetched.series,
    }
}

/// A failed site: configured name, unknown unit, no readings.
fn configured_only(site: &SiteConfig) -> SiteObservations {
    SiteObservations {
        metadata: SiteMetadata {
            site_name: site.name.clone(),
            unit: None,
        },
        series: ObservationSeries::empty(site.site_code.clone()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
