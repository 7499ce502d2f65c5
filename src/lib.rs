/// flostat_service: daily streamflow statistics and flow-condition snapshot.
///
/// # Module structure
///
/// ```text
/// flostat_service
/// ├── model       - Observation, ObservationSeries, AnalysisError
/// ├── config      - service configuration loader (flostat.toml)
/// ├── logging     - tracing subscriber setup
/// ├── ingest
/// │   ├── usgs    - USGS NWIS IV API: URL construction, JSON parsing, fetch
/// │   └── fixtures (test only) - representative API response payloads
/// ├── analysis
/// │   ├── summary  - count, mean, median, stddev, percentiles
/// │   ├── trend    - least-squares trend with dead-band direction
/// │   ├── anomaly  - range and k-sigma outlier flags
/// │   ├── classify - flow condition from percentile rank
/// │   └── change   - recent change against a look-back
/// ├── output      - dated JSON result and observation files
/// └── pipeline    - one fetch, analyze, write invocation
/// ```

/// Public modules
pub mod analysis;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod output;
pub mod pipeline;
