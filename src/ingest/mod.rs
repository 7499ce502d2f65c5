/// Upstream data sources. Each service gets its own file under ingest/.
pub mod usgs;

#[cfg(test)]
mod fixtures;
