use std::{num::NonZeroUsize, path::PathBuf};

use tracing::trace;

use super::{error::CollectorError, traits::DataProducer, types::CollectorResult};
use crate::{
    config::metrics::SourcesConfig,
    core::metric::{round1, MetricKind},
    register_probe,
};

/// CPU load as a percentage of the online cores: the 1-minute load average
/// from `/proc/loadavg` divided by the core count.
#[derive(Debug, Clone)]
pub struct CpuLoadCollector {
    path: PathBuf,
    /// Fixed core count; the online count is queried when `None`.
    cores: Option<NonZeroUsize>,
}

impl CpuLoadCollector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CpuLoadCollector {
            path: path.into(),
            cores: None,
        }
    }

    pub fn with_cores(mut self, cores: NonZeroUsize) -> Self {
        self.cores = Some(cores);
        self
    }

    fn cores(&self) -> CollectorResult<NonZeroUsize> {
        match self.cores {
            Some(cores) => Ok(cores),
            None => std::thread::available_parallelism().map_err(|e| CollectorError::SystemCall {
                syscall: "available_parallelism".to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

impl From<&SourcesConfig> for CpuLoadCollector {
    fn from(sources: &SourcesConfig) -> Self {
        CpuLoadCollector::new(&sources.loadavg)
    }
}

/// Extracts the 1-minute average from `/proc/loadavg` content, e.g.
/// `"0.52 0.58 0.59 1/234 12345"`.
pub fn parse_loadavg(content: &str, location: &str) -> CollectorResult<f64> {
    let first = content
        .split_whitespace()
        .next()
        .ok_or_else(|| CollectorError::InvalidFormat {
            location: location.to_string(),
            reason: "file is empty".to_string(),
        })?;

    first
        .parse::<f64>()
        .map_err(|_| CollectorError::parse("one_minute", location, format!("invalid value: {first}")))
}

/// Load per core, as a percentage rounded to one decimal.
pub fn cpu_load_percent(load: f64, cores: NonZeroUsize) -> f64 {
    round1(load / cores.get() as f64 * 100.0)
}

#[async_trait::async_trait]
impl DataProducer for CpuLoadCollector {
    type Output = f64;

    async fn produce(&self) -> CollectorResult<Self::Output> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| CollectorError::file_read(&self.path, source))?;

        let load = parse_loadavg(&content, &self.path.display().to_string())?;
        let cores = self.cores()?;
        trace!(load, cores = cores.get(), "Read load average");

        Ok(cpu_load_percent(load, cores))
    }
}

register_probe!(CpuLoadCollector, MetricKind::CpuLoad);
