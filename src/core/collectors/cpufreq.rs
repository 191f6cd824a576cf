use std::path::PathBuf;

use tracing::trace;

use super::{error::CollectorError, traits::DataProducer, types::CollectorResult};
use crate::{config::metrics::SourcesConfig, core::metric::MetricKind, register_probe};

/// Current clock of cpu0 in MHz, from cpufreq's `scaling_cur_freq` (kHz).
#[derive(Debug, Clone)]
pub struct ClockSpeedCollector {
    path: PathBuf,
}

impl ClockSpeedCollector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ClockSpeedCollector { path: path.into() }
    }
}

impl From<&SourcesConfig> for ClockSpeedCollector {
    fn from(sources: &SourcesConfig) -> Self {
        ClockSpeedCollector::new(&sources.cpufreq)
    }
}

/// kHz to MHz, rounded to the nearest integer.
pub fn parse_khz_as_mhz(content: &str, location: &str) -> CollectorResult<i64> {
    let raw = content.trim();
    let khz = raw.parse::<u64>().map_err(|_| {
        CollectorError::parse("sys_clock_speed", location, format!("invalid value: {raw}"))
    })?;
    Ok((khz as f64 / 1000.0).round() as i64)
}

#[async_trait::async_trait]
impl DataProducer for ClockSpeedCollector {
    type Output = i64;

    async fn produce(&self) -> CollectorResult<Self::Output> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| CollectorError::file_read(&self.path, source))?;

        let mhz = parse_khz_as_mhz(&content, &self.path.display().to_string())?;
        trace!(mhz, "Read CPU clock speed");
        Ok(mhz)
    }
}

register_probe!(ClockSpeedCollector, MetricKind::SysClockSpeed);

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_parse_khz_as_mhz() {
        assert_eq!(parse_khz_as_mhz("1500000\n", "freq").unwrap(), 1500);
        assert_eq!(parse_khz_as_mhz("600499", "freq").unwrap(), 600);
        assert_eq!(parse_khz_as_mhz("600500", "freq").unwrap(), 601);
        assert!(parse_khz_as_mhz("", "freq").is_err());
        assert!(parse_khz_as_mhz("fast", "freq").is_err());
    }

    #[tokio::test]
    async fn test_produce_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1800000").unwrap();

        let collector = ClockSpeedCollector::new(file.path());
        assert_eq!(collector.produce().await.unwrap(), 1800);
    }

    #[tokio::test]
    async fn test_missing_cpufreq_propagates() {
        let collector = ClockSpeedCollector::new("/nonexistent/scaling_cur_freq");
        assert!(matches!(
            collector.produce().await,
            Err(CollectorError::FileRead { .. })
        ));
    }
}
