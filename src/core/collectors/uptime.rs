use std::path::PathBuf;

use tracing::trace;

use super::{error::CollectorError, traits::DataProducer, types::CollectorResult};
use crate::{config::metrics::SourcesConfig, core::metric::MetricKind, register_probe};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Whole days since boot, from the first field of `/proc/uptime`.
#[derive(Debug, Clone)]
pub struct UptimeCollector {
    path: PathBuf,
}

impl UptimeCollector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        UptimeCollector { path: path.into() }
    }
}

impl From<&SourcesConfig> for UptimeCollector {
    fn from(sources: &SourcesConfig) -> Self {
        UptimeCollector::new(&sources.uptime)
    }
}

/// Parses `"350735.47 234388.90"` (uptime, idle) into whole days.
pub fn parse_uptime_days(content: &str, location: &str) -> CollectorResult<i64> {
    let first = content
        .split_whitespace()
        .next()
        .ok_or_else(|| CollectorError::InvalidFormat {
            location: location.to_string(),
            reason: "file is empty".to_string(),
        })?;

    let seconds = first.parse::<f64>().map_err(|_| {
        CollectorError::parse("uptime_seconds", location, format!("invalid value: {first}"))
    })?;

    Ok((seconds / SECONDS_PER_DAY) as i64)
}

#[async_trait::async_trait]
impl DataProducer for UptimeCollector {
    type Output = i64;

    async fn produce(&self) -> CollectorResult<Self::Output> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| CollectorError::file_read(&self.path, source))?;

        let days = parse_uptime_days(&content, &self.path.display().to_string())?;
        trace!(days, "Read uptime");
        Ok(days)
    }
}

register_probe!(UptimeCollector, MetricKind::UptimeDays);

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_parse_uptime_days() {
        assert_eq!(parse_uptime_days("350735.47 234388.90\n", "uptime").unwrap(), 4);
        assert_eq!(parse_uptime_days("86399.99 1.0", "uptime").unwrap(), 0);
        assert_eq!(parse_uptime_days("86400.00 1.0", "uptime").unwrap(), 1);
        assert!(matches!(
            parse_uptime_days("", "uptime"),
            Err(CollectorError::InvalidFormat { .. })
        ));
        assert!(matches!(
            parse_uptime_days("soon", "uptime"),
            Err(CollectorError::ParseError { .. })
        ));
    }

    #[tokio::test]
    async fn test_produce_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1209600.00 4000000.00").unwrap();

        let collector = UptimeCollector::new(file.path());
        assert_eq!(collector.produce().await.unwrap(), 14);
    }
}
