use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use tracing::trace;

use super::{error::CollectorError, traits::DataProducer, types::CollectorResult};
use crate::{
    config::metrics::SourcesConfig,
    core::metric::{round1, MetricKind},
    register_probe,
};

/// The `/proc/meminfo` fields sbcmon reports on, in kilobytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemInfo {
    pub mem_total: u64,
    pub mem_available: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

/// Parses `/proc/meminfo`. Every field of [`MemInfo`] is required.
///
/// ```text
/// MemTotal:        3884376 kB
/// MemFree:         2466716 kB
/// MemAvailable:    3295916 kB
/// SwapTotal:        102396 kB
/// SwapFree:         102396 kB
/// ```
pub fn parse_meminfo(content: &str, location: &str) -> CollectorResult<MemInfo> {
    let mut fields: HashMap<&str, u64> = HashMap::with_capacity(64);

    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        // Value first, unit (kB) second.
        if let Some(Ok(value)) = rest.split_whitespace().next().map(str::parse::<u64>) {
            fields.insert(key.trim(), value);
        }
    }

    let field = |name: &str| -> CollectorResult<u64> {
        fields
            .get(name)
            .copied()
            .ok_or_else(|| CollectorError::MissingField {
                field: name.to_string(),
                location: location.to_string(),
            })
    };

    Ok(MemInfo {
        mem_total: field("MemTotal")?,
        mem_available: field("MemAvailable")?,
        swap_total: field("SwapTotal")?,
        swap_free: field("SwapFree")?,
    })
}

/// Used RAM (total minus available) as a whole percentage.
pub fn memory_percent(info: &MemInfo, location: &str) -> CollectorResult<i64> {
    if info.mem_total == 0 {
        return Err(CollectorError::parse("memory", location, "MemTotal is 0"));
    }
    let used = info.mem_total.saturating_sub(info.mem_available);
    Ok((used as f64 / info.mem_total as f64 * 100.0).round() as i64)
}

/// Used swap as a percentage with one decimal. No swap configured is 0.0.
pub fn swap_percent(info: &MemInfo) -> f64 {
    if info.swap_total == 0 {
        return 0.0;
    }
    let used = info.swap_total.saturating_sub(info.swap_free);
    round1(used as f64 / info.swap_total as f64 * 100.0)
}

async fn read_meminfo(path: &Path) -> CollectorResult<MemInfo> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CollectorError::file_read(path, source))?;
    let info = parse_meminfo(&content, &path.display().to_string())?;
    trace!(?info, "Read meminfo");
    Ok(info)
}

/// RAM usage from `/proc/meminfo`.
#[derive(Debug, Clone)]
pub struct MemoryCollector {
    path: PathBuf,
}

impl MemoryCollector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        MemoryCollector { path: path.into() }
    }
}

impl From<&SourcesConfig> for MemoryCollector {
    fn from(sources: &SourcesConfig) -> Self {
        MemoryCollector::new(&sources.meminfo)
    }
}

#[async_trait::async_trait]
impl DataProducer for MemoryCollector {
    type Output = i64;

    async fn produce(&self) -> CollectorResult<Self::Output> {
        let info = read_meminfo(&self.path).await?;
        memory_percent(&info, &self.path.display().to_string())
    }
}

register_probe!(MemoryCollector, MetricKind::Memory);

/// Swap usage from `/proc/meminfo`.
#[derive(Debug, Clone)]
pub struct SwapCollector {
    path: PathBuf,
}

impl SwapCollector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SwapCollector { path: path.into() }
    }
}

impl From<&SourcesConfig> for SwapCollector {
    fn from(sources: &SourcesConfig) -> Self {
        SwapCollector::new(&sources.meminfo)
    }
}

#[async_trait::async_trait]
impl DataProducer for SwapCollector {
    type Output = f64;

    async fn produce(&self) -> CollectorResult<Self::Output> {
        let info = read_meminfo(&self.path).await?;
        Ok(swap_percent(&info))
    }
}

register_probe!(SwapCollector, MetricKind::Swap);

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    const MEMINFO: &str = "\
MemTotal:        4000000 kB
MemFree:         1000000 kB
MemAvailable:    2500000 kB
Buffers:           50000 kB
Cached:          1200000 kB
SwapCached:            0 kB
SwapTotal:        200000 kB
SwapFree:         150000 kB
HugePages_Total:       0
";

    fn meminfo_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_meminfo() {
        let info = parse_meminfo(MEMINFO, "/proc/meminfo").unwrap();
        assert_eq!(
            info,
            MemInfo {
                mem_total: 4_000_000,
                mem_available: 2_500_000,
                swap_total: 200_000,
                swap_free: 150_000,
            }
        );
    }

    #[test]
    fn test_missing_field() {
        let result = parse_meminfo("MemTotal: 100 kB\nMemFree: 50 kB\n", "/proc/meminfo");
        match result {
            Err(CollectorError::MissingField { field, .. }) => assert_eq!(field, "MemAvailable"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_percentages() {
        let info = parse_meminfo(MEMINFO, "/proc/meminfo").unwrap();
        // (4_000_000 - 2_500_000) / 4_000_000 = 37.5% -> 38
        assert_eq!(memory_percent(&info, "/proc/meminfo").unwrap(), 38);
        assert_eq!(swap_percent(&info), 25.0);
    }

    #[test]
    fn test_no_swap_is_zero() {
        let info = MemInfo {
            mem_total: 100,
            mem_available: 50,
            swap_total: 0,
            swap_free: 0,
        };
        assert_eq!(swap_percent(&info), 0.0);
    }

    #[test]
    fn test_zero_total_memory_is_error() {
        let info = MemInfo {
            mem_total: 0,
            mem_available: 0,
            swap_total: 0,
            swap_free: 0,
        };
        assert!(matches!(
            memory_percent(&info, "/proc/meminfo"),
            Err(CollectorError::ParseError { .. })
        ));
    }

    #[tokio::test]
    async fn test_collectors_read_file() {
        let file = meminfo_file(MEMINFO);

        assert_eq!(MemoryCollector::new(file.path()).produce().await.unwrap(), 38);
        assert_eq!(SwapCollector::new(file.path()).produce().await.unwrap(), 25.0);
    }

    #[tokio::test]
    async fn test_unreadable_file_propagates() {
        let result = SwapCollector::new("/nonexistent/meminfo").produce().await;
        assert!(matches!(result, Err(CollectorError::FileRead { .. })));
    }
}
