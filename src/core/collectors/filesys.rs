use std::path::PathBuf;

use tracing::trace;

use super::{error::CollectorError, traits::DataProducer, types::CollectorResult};
use crate::{config::metrics::SourcesConfig, core::metric::MetricKind, register_probe};

/// Block counts reported by `statvfs`, already scaled to bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilesystemSpace {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

/// Percentage of the filesystem holding `disk_path` that is not available
/// to unprivileged users.
#[derive(Debug, Clone)]
pub struct DiskUsageCollector {
    path: PathBuf,
}

impl DiskUsageCollector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DiskUsageCollector { path: path.into() }
    }
}

impl From<&SourcesConfig> for DiskUsageCollector {
    fn from(sources: &SourcesConfig) -> Self {
        DiskUsageCollector::new(&sources.disk_path)
    }
}

/// `100 - available / total * 100`, truncated. An empty filesystem
/// (total 0) reports 0.
pub fn disk_used_percent(space: FilesystemSpace) -> i64 {
    if space.total_bytes == 0 {
        return 0;
    }
    let free = space.available_bytes as f64 / space.total_bytes as f64 * 100.0;
    (100.0 - free) as i64
}

#[cfg(unix)]
fn statvfs(path: &std::path::Path) -> CollectorResult<FilesystemSpace> {
    use std::os::unix::ffi::OsStrExt;

    let c_path = std::ffi::CString::new(path.as_os_str().as_bytes()).map_err(|e| {
        CollectorError::InvalidFormat {
            location: path.display().to_string(),
            reason: e.to_string(),
        }
    })?;

    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };

    if result != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CollectorError::SystemCall {
            syscall: format!("statvfs({})", path.display()),
            reason: err.to_string(),
        });
    }

    let block_size = stat.f_frsize as u64;
    Ok(FilesystemSpace {
        total_bytes: (stat.f_blocks as u64).wrapping_mul(block_size),
        available_bytes: (stat.f_bavail as u64).wrapping_mul(block_size),
    })
}

#[cfg(not(unix))]
fn statvfs(_path: &std::path::Path) -> CollectorResult<FilesystemSpace> {
    Err(CollectorError::UnsupportedCollector(
        "statvfs is only available on unix".to_string(),
    ))
}

#[async_trait::async_trait]
impl DataProducer for DiskUsageCollector {
    type Output = i64;

    async fn produce(&self) -> CollectorResult<Self::Output> {
        let space = statvfs(&self.path)?;
        trace!(
            path = %self.path.display(),
            total = space.total_bytes,
            available = space.available_bytes,
            "Read filesystem space"
        );
        Ok(disk_used_percent(space))
    }
}

register_probe!(DiskUsageCollector, MetricKind::DiskUsage);
