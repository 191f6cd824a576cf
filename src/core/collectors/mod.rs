//! Probes, one per metric kind.
//!
//! Each probe implements [`DataProducer`] and registers itself with
//! [`register_probe!`](crate::register_probe), so [`ProbeRegistry::new`]
//! finds every probe linked into the binary.

/// CPU load (`/proc/loadavg`).
pub mod avg;
/// CPU clock speed (cpufreq).
pub mod cpufreq;
pub mod error;
/// Disk usage (`statvfs`).
pub mod filesys;
/// Memory and swap usage (`/proc/meminfo`).
pub mod ram;
pub mod registry;
/// CPU temperature (thermal zone).
pub mod thermal;
pub mod traits;
pub mod types;
/// Uptime in days (`/proc/uptime`).
pub mod uptime;
/// Core voltage (`vcgencmd`).
pub mod voltage;

pub use avg::CpuLoadCollector;
pub use cpufreq::ClockSpeedCollector;
pub use error::CollectorError;
pub use filesys::DiskUsageCollector;
pub use ram::{MemoryCollector, SwapCollector};
pub use registry::{DynProbe, DynWrapper, ProbeRegistry};
pub use thermal::CpuTempCollector;
pub use traits::DataProducer;
pub use types::CollectorResult;
pub use uptime::UptimeCollector;
pub use voltage::VoltageCollector;
