//! `[metrics]` table: which metrics are sampled and where each probe reads.
//!
//! Flag names follow the grouped JSON keys, so the configuration file reads
//! the same as the payload it produces.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::metric::MetricKind;

/// Per-metric enable flags plus probe source overrides.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MetricsConfig {
    pub cpu_load: bool,
    pub cpu_temp: bool,
    pub used_space: bool,
    pub voltage: bool,
    pub sys_clock_speed: bool,
    pub swap: bool,
    pub memory: bool,
    pub uptime: bool,

    #[validate(nested)]
    pub sources: SourcesConfig,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            cpu_load: true,
            cpu_temp: true,
            used_space: true,
            voltage: true,
            sys_clock_speed: true,
            swap: true,
            memory: true,
            uptime: true,
            sources: SourcesConfig::default(),
        }
    }
}

impl MetricsConfig {
    /// Whether `kind` should be sampled.
    pub fn is_enabled(&self, kind: MetricKind) -> bool {
        match kind {
            MetricKind::CpuLoad => self.cpu_load,
            MetricKind::CpuTemp => self.cpu_temp,
            MetricKind::DiskUsage => self.used_space,
            MetricKind::Voltage => self.voltage,
            MetricKind::Swap => self.swap,
            MetricKind::Memory => self.memory,
            MetricKind::SysClockSpeed => self.sys_clock_speed,
            MetricKind::UptimeDays => self.uptime,
        }
    }

    /// Enabled kinds in table order.
    pub fn enabled_kinds(&self) -> Vec<MetricKind> {
        MetricKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }

    /// Builds a config with exactly `kinds` enabled and default sources.
    pub fn only(kinds: &[MetricKind]) -> Self {
        Self {
            cpu_load: kinds.contains(&MetricKind::CpuLoad),
            cpu_temp: kinds.contains(&MetricKind::CpuTemp),
            used_space: kinds.contains(&MetricKind::DiskUsage),
            voltage: kinds.contains(&MetricKind::Voltage),
            sys_clock_speed: kinds.contains(&MetricKind::SysClockSpeed),
            swap: kinds.contains(&MetricKind::Swap),
            memory: kinds.contains(&MetricKind::Memory),
            uptime: kinds.contains(&MetricKind::UptimeDays),
            sources: SourcesConfig::default(),
        }
    }
}

/// Where each probe reads from. Defaults are the standard Linux and
/// Raspberry Pi locations; override them for other boards or for tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SourcesConfig {
    pub loadavg: PathBuf,
    /// Thermal zone `temp` file, in millidegrees Celsius.
    pub thermal_zone: PathBuf,
    /// Mount point passed to `statvfs`.
    pub disk_path: PathBuf,
    pub meminfo: PathBuf,
    /// `scaling_cur_freq` file, in kHz.
    pub cpufreq: PathBuf,
    pub uptime: PathBuf,
    /// Name or path of the VideoCore command line tool.
    #[validate(length(min = 1, message = "vcgencmd command must not be empty"))]
    pub vcgencmd: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            loadavg: PathBuf::from("/proc/loadavg"),
            thermal_zone: PathBuf::from("/sys/class/thermal/thermal_zone0/temp"),
            disk_path: PathBuf::from("/"),
            meminfo: PathBuf::from("/proc/meminfo"),
            cpufreq: PathBuf::from("/sys/devices/system/cpu/cpu0/cpufreq/scaling_cur_freq"),
            uptime: PathBuf::from("/proc/uptime"),
            vcgencmd: "vcgencmd".to_string(),
        }
    }
}
