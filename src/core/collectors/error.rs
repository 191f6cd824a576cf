use thiserror::Error;

use crate::core::metric::MetricKind;

/// Errors raised while sampling a metric.
#[derive(Error, Debug)]
pub enum CollectorError {
    /// Failed to read a pseudo-file.
    #[error("Failed to read file {path}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A value was found but could not be parsed.
    #[error("Failed to parse {metric} from {location}: {reason}")]
    ParseError {
        metric: String,
        location: String,
        reason: String,
    },

    /// A required key is absent (e.g. `MemTotal` in `/proc/meminfo`).
    #[error("Missing required field: {field} in {location}")]
    MissingField { field: String, location: String },

    /// The source does not have the expected layout.
    #[error("Invalid format in {location}: {reason}")]
    InvalidFormat { location: String, reason: String },

    /// A system call such as `statvfs` failed.
    #[error("System call failed: {syscall} - {reason}")]
    SystemCall { syscall: String, reason: String },

    /// An external tool could not be started.
    #[error("Command '{command}' failed: {source}")]
    CommandExecution {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// An external tool ran but reported failure.
    #[error("Command '{command}' exited with {status}")]
    CommandStatus { command: String, status: String },

    /// No probe is registered for this metric.
    #[error("No probe registered for metric: {0}")]
    CollectorNotFound(MetricKind),

    /// The probe cannot run on this platform.
    #[error("Unsupported collector: {0}")]
    UnsupportedCollector(String),

    /// A probe failed; wraps the cause with the metric it was sampling.
    #[error("Probe for {metric} failed: {source}")]
    Probe {
        metric: MetricKind,
        #[source]
        source: Box<CollectorError>,
    },
}

impl CollectorError {
    pub fn parse(metric: &str, location: impl Into<String>, reason: impl Into<String>) -> Self {
        CollectorError::ParseError {
            metric: metric.to_string(),
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub fn file_read(path: &std::path::Path, source: std::io::Error) -> Self {
        CollectorError::FileRead {
            path: path.display().to_string(),
            source,
        }
    }

    /// The metric named by a `Probe` error, if any.
    pub fn metric(&self) -> Option<MetricKind> {
        match self {
            CollectorError::Probe { metric, .. } => Some(*metric),
            CollectorError::CollectorNotFound(metric) => Some(*metric),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn test_probe_error_names_metric() {
        let err = CollectorError::Probe {
            metric: MetricKind::Memory,
            source: Box::new(CollectorError::MissingField {
                field: "MemTotal".into(),
                location: "/proc/meminfo".into(),
            }),
        };

        assert_eq!(err.metric(), Some(MetricKind::Memory));
        assert!(err.to_string().contains("memory"));
        assert!(err.to_string().contains("MemTotal"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_file_read_display() {
        let err = CollectorError::file_read(
            std::path::Path::new("/proc/uptime"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.to_string(), "Failed to read file /proc/uptime");
        assert_eq!(err.metric(), None);
    }
}
