//! Host identity: the hostname used in topics and ids, and the hardware
//! model advertised in discovery configs.

use std::path::Path;

use tracing::{debug, warn};

use crate::config::publish::DeviceConfig;

const CPUINFO: &str = "/proc/cpuinfo";
const DEVICE_TREE_MODEL: &str = "/proc/device-tree/model";
const UNKNOWN_MODEL: &str = "Unknown";

/// Resolved once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    pub hostname: String,
    pub model: String,
}

impl HostIdentity {
    pub fn new(hostname: impl Into<String>, model: impl Into<String>) -> Self {
        HostIdentity {
            hostname: hostname.into(),
            model: model.into(),
        }
    }

    /// Resolves the identity from config overrides and the running system.
    pub async fn resolve(device: &DeviceConfig) -> Self {
        Self::resolve_from(device, Path::new(CPUINFO), Path::new(DEVICE_TREE_MODEL)).await
    }

    /// Like [`resolve`](Self::resolve) with explicit model sources.
    pub async fn resolve_from(device: &DeviceConfig, cpuinfo: &Path, device_tree: &Path) -> Self {
        let hostname = match &device.hostname {
            Some(hostname) => hostname.clone(),
            None => system_hostname(),
        };

        let model = match &device.model {
            Some(model) => model.clone(),
            None => detect_model(cpuinfo, device_tree).await,
        };

        debug!(%hostname, %model, "Resolved host identity");
        HostIdentity { hostname, model }
    }
}

fn system_hostname() -> String {
    sanitize_hostname(&gethostname::gethostname().to_string_lossy())
}

/// Makes a raw hostname usable as a single topic level: `/`, `+` and `#`
/// become `_`, and an empty name becomes `localhost`.
pub fn sanitize_hostname(raw: &str) -> String {
    if raw.is_empty() {
        warn!("System hostname is empty, using 'localhost'");
        return "localhost".to_string();
    }
    raw.chars()
        .map(|c| if matches!(c, '/' | '+' | '#') { '_' } else { c })
        .collect()
}

async fn detect_model(cpuinfo: &Path, device_tree: &Path) -> String {
    if let Ok(content) = tokio::fs::read_to_string(cpuinfo).await {
        if let Some(model) = parse_cpuinfo_model(&content) {
            return model;
        }
    }

    if let Ok(bytes) = tokio::fs::read(device_tree).await {
        let model = String::from_utf8_lossy(&bytes)
            .trim_end_matches('\0')
            .trim()
            .to_string();
        if !model.is_empty() {
            return model;
        }
    }

    warn!("Could not detect hardware model, using '{}'", UNKNOWN_MODEL);
    UNKNOWN_MODEL.to_string()
}

/// Value of the `Model` line in `/proc/cpuinfo`, e.g.
/// `Model\t\t: Raspberry Pi 4 Model B Rev 1.4`.
pub fn parse_cpuinfo_model(content: &str) -> Option<String> {
    content
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim() == "Model")
        .map(|(_, value)| value.trim().to_string())
        .filter(|model| !model.is_empty())
}
