//! Home Assistant MQTT discovery configs.
//!
//! A config tells Home Assistant where a sensor's state is published and
//! how to show it. Building one is pure: the same kind, host and settings
//! always give the same document.

use serde::{Deserialize, Serialize};

use super::{host::HostIdentity, metric::MetricKind, topics::TopicLayout};
use crate::config::publish::PublishConfig;

/// The `device` block that groups all sensors of one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceBlock {
    pub identifiers: Vec<String>,
    pub manufacturer: String,
    pub model: String,
    pub name: String,
}

/// Discovery payload for one sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryDescriptor {
    pub state_topic: String,
    pub icon: String,
    pub name: String,
    pub unique_id: String,
    pub unit_of_measurement: String,
    pub device: DeviceBlock,
    /// Only set in grouped mode, where the state is a JSON document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_template: Option<String>,
}

impl DiscoveryDescriptor {
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Builds the discovery config for `kind`.
pub fn build(kind: MetricKind, host: &HostIdentity, config: &PublishConfig) -> DiscoveryDescriptor {
    let spec = kind.spec();
    let layout = TopicLayout::new(&config.topic_prefix, &host.hostname);

    DiscoveryDescriptor {
        state_topic: layout.state(kind, config.group_messages),
        icon: spec.icon.to_string(),
        name: format!("{} {}", host.hostname, spec.display_name),
        unique_id: layout.unique_id(kind),
        unit_of_measurement: spec.unit.to_string(),
        device: DeviceBlock {
            identifiers: vec![host.hostname.clone()],
            manufacturer: config.device.manufacturer.clone(),
            model: host.model.clone(),
            name: host.hostname.clone(),
        },
        value_template: config
            .group_messages
            .then(|| format!("{{{{value_json.{}}}}}", spec.json_key)),
    }
}

/// Looks a kind up by topic suffix. Unknown suffixes give `None`.
pub fn descriptor_for_suffix(
    suffix: &str,
    host: &HostIdentity,
    config: &PublishConfig,
) -> Option<DiscoveryDescriptor> {
    MetricKind::from_suffix(suffix).map(|kind| build(kind, host, config))
}
