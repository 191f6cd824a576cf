//! `[publish]` table: topic layout, message grouping, discovery and pacing.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// How an `Unavailable` metric reaches the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbsentValue {
    /// Publish `0`.
    #[default]
    Zero,
    /// JSON `null` when grouped, an empty payload otherwise.
    Null,
    /// Leave the key out when grouped, skip the value publish otherwise.
    Omit,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PublishConfig {
    /// First topic level for values and the discovery node id.
    #[validate(
        length(min = 1, max = 128, message = "Topic prefix must be between 1 and 128 characters"),
        custom(function = "validate_topic_prefix")
    )]
    pub topic_prefix: String,

    /// Publish all metrics as one JSON document on `{prefix}/{hostname}`.
    pub group_messages: bool,

    /// Publish Home Assistant discovery configs before the values.
    pub discovery_messages: bool,

    /// Set the retain flag on discovery configs.
    pub discovery_retain: bool,

    /// Pause after each paced publish, in seconds.
    #[validate(
        range(min = 0.0, max = 60.0, message = "sleep_time must be between 0 and 60 seconds"),
        custom(function = "validate_finite")
    )]
    pub sleep_time: f64,

    /// Upper bound of the random start delay, in seconds. 0 disables it.
    #[validate(
        range(min = 0.0, max = 3600.0, message = "random_delay must be between 0 and 3600 seconds"),
        custom(function = "validate_finite")
    )]
    pub random_delay: f64,

    pub absent_value: AbsentValue,

    #[validate(nested)]
    pub device: DeviceConfig,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            topic_prefix: "rpi-MQTT-monitor".to_string(),
            group_messages: false,
            discovery_messages: true,
            discovery_retain: false,
            sleep_time: 0.5,
            random_delay: 0.0,
            absent_value: AbsentValue::default(),
            device: DeviceConfig::default(),
        }
    }
}

impl PublishConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_secs_f64(self.sleep_time)
    }
}

// `range` lets NaN through since every comparison with it is false.
fn validate_finite(value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::new("not_finite")
            .with_message("Duration must be a finite number of seconds".into()));
    }
    Ok(())
}

fn validate_topic_prefix(prefix: &str) -> Result<(), ValidationError> {
    if prefix.contains(['+', '#']) {
        return Err(ValidationError::new("wildcard_prefix")
            .with_message("Topic prefix must not contain MQTT wildcards".into()));
    }
    if prefix.starts_with('/') || prefix.ends_with('/') {
        return Err(ValidationError::new("slash_prefix")
            .with_message("Topic prefix must not start or end with '/'".into()));
    }
    Ok(())
}

/// Device block advertised in discovery configs.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DeviceConfig {
    #[validate(length(min = 1, message = "Manufacturer must not be empty"))]
    pub manufacturer: String,

    /// Used instead of the system hostname in topics and ids.
    #[validate(
        length(min = 1, message = "Hostname override must not be empty"),
        custom(function = "validate_hostname_override")
    )]
    pub hostname: Option<String>,

    /// Used instead of the model read from the device tree.
    #[validate(length(min = 1, message = "Model override must not be empty"))]
    pub model: Option<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            manufacturer: "Raspberry Pi".to_string(),
            hostname: None,
            model: None,
        }
    }
}

fn validate_hostname_override(hostname: &str) -> Result<(), ValidationError> {
    if hostname.contains(['+', '#', '/']) {
        return Err(ValidationError::new("invalid_hostname")
            .with_message("Hostname must not contain '+', '#' or '/'".into()));
    }
    Ok(())
}
