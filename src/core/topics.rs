//! Topic layout.
//!
//! ```text
//! homeassistant/sensor/{prefix}/{hostname}_{suffix}/config   discovery
//! {prefix}/{hostname}/{suffix}                               ungrouped value
//! {prefix}/{hostname}                                        grouped value
//! ```

use super::metric::MetricKind;

/// Home Assistant's default discovery prefix.
pub const DISCOVERY_PREFIX: &str = "homeassistant";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicLayout {
    prefix: String,
    hostname: String,
}

impl TopicLayout {
    pub fn new(prefix: impl Into<String>, hostname: impl Into<String>) -> Self {
        TopicLayout {
            prefix: prefix.into(),
            hostname: hostname.into(),
        }
    }

    /// `{hostname}_{suffix}`, stable across runs.
    pub fn unique_id(&self, kind: MetricKind) -> String {
        format!("{}_{}", self.hostname, kind.suffix())
    }

    pub fn discovery(&self, kind: MetricKind) -> String {
        format!(
            "{}/sensor/{}/{}/config",
            DISCOVERY_PREFIX,
            self.prefix,
            self.unique_id(kind)
        )
    }

    pub fn value(&self, kind: MetricKind) -> String {
        format!("{}/{}/{}", self.prefix, self.hostname, kind.suffix())
    }

    pub fn grouped(&self) -> String {
        format!("{}/{}", self.prefix, self.hostname)
    }

    /// Where a kind's state lives: the grouped topic or its own topic.
    pub fn state(&self, kind: MetricKind, grouped: bool) -> String {
        if grouped {
            self.grouped()
        } else {
            self.value(kind)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let layout = TopicLayout::new("rpi-MQTT-monitor", "pi4");

        assert_eq!(
            layout.discovery(MetricKind::CpuTemp),
            "homeassistant/sensor/rpi-MQTT-monitor/pi4_cputemp/config"
        );
        assert_eq!(
            layout.value(MetricKind::SysClockSpeed),
            "rpi-MQTT-monitor/pi4/sys_clock_speed"
        );
        assert_eq!(layout.grouped(), "rpi-MQTT-monitor/pi4");
        assert_eq!(layout.unique_id(MetricKind::DiskUsage), "pi4_diskusage");
    }

    #[test]
    fn test_state_topic_depends_on_grouping() {
        let layout = TopicLayout::new("sbc", "pi");
        for kind in MetricKind::ALL {
            assert_eq!(layout.state(kind, true), "sbc/pi");
            assert_eq!(
                layout.state(kind, false),
                format!("sbc/pi/{}", kind.suffix())
            );
        }
    }
}
