//! Metric kinds, the static metric table and measured values.
//!
//! Every place that needs to know something about a metric (probe lookup,
//! topic suffix, grouped JSON key, discovery icon and unit) reads it from
//! [`METRICS`]. The table order is the publish order.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::config::publish::AbsentValue;

/// The closed set of metrics sbcmon knows how to sample.
///
/// Variant order matches [`METRICS`], so the derived `Ord` sorts kinds in
/// table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    CpuLoad,
    CpuTemp,
    DiskUsage,
    Voltage,
    Swap,
    Memory,
    SysClockSpeed,
    UptimeDays,
}

/// Static description of one metric.
#[derive(Debug, PartialEq, Eq)]
pub struct MetricSpec {
    pub kind: MetricKind,
    /// Last topic level in ungrouped mode, and the `unique_id` suffix.
    pub suffix: &'static str,
    /// Key in the grouped JSON document.
    pub json_key: &'static str,
    pub icon: &'static str,
    /// Appended to the hostname to form the entity name.
    pub display_name: &'static str,
    pub unit: &'static str,
    /// Whole-number readings are written as floats (`48.0`) in the grouped
    /// document, matching what existing consumers expect.
    pub grouped_as_float: bool,
}

pub static METRICS: [MetricSpec; 8] = [
    MetricSpec {
        kind: MetricKind::CpuLoad,
        suffix: "cpuload",
        json_key: "cpu_load",
        icon: "mdi:speedometer",
        display_name: "CPU Usage",
        unit: "%",
        grouped_as_float: false,
    },
    MetricSpec {
        kind: MetricKind::CpuTemp,
        suffix: "cputemp",
        json_key: "cpu_temp",
        icon: "hass:thermometer",
        display_name: "CPU Temperature",
        unit: "°C",
        grouped_as_float: true,
    },
    MetricSpec {
        kind: MetricKind::DiskUsage,
        suffix: "diskusage",
        json_key: "used_space",
        icon: "mdi:harddisk",
        display_name: "Disk Usage",
        unit: "%",
        grouped_as_float: false,
    },
    MetricSpec {
        kind: MetricKind::Voltage,
        suffix: "voltage",
        json_key: "voltage",
        icon: "mdi:speedometer",
        display_name: "CPU Voltage",
        unit: "V",
        grouped_as_float: true,
    },
    MetricSpec {
        kind: MetricKind::Swap,
        suffix: "swap",
        json_key: "swap",
        icon: "mdi:harddisk",
        display_name: "Disk Swap",
        unit: "%",
        grouped_as_float: false,
    },
    MetricSpec {
        kind: MetricKind::Memory,
        suffix: "memory",
        json_key: "memory",
        icon: "mdi:memory",
        display_name: "Memory Usage",
        unit: "%",
        grouped_as_float: false,
    },
    MetricSpec {
        kind: MetricKind::SysClockSpeed,
        suffix: "sys_clock_speed",
        json_key: "sys_clock_speed",
        icon: "mdi:speedometer",
        display_name: "CPU Clock Speed",
        unit: "MHz",
        grouped_as_float: false,
    },
    MetricSpec {
        kind: MetricKind::UptimeDays,
        suffix: "uptime_days",
        json_key: "uptime_days",
        icon: "mdi:timer",
        display_name: "Uptime",
        unit: "days",
        grouped_as_float: false,
    },
];

impl MetricKind {
    /// All kinds in table order.
    pub const ALL: [MetricKind; 8] = [
        MetricKind::CpuLoad,
        MetricKind::CpuTemp,
        MetricKind::DiskUsage,
        MetricKind::Voltage,
        MetricKind::Swap,
        MetricKind::Memory,
        MetricKind::SysClockSpeed,
        MetricKind::UptimeDays,
    ];

    pub fn spec(self) -> &'static MetricSpec {
        // Variants are declared in table order.
        &METRICS[self as usize]
    }

    pub fn suffix(self) -> &'static str {
        self.spec().suffix
    }

    pub fn json_key(self) -> &'static str {
        self.spec().json_key
    }

    pub fn from_suffix(suffix: &str) -> Option<MetricKind> {
        METRICS
            .iter()
            .find(|spec| spec.suffix == suffix)
            .map(|spec| spec.kind)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::CpuLoad => "cpu_load",
            MetricKind::CpuTemp => "cpu_temp",
            MetricKind::DiskUsage => "disk_usage",
            MetricKind::Voltage => "voltage",
            MetricKind::Swap => "swap",
            MetricKind::Memory => "memory",
            MetricKind::SysClockSpeed => "sys_clock_speed",
            MetricKind::UptimeDays => "uptime_days",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One measured value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Float(f64),
    Integer(i64),
    /// The probe ran but the hardware or tool could not provide a reading.
    Unavailable,
    /// Tool output that is not a number but is still worth reporting.
    Raw(String),
}

impl MetricValue {
    /// JSON form for the grouped document. `None` means the key is left out.
    pub fn to_json(&self, absent: AbsentValue) -> Option<Value> {
        match self {
            MetricValue::Float(v) => Some(
                Number::from_f64(*v).map_or(Value::Null, Value::Number),
            ),
            MetricValue::Integer(v) => Some(Value::from(*v)),
            MetricValue::Raw(s) => Some(Value::String(s.clone())),
            MetricValue::Unavailable => match absent {
                AbsentValue::Zero => Some(Value::from(0)),
                AbsentValue::Null => Some(Value::Null),
                AbsentValue::Omit => None,
            },
        }
    }

    /// Payload for a per-metric topic. `None` means nothing is published.
    ///
    /// Numbers are rendered the way they appear in JSON, raw strings are
    /// sent unquoted.
    pub fn to_payload(&self, absent: AbsentValue) -> Option<Vec<u8>> {
        match self {
            MetricValue::Raw(s) => Some(s.clone().into_bytes()),
            MetricValue::Unavailable if absent == AbsentValue::Null => Some(Vec::new()),
            other => other
                .to_json(absent)
                .map(|value| value.to_string().into_bytes()),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Integer(v)
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Raw(v)
    }
}

impl<T: Into<MetricValue>> From<Option<T>> for MetricValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(MetricValue::Unavailable, Into::into)
    }
}

/// Rounds to one decimal place.
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// The values sampled in one run, keyed and ordered by kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    values: BTreeMap<MetricKind, MetricValue>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: MetricKind, value: MetricValue) {
        self.values.insert(kind, value);
    }

    pub fn get(&self, kind: MetricKind) -> Option<&MetricValue> {
        self.values.get(&kind)
    }

    /// Entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = (MetricKind, &MetricValue)> {
        self.values.iter().map(|(kind, value)| (*kind, value))
    }

    pub fn kinds(&self) -> Vec<MetricKind> {
        self.values.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The grouped JSON document: one key per entry, in table order.
    pub fn to_json(&self, absent: AbsentValue) -> Value {
        let map: Map<String, Value> = self
            .iter()
            .filter_map(|(kind, value)| {
                let json = value.to_json(absent)?;
                let json = if kind.spec().grouped_as_float {
                    as_float(json)
                } else {
                    json
                };
                Some((kind.json_key().to_string(), json))
            })
            .collect();
        Value::Object(map)
    }
}

fn as_float(value: Value) -> Value {
    match value.as_i64().map(|v| v as f64).and_then(Number::from_f64) {
        Some(number) => Value::Number(number),
        None => value,
    }
}

impl FromIterator<(MetricKind, MetricValue)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (MetricKind, MetricValue)>>(iter: I) -> Self {
        Snapshot {
            values: iter.into_iter().collect(),
        }
    }
}
