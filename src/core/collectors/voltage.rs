use tokio::process::Command;
use tracing::{trace, warn};

use super::{error::CollectorError, traits::DataProducer, types::CollectorResult};
use crate::{
    config::metrics::SourcesConfig,
    core::metric::{MetricKind, MetricValue},
    register_probe,
};

/// Core voltage reported by `vcgencmd measure_volts`.
///
/// Only Raspberry Pi firmware ships `vcgencmd`. When it is missing or exits
/// with an error the reading is `Unavailable`.
#[derive(Debug, Clone)]
pub struct VoltageCollector {
    command: String,
}

impl VoltageCollector {
    pub fn new(command: impl Into<String>) -> Self {
        VoltageCollector {
            command: command.into(),
        }
    }

    async fn run(&self) -> CollectorResult<String> {
        let output = Command::new(&self.command)
            .arg("measure_volts")
            .output()
            .await
            .map_err(|source| CollectorError::CommandExecution {
                command: format!("{} measure_volts", self.command),
                source,
            })?;

        if !output.status.success() {
            return Err(CollectorError::CommandStatus {
                command: format!("{} measure_volts", self.command),
                status: output.status.to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl From<&SourcesConfig> for VoltageCollector {
    fn from(sources: &SourcesConfig) -> Self {
        VoltageCollector::new(sources.vcgencmd.clone())
    }
}

/// Parses `volt=1.2000V`. Text that is not a number after stripping the
/// prefix and unit is kept as `Raw`.
pub fn parse_voltage(output: &str) -> MetricValue {
    let text = output.trim();
    let text = text.strip_prefix("volt=").unwrap_or(text);
    let text = text.strip_suffix('V').unwrap_or(text).trim();

    if text.is_empty() {
        return MetricValue::Unavailable;
    }

    match text.parse::<f64>() {
        Ok(volts) => MetricValue::Float(volts),
        Err(_) => MetricValue::Raw(text.to_string()),
    }
}

#[async_trait::async_trait]
impl DataProducer for VoltageCollector {
    type Output = Option<MetricValue>;

    async fn produce(&self) -> CollectorResult<Self::Output> {
        match self.run().await {
            Ok(output) => {
                trace!(output = output.trim(), "Read vcgencmd output");
                Ok(Some(parse_voltage(&output)))
            }
            Err(e) => {
                warn!("Voltage unavailable: {}", e);
                Ok(None)
            }
        }
    }
}

register_probe!(VoltageCollector, MetricKind::Voltage);
