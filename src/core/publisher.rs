//! Publishes a [`Snapshot`] (and its discovery configs) over a [`Transport`].

use std::future::Future;

use sbcmon_mqtt::{EndpointMetadata, Session, TransferError};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::{
    discovery,
    host::HostIdentity,
    metric::{MetricKind, Snapshot},
    topics::TopicLayout,
};
use crate::config::publish::PublishConfig;

/// Discovery configs are fire-and-forget.
const DISCOVERY_QOS: u8 = 0;
const VALUE_QOS: u8 = 1;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Transport error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Interrupted by shutdown signal")]
    Interrupted,
}

/// The broker connection as seen by the publisher.
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Sends one message and returns once it is delivered at `meta.qos`.
    async fn send(&mut self, payload: Vec<u8>, meta: &EndpointMetadata) -> Result<(), TransferError>;

    /// Ends the session. Must be safe to call more than once.
    async fn close(&mut self) -> Result<(), TransferError>;
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for &mut T {
    async fn send(&mut self, payload: Vec<u8>, meta: &EndpointMetadata) -> Result<(), TransferError> {
        (**self).send(payload, meta).await
    }

    async fn close(&mut self) -> Result<(), TransferError> {
        (**self).close().await
    }
}

#[async_trait::async_trait]
impl Transport for Session {
    async fn send(&mut self, payload: Vec<u8>, meta: &EndpointMetadata) -> Result<(), TransferError> {
        self.publish(payload, meta).await
    }

    async fn close(&mut self) -> Result<(), TransferError> {
        self.disconnect().await
    }
}

pub struct Publisher<'a> {
    config: &'a PublishConfig,
    host: &'a HostIdentity,
    layout: TopicLayout,
}

impl<'a> Publisher<'a> {
    pub fn new(config: &'a PublishConfig, host: &'a HostIdentity) -> Self {
        Publisher {
            config,
            host,
            layout: TopicLayout::new(&config.topic_prefix, &host.hostname),
        }
    }

    /// Publishes `snapshot` and closes `transport`, whatever the outcome.
    ///
    /// The first failed publish stops the sequence. Its error is returned in
    /// preference to any error from closing. If `shutdown` completes first,
    /// the sequence is abandoned with [`PublishError::Interrupted`] and the
    /// transport is still closed.
    pub async fn publish<T, S>(
        &self,
        snapshot: &Snapshot,
        transport: &mut T,
        shutdown: S,
    ) -> Result<(), PublishError>
    where
        T: Transport + ?Sized,
        S: Future<Output = ()>,
    {
        let sequence = async {
            if self.config.group_messages {
                self.publish_grouped(snapshot, transport).await
            } else {
                self.publish_each(snapshot, transport).await
            }
        };

        let result = tokio::select! {
            biased;
            _ = shutdown => {
                info!("Shutdown requested, closing transport");
                Err(PublishError::Interrupted)
            }
            result = sequence => result,
        };

        let closed = transport.close().await;

        match (result, closed) {
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    warn!("Failed to close transport after error: {}", close_err);
                }
                Err(e)
            }
            (Ok(()), closed) => {
                closed?;
                info!(metrics = snapshot.len(), "Published snapshot");
                Ok(())
            }
        }
    }

    async fn publish_each<T>(&self, snapshot: &Snapshot, transport: &mut T) -> Result<(), PublishError>
    where
        T: Transport + ?Sized,
    {
        let absent = self.config.absent_value;

        for (kind, value) in snapshot.iter() {
            if self.config.discovery_messages {
                self.publish_discovery(kind, transport).await?;
            }

            let Some(payload) = value.to_payload(absent) else {
                debug!(metric = %kind, "Value unavailable, skipping publish");
                continue;
            };

            let meta = EndpointMetadata::new(self.layout.value(kind), VALUE_QOS, false);
            debug!(topic = %meta.topic, "Publishing value");
            transport.send(payload, &meta).await?;
            self.pace().await;
        }

        Ok(())
    }

    async fn publish_grouped<T>(&self, snapshot: &Snapshot, transport: &mut T) -> Result<(), PublishError>
    where
        T: Transport + ?Sized,
    {
        if self.config.discovery_messages {
            for kind in snapshot.kinds() {
                self.publish_discovery(kind, transport).await?;
            }
        }

        let document = snapshot.to_json(self.config.absent_value);
        let meta = EndpointMetadata::new(self.layout.grouped(), VALUE_QOS, false);
        debug!(topic = %meta.topic, %document, "Publishing grouped values");
        transport.send(serde_json::to_vec(&document)?, &meta).await?;

        Ok(())
    }

    async fn publish_discovery<T>(&self, kind: MetricKind, transport: &mut T) -> Result<(), PublishError>
    where
        T: Transport + ?Sized,
    {
        let descriptor = discovery::build(kind, self.host, self.config);
        let meta = EndpointMetadata::new(
            self.layout.discovery(kind),
            DISCOVERY_QOS,
            self.config.discovery_retain,
        );

        debug!(topic = %meta.topic, "Publishing discovery config");
        transport.send(descriptor.to_json()?, &meta).await?;
        self.pace().await;
        Ok(())
    }

    async fn pace(&self) {
        let pacing = self.config.pacing();
        if !pacing.is_zero() {
            sleep(pacing).await;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::future::pending;

    use serde_json::{json, Value};
    use tokio::time::{Duration, Instant};
    use tracing_test::traced_test;

    use super::*;
    use crate::{config::publish::AbsentValue, core::metric::MetricValue};

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) struct Sent {
        pub topic: String,
        pub payload: Vec<u8>,
        pub qos: u8,
        pub retain: bool,
    }

    /// In-memory transport that records every message.
    #[derive(Default)]
    pub(crate) struct RecordingTransport {
        pub sent: Vec<Sent>,
        pub closes: usize,
        /// Fail the send with this index (0-based).
        pub fail_at: Option<usize>,
    }

    #[async_trait::async_trait]
    impl Transport for RecordingTransport {
        async fn send(&mut self, payload: Vec<u8>, meta: &EndpointMetadata) -> Result<(), TransferError> {
            if self.fail_at == Some(self.sent.len()) {
                return Err(TransferError::SessionClosed("broker went away".into()));
            }
            self.sent.push(Sent {
                topic: meta.topic.clone(),
                payload,
                qos: meta.qos,
                retain: meta.retain,
            });
            Ok(())
        }

        async fn close(&mut self) -> Result<(), TransferError> {
            self.closes += 1;
            Ok(())
        }
    }

    fn host() -> HostIdentity {
        HostIdentity::new("pi4", "Raspberry Pi 4 Model B Rev 1.4")
    }

    fn config(grouped: bool, discovery: bool) -> PublishConfig {
        PublishConfig {
            group_messages: grouped,
            discovery_messages: discovery,
            sleep_time: 0.0,
            ..Default::default()
        }
    }

    fn topics(transport: &RecordingTransport) -> Vec<&str> {
        transport.sent.iter().map(|s| s.topic.as_str()).collect()
    }

    #[tokio::test]
    async fn test_ungrouped_with_discovery() {
        let snapshot: Snapshot = [
            (MetricKind::Memory, MetricValue::Integer(37)),
            (MetricKind::CpuTemp, MetricValue::Integer(48)),
        ]
        .into_iter()
        .collect();

        let config = config(false, true);
        let host = host();
        let mut transport = RecordingTransport::default();
        Publisher::new(&config, &host)
            .publish(&snapshot, &mut transport, pending())
            .await
            .unwrap();

        assert_eq!(
            topics(&transport),
            vec![
                "homeassistant/sensor/rpi-MQTT-monitor/pi4_cputemp/config",
                "rpi-MQTT-monitor/pi4/cputemp",
                "homeassistant/sensor/rpi-MQTT-monitor/pi4_memory/config",
                "rpi-MQTT-monitor/pi4/memory",
            ]
        );
        let qos: Vec<u8> = transport.sent.iter().map(|s| s.qos).collect();
        assert_eq!(qos, vec![0, 1, 0, 1]);
        assert!(transport.sent.iter().all(|s| !s.retain));
        assert_eq!(transport.sent[1].payload, b"48");
        assert_eq!(transport.sent[3].payload, b"37");
        assert_eq!(transport.closes, 1);

        let discovery: Value = serde_json::from_slice(&transport.sent[0].payload).unwrap();
        assert_eq!(discovery["unique_id"], "pi4_cputemp");
        assert_eq!(discovery["state_topic"], "rpi-MQTT-monitor/pi4/cputemp");
    }

    #[tokio::test]
    async fn test_grouped_without_discovery() {
        let snapshot: Snapshot = [
            (MetricKind::CpuLoad, MetricValue::Float(12.5)),
            (MetricKind::DiskUsage, MetricValue::Float(41.3)),
        ]
        .into_iter()
        .collect();

        let config = config(true, false);
        let host = host();
        let mut transport = RecordingTransport::default();
        Publisher::new(&config, &host)
            .publish(&snapshot, &mut transport, pending())
            .await
            .unwrap();

        assert_eq!(topics(&transport), vec!["rpi-MQTT-monitor/pi4"]);
        assert_eq!(transport.sent[0].qos, 1);

        let document: Value = serde_json::from_slice(&transport.sent[0].payload).unwrap();
        assert_eq!(document, json!({"cpu_load": 12.5, "used_space": 41.3}));
    }

    #[tokio::test]
    async fn test_grouped_document_decodes_to_snapshot() {
        let snapshot: Snapshot = MetricKind::ALL
            .into_iter()
            .map(|kind| match kind {
                MetricKind::CpuLoad | MetricKind::Swap => (kind, MetricValue::Float(3.5)),
                _ => (kind, MetricValue::Integer(kind as i64 * 10)),
            })
            .collect();

        let config = config(true, true);
        let host = host();
        let mut transport = RecordingTransport::default();
        Publisher::new(&config, &host)
            .publish(&snapshot, &mut transport, pending())
            .await
            .unwrap();

        assert_eq!(transport.sent.len(), MetricKind::ALL.len() + 1);
        let last = transport.sent.last().unwrap();
        let document: Value = serde_json::from_slice(&last.payload).unwrap();

        for (kind, value) in snapshot.iter() {
            let decoded = &document[kind.json_key()];
            match value {
                MetricValue::Float(v) => assert_eq!(decoded.as_f64(), Some(*v)),
                MetricValue::Integer(v) => assert_eq!(decoded.as_f64(), Some(*v as f64)),
                other => panic!("unexpected value {other:?}"),
            }
        }

        for sent in &transport.sent[..MetricKind::ALL.len()] {
            let discovery: Value = serde_json::from_slice(&sent.payload).unwrap();
            assert_eq!(discovery["state_topic"], "rpi-MQTT-monitor/pi4");
            assert!(discovery["value_template"]
                .as_str()
                .unwrap()
                .starts_with("{{value_json."));
        }
    }

    #[tokio::test]
    async fn test_absent_value_policies() {
        let snapshot: Snapshot = [
            (MetricKind::CpuTemp, MetricValue::Unavailable),
            (MetricKind::Memory, MetricValue::Integer(20)),
        ]
        .into_iter()
        .collect();
        let host = host();

        let cases = [
            (AbsentValue::Zero, Some(b"0".to_vec()), json!({"cpu_temp": 0.0, "memory": 20})),
            (AbsentValue::Null, Some(Vec::new()), json!({"cpu_temp": null, "memory": 20})),
            (AbsentValue::Omit, None, json!({"memory": 20})),
        ];

        for (absent, payload, document) in cases {
            let mut ungrouped = config(false, false);
            ungrouped.absent_value = absent;
            let mut transport = RecordingTransport::default();
            Publisher::new(&ungrouped, &host)
                .publish(&snapshot, &mut transport, pending())
                .await
                .unwrap();

            let temp = transport
                .sent
                .iter()
                .find(|s| s.topic.ends_with("/cputemp"))
                .map(|s| s.payload.clone());
            assert_eq!(temp, payload, "{absent:?}");

            let mut grouped = config(true, false);
            grouped.absent_value = absent;
            let mut transport = RecordingTransport::default();
            Publisher::new(&grouped, &host)
                .publish(&snapshot, &mut transport, pending())
                .await
                .unwrap();

            let decoded: Value = serde_json::from_slice(&transport.sent[0].payload).unwrap();
            assert_eq!(decoded, document, "{absent:?}");
        }
    }

    #[tokio::test]
    async fn test_discovery_retain_flag() {
        let snapshot: Snapshot = [(MetricKind::Swap, MetricValue::Float(0.0))].into_iter().collect();
        let mut config = config(false, true);
        config.discovery_retain = true;
        let host = host();

        let mut transport = RecordingTransport::default();
        Publisher::new(&config, &host)
            .publish(&snapshot, &mut transport, pending())
            .await
            .unwrap();

        assert!(transport.sent[0].retain);
        assert!(!transport.sent[1].retain);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failure_stops_sequence_and_closes() {
        let snapshot: Snapshot = [
            (MetricKind::CpuLoad, MetricValue::Float(1.0)),
            (MetricKind::Memory, MetricValue::Integer(2)),
        ]
        .into_iter()
        .collect();

        let config = config(false, true);
        let host = host();
        let mut transport = RecordingTransport {
            fail_at: Some(1),
            ..Default::default()
        };

        let err = Publisher::new(&config, &host)
            .publish(&snapshot, &mut transport, pending())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PublishError::Transfer(TransferError::SessionClosed(_))
        ));
        assert_eq!(transport.sent.len(), 1);
        assert_eq!(transport.closes, 1);
        assert!(!logs_contain("Published snapshot"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_follows_each_publish() {
        let snapshot: Snapshot = [
            (MetricKind::CpuTemp, MetricValue::Integer(40)),
            (MetricKind::Memory, MetricValue::Integer(30)),
        ]
        .into_iter()
        .collect();
        let host = host();

        let mut ungrouped = config(false, true);
        ungrouped.sleep_time = 0.5;
        let start = Instant::now();
        Publisher::new(&ungrouped, &host)
            .publish(&snapshot, &mut RecordingTransport::default(), pending())
            .await
            .unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(2));

        // Grouped: one pause per discovery config, none after the document.
        let mut grouped = config(true, true);
        grouped.sleep_time = 0.5;
        let start = Instant::now();
        Publisher::new(&grouped, &host)
            .publish(&snapshot, &mut RecordingTransport::default(), pending())
            .await
            .unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_shutdown_stops_sequence_and_closes() {
        let snapshot: Snapshot = [
            (MetricKind::CpuTemp, MetricValue::Integer(40)),
            (MetricKind::Memory, MetricValue::Integer(30)),
        ]
        .into_iter()
        .collect();
        let host = host();

        let mut config = config(false, true);
        config.sleep_time = 0.5;
        let mut transport = RecordingTransport::default();

        // Fires during the pause after the first value.
        let err = Publisher::new(&config, &host)
            .publish(
                &snapshot,
                &mut transport,
                sleep(Duration::from_millis(750)),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::Interrupted));
        assert_eq!(transport.sent.len(), 2);
        assert_eq!(transport.closes, 1);
        assert!(logs_contain("Shutdown requested"));
    }

    #[tokio::test]
    async fn test_empty_snapshot() {
        let host = host();

        let mut transport = RecordingTransport::default();
        Publisher::new(&config(false, true), &host)
            .publish(&Snapshot::new(), &mut transport, pending())
            .await
            .unwrap();
        assert!(transport.sent.is_empty());
        assert_eq!(transport.closes, 1);

        let mut transport = RecordingTransport::default();
        Publisher::new(&config(true, true), &host)
            .publish(&Snapshot::new(), &mut transport, pending())
            .await
            .unwrap();
        assert_eq!(transport.sent.len(), 1);
        assert_eq!(transport.sent[0].payload, b"{}");
    }
}
