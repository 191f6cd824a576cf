//! One-shot MQTT session.
//!
//! A [`Session`] owns both halves of a rumqttc client and drives the event
//! loop inline: every operation polls until the broker has answered the
//! packet it cares about. There is no background task and no reconnect.
//! A failed exchange is returned to the caller as-is.
//!
//! Lifecycle:
//!
//! 1. `connect` sends CONNECT and waits for a successful CONNACK.
//! 2. `publish` queues a PUBLISH and waits until it is written (QoS 0),
//!    acknowledged with PUBACK (QoS 1) or completed with PUBCOMP (QoS 2).
//! 3. `disconnect` sends DISCONNECT. It is idempotent.
//!
//! Every wait is bounded by `connection_timeout` from [`Config`].

use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, Outgoing, Packet, QoS,
};
use tracing::{debug, info, trace, warn};
use validator::Validate;

use super::{
    client::ClientBuilder,
    config::{Config, EndpointMetadata},
    error::TransferError,
};

/// Maps a numeric QoS level onto rumqttc's enum.
pub fn qos_from_level(level: u8) -> Result<QoS, TransferError> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(TransferError::InvalidMetadata(format!(
            "QoS must be 0, 1 or 2, got {other}"
        ))),
    }
}

/// An open connection to the broker.
pub struct Session {
    client: AsyncClient,
    event_loop: EventLoop,
    timeout: Duration,
    connected: bool,
}

impl Session {
    /// Connects to the broker described by `config` and waits for CONNACK.
    ///
    /// # Errors
    ///
    /// - `ConfigError` / `ClientSetup` when the configuration is unusable
    /// - `ConnectionRefused` when CONNACK carries a failure code
    /// - `ClientConnection` on network failure
    /// - `Timeout` when no CONNACK arrives within `connection_timeout`
    pub async fn connect(config: &Config) -> Result<Self, TransferError> {
        let (client, event_loop) = ClientBuilder::from_config(config)?.build()?;

        let mut session = Session {
            client,
            event_loop,
            timeout: Duration::from_secs(config.connection_timeout),
            connected: false,
        };

        debug!(host = %config.host, port = config.port, "Connecting to broker");
        let timeout = session.timeout;
        tokio::time::timeout(timeout, session.await_connack())
            .await
            .map_err(|_| TransferError::Timeout("CONNACK".into()))??;

        session.connected = true;
        info!(host = %config.host, port = config.port, "Connected to broker");
        Ok(session)
    }

    async fn await_connack(&mut self) -> Result<(), TransferError> {
        loop {
            match self.event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        return Ok(());
                    }
                    return Err(TransferError::ConnectionRefused(format!("{:?}", ack.code)));
                }
                Ok(event) => trace!("Event before CONNACK: {:?}", event),
                Err(ConnectionError::ConnectionRefused(code)) => {
                    return Err(TransferError::ConnectionRefused(format!("{code:?}")));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Publishes `payload` to `meta.topic` and waits for the broker to
    /// acknowledge it according to `meta.qos`.
    pub async fn publish(
        &mut self,
        payload: impl Into<Vec<u8>>,
        meta: &EndpointMetadata,
    ) -> Result<(), TransferError> {
        if !self.connected {
            return Err(TransferError::SessionClosed(
                "publish attempted after disconnect".into(),
            ));
        }

        meta.validate()
            .map_err(|e| TransferError::InvalidMetadata(e.to_string()))?;
        let qos = qos_from_level(meta.qos)?;

        self.client
            .publish(meta.topic.clone(), qos, meta.retain, payload)
            .await?;

        let timeout = self.timeout;
        tokio::time::timeout(timeout, self.await_delivery(qos))
            .await
            .map_err(|_| TransferError::Timeout(format!("delivery on {}", meta.topic)))??;

        trace!(topic = %meta.topic, qos = meta.qos, retain = meta.retain, "Published");
        Ok(())
    }

    async fn await_delivery(&mut self, qos: QoS) -> Result<(), TransferError> {
        let mut sent: Option<u16> = None;
        loop {
            match self.event_loop.poll().await? {
                Event::Outgoing(Outgoing::Publish(pkid)) if sent.is_none() => {
                    if qos == QoS::AtMostOnce {
                        return Ok(());
                    }
                    sent = Some(pkid);
                }
                Event::Incoming(Packet::PubAck(ack))
                    if qos == QoS::AtLeastOnce && sent == Some(ack.pkid) =>
                {
                    return Ok(());
                }
                Event::Incoming(Packet::PubComp(comp))
                    if qos == QoS::ExactlyOnce && sent == Some(comp.pkid) =>
                {
                    return Ok(());
                }
                Event::Incoming(Packet::Disconnect) => {
                    self.connected = false;
                    return Err(TransferError::SessionClosed(
                        "broker sent DISCONNECT".into(),
                    ));
                }
                event => trace!("Event while publishing: {:?}", event),
            }
        }
    }

    /// Sends DISCONNECT and waits for it to be written.
    ///
    /// Calling this on a closed session is a no-op.
    pub async fn disconnect(&mut self) -> Result<(), TransferError> {
        if !self.connected {
            return Ok(());
        }
        self.connected = false;

        self.client.disconnect().await?;

        let timeout = self.timeout;
        let flushed = tokio::time::timeout(timeout, async {
            loop {
                match self.event_loop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => return Ok(()),
                    Ok(_) => {}
                    Err(e) => return Err(e),
                }
            }
        })
        .await
        .map_err(|_| TransferError::Timeout("DISCONNECT".into()))?;

        if let Err(e) = flushed {
            // The socket is going away either way.
            debug!("Connection ended during disconnect: {}", e);
        }

        info!("Disconnected from broker");
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.connected {
            warn!("MQTT session dropped without disconnect");
        }
    }
}
