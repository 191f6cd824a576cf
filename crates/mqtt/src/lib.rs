//! # sbcmon-mqtt: one-shot MQTT session for metric publishing
//!
//! A thin layer over `rumqttc` for programs that connect, publish a handful
//! of messages and leave. It adds:
//!
//! - **Validated configuration** loaded from TOML (`[transport]` table)
//! - **TLS/SSL** with optional client certificate authentication
//! - **Acknowledged publishes**: each call returns once the broker has
//!   confirmed delivery at the requested QoS
//! - **Bounded waits** on CONNACK and every acknowledgement
//!
//! There is no reconnect logic and no background task. Scheduling repeated
//! runs belongs to whatever starts the process (cron, a systemd timer).
//!
//! # Quick Start
//!
//! ```ignore
//! use sbcmon_mqtt::{Config, EndpointMetadata, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sbcmon_mqtt::TransferError> {
//!     let config = Config { host: "broker.lan".into(), ..Default::default() };
//!     let mut session = Session::connect(&config).await?;
//!
//!     let meta = EndpointMetadata::new("rpi-MQTT-monitor/pi/cputemp", 1, false);
//!     session.publish(b"48.3".to_vec(), &meta).await?;
//!
//!     session.disconnect().await
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod session;

pub use client::ClientBuilder;
pub use config::{Config, EndpointMetadata, TlsConfig};
pub use error::TransferError;
pub use session::{qos_from_level, Session};

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, TransferError>;
