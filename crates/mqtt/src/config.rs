//! Configuration structures for the broker connection and publish endpoints.
//!
//! All broker settings live in [`Config`], which deserializes from the
//! `[transport]` table of the sbcmon configuration file. Validation is
//! performed with the `validator` crate so that a bad port or a dangling
//! password fails at load time instead of at connect time.
//!
//! # Examples
//!
//! ```toml
//! [transport]
//! host = "mqtt.home.local"
//! port = 1883
//! username = "pi"
//! password = "secret"
//! keep_alive = 60
//!
//! [transport.tls]
//! ca_cert_path = "/etc/mqtt/ca.pem"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Broker connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_credentials"))]
pub struct Config {
    /// Broker hostname or IP address.
    #[validate(length(
        min = 1,
        max = 255,
        message = "Host must be between 1 and 255 characters"
    ))]
    pub host: String,

    /// Broker port. 1883 for plain MQTT, 8883 for MQTT over TLS.
    #[validate(range(min = 1, max = 65535, message = "Port must be between 1 and 65535"))]
    pub port: u16,

    /// Username sent in the CONNECT packet.
    pub username: Option<String>,

    /// Password sent in the CONNECT packet. Requires `username`.
    pub password: Option<String>,

    /// Client identifier. A `sbcmon-<uuid>` id is generated when absent.
    #[validate(length(
        min = 1,
        max = 36,
        message = "Client ID must be between 1 and 36 characters"
    ))]
    pub client_id: Option<String>,

    /// Keep-alive interval in seconds.
    #[validate(range(
        min = 5,
        max = 3600,
        message = "Keep alive must be between 5 and 3600 seconds"
    ))]
    pub keep_alive: u64,

    /// How long to wait for CONNACK, and for each publish acknowledgement,
    /// before giving up.
    #[validate(range(
        min = 1,
        max = 300,
        message = "Connection timeout must be between 1 and 300 seconds"
    ))]
    pub connection_timeout: u64,

    /// Request a clean session from the broker.
    ///
    /// sbcmon never subscribes, so there is nothing to keep between runs.
    pub clean_session: bool,

    /// Maximum MQTT packet size (bytes), applied to both directions.
    #[validate(range(
        min = 64,
        max = 65535,
        message = "Max packet size must be between 64 and 65535 bytes"
    ))]
    pub max_packet_size: Option<u16>,

    /// Capacity of the client request channel. Defaults to 10.
    #[validate(range(
        min = 1,
        max = 255,
        message = "Request channel capacity must be between 1 and 255"
    ))]
    pub request_channel_capacity: Option<u8>,

    /// Optional TLS configuration. TLS is used when a CA certificate is set.
    #[validate(nested)]
    pub tls: Option<TlsConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
            client_id: None,
            keep_alive: 60,
            connection_timeout: 30,
            clean_session: true,
            max_packet_size: Some(65_535),
            request_channel_capacity: Some(10),
            tls: None,
        }
    }
}

impl Config {
    /// Returns the configured client id, or a freshly generated one.
    pub fn client_id_or_generated(&self) -> String {
        match &self.client_id {
            Some(id) => id.clone(),
            None => {
                let uuid = uuid::Uuid::new_v4().simple().to_string();
                format!("sbcmon-{}", &uuid[..12])
            }
        }
    }
}

/// A password without a username cannot be expressed in MQTT 3.1.1.
fn validate_credentials(config: &Config) -> Result<(), ValidationError> {
    if config.password.is_some() && config.username.is_none() {
        return Err(ValidationError::new("password_without_username")
            .with_message("A password requires a username".into()));
    }
    Ok(())
}

/// TLS/SSL configuration for secure broker connections.
///
/// Paths are checked for existence during validation; the files are read
/// when the client is built.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TlsConfig {
    /// CA certificate used to verify the broker (PEM).
    #[validate(custom(
        function = "validate_optional_file_exists",
        message = "CA certificate file does not exist"
    ))]
    pub ca_cert_path: Option<String>,

    /// Client certificate for mutual TLS (PEM). Must be paired with
    /// `client_key_path`.
    #[validate(custom(
        function = "validate_optional_file_exists",
        message = "Client certificate file does not exist"
    ))]
    pub client_cert_path: Option<String>,

    /// Unencrypted client private key for mutual TLS (PEM).
    #[validate(custom(
        function = "validate_optional_file_exists",
        message = "Client key file does not exist"
    ))]
    pub client_key_path: Option<String>,
}

impl TlsConfig {
    /// True when a CA certificate is configured.
    pub fn is_enabled(&self) -> bool {
        self.ca_cert_path.is_some()
    }

    /// Checks that the CA is present and that client auth is either fully
    /// configured or absent.
    pub fn validate_config(&self) -> Result<(), ValidationError> {
        let ca = self.ca_cert_path.as_deref().ok_or_else(|| {
            ValidationError::new("missing_ca_cert")
                .with_message("CA certificate path is required".into())
        })?;
        validate_file_path(ca)?;

        match (
            self.client_cert_path.as_deref(),
            self.client_key_path.as_deref(),
        ) {
            (Some(cert), Some(key)) => {
                validate_file_path(cert)?;
                validate_file_path(key)?;
            }
            (None, None) => {}
            _ => {
                return Err(ValidationError::new("incomplete_client_auth").with_message(
                    "Both client certificate and key must be provided or neither".into(),
                ));
            }
        }

        Ok(())
    }
}

fn validate_optional_file_exists(path: &str) -> Result<(), ValidationError> {
    validate_file_path(path)
}

fn validate_file_path(path: &str) -> Result<(), ValidationError> {
    if path.is_empty() {
        return Err(
            ValidationError::new("empty_path").with_message("File path cannot be empty".into())
        );
    }

    let path_obj = Path::new(path);

    if !path_obj.exists() {
        return Err(ValidationError::new("file_not_found")
            .with_message(format!("File does not exist: {path}").into()));
    }

    if !path_obj.is_file() {
        return Err(ValidationError::new("not_a_file")
            .with_message(format!("Path is not a file: {path}").into()));
    }

    Ok(())
}

/// Destination of a single publish: topic, QoS and retain flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EndpointMetadata {
    /// MQTT Quality of Service level.
    ///
    /// - 0 (AtMostOnce): written to the socket, no confirmation.
    /// - 1 (AtLeastOnce): acknowledged by the broker with PUBACK.
    /// - 2 (ExactlyOnce): four-way handshake ending in PUBCOMP.
    #[validate(range(min = 0, max = 2, message = "Invalid QoS value, must be 0, 1, or 2"))]
    pub qos: u8,

    /// Concrete publish topic. Wildcards are rejected.
    #[validate(
        length(min = 1, message = "Topic must not be empty"),
        custom(function = "validate_publish_topic")
    )]
    pub topic: String,

    /// Whether the broker should retain the message for new subscribers.
    pub retain: bool,
}

impl EndpointMetadata {
    pub fn new(topic: impl Into<String>, qos: u8, retain: bool) -> Self {
        Self {
            qos,
            topic: topic.into(),
            retain,
        }
    }
}

fn validate_publish_topic(topic: &str) -> Result<(), ValidationError> {
    if topic.contains(['+', '#']) {
        return Err(ValidationError::new("wildcard_topic")
            .with_message(format!("Publish topic must not contain wildcards: {topic}").into()));
    }
    Ok(())
}
