//! MQTT client builder with credential and TLS support.
//!
//! `ClientBuilder` turns a [`Config`] into the rumqttc `AsyncClient` /
//! `EventLoop` pair. The pair is consumed by [`Session`](crate::Session),
//! which drives the event loop itself instead of spawning it.
//!
//! # Examples
//!
//! ```ignore
//! let config = Config { host: "broker.lan".into(), ..Default::default() };
//! let (client, event_loop) = ClientBuilder::from_config(&config)?.build()?;
//! ```

use std::{fs, time::Duration};

use rumqttc::{AsyncClient, EventLoop, MqttOptions, TlsConfiguration, Transport};
use validator::Validate;

use super::{
    config::{Config, TlsConfig},
    error::TransferError,
};

/// Builder for the rumqttc client and event loop.
pub struct ClientBuilder {
    /// MQTT protocol options (host, port, keep-alive, credentials, ...)
    opts: MqttOptions,

    /// Capacity of the request channel between client and event loop.
    cap: usize,

    /// TLS settings, applied at `build()` time.
    tls_config: Option<TlsConfig>,
}

impl ClientBuilder {
    /// Creates a builder from a validated [`Config`].
    ///
    /// # Errors
    ///
    /// Returns `TransferError::ConfigError` when validation fails.
    pub fn from_config(config: &Config) -> Result<Self, TransferError> {
        config.validate()?;

        let mut opts = MqttOptions::new(
            config.client_id_or_generated(),
            config.host.clone(),
            config.port,
        );
        opts.set_keep_alive(Duration::from_secs(config.keep_alive));
        opts.set_clean_session(config.clean_session);

        if let Some(max_packet_size) = config.max_packet_size {
            opts.set_max_packet_size(max_packet_size as usize, max_packet_size as usize);
        }

        if let Some(username) = &config.username {
            opts.set_credentials(
                username.clone(),
                config.password.clone().unwrap_or_default(),
            );
        }

        let cap = config.request_channel_capacity.unwrap_or(10) as usize;

        let tls_config = config.tls.clone().filter(TlsConfig::is_enabled);

        Ok(Self {
            opts,
            cap,
            tls_config,
        })
    }

    fn load_file(path: &str) -> Result<Vec<u8>, TransferError> {
        Ok(fs::read(path)?)
    }

    fn build_tls_transport(tls_config: &TlsConfig) -> Result<Transport, TransferError> {
        tls_config
            .validate_config()
            .map_err(|e| TransferError::ClientSetup(format!("Invalid TLS configuration: {}", e)))?;

        let ca_path = tls_config
            .ca_cert_path
            .as_deref()
            .ok_or_else(|| TransferError::ClientSetup("TLS configuration is not set".into()))?;
        let ca = Self::load_file(ca_path)?;

        let client_auth = match (
            tls_config.client_cert_path.as_deref(),
            tls_config.client_key_path.as_deref(),
        ) {
            (Some(cert), Some(key)) => Some((Self::load_file(cert)?, Self::load_file(key)?)),
            _ => None,
        };

        Ok(Transport::Tls(TlsConfiguration::Simple {
            ca,
            client_auth,
            alpn: None,
        }))
    }

    /// Constructs the client and its event loop.
    ///
    /// Nothing touches the network until the event loop is polled.
    pub fn build(self) -> Result<(AsyncClient, EventLoop), TransferError> {
        let mut opts = self.opts;
        if let Some(tls) = &self.tls_config {
            opts.set_transport(Self::build_tls_transport(tls)?);
        }

        Ok(AsyncClient::new(opts, self.cap))
    }
}

#[cfg(test)]
mod tests {
    use std::{fs::File, io::Write};

    use tempfile::TempDir;

    use super::*;

    struct TestFiles {
        _temp_dir: TempDir,
        ca_cert: String,
        client_cert: String,
        client_key: String,
    }

    impl TestFiles {
        fn new() -> std::io::Result<Self> {
            let temp_dir = TempDir::new()?;

            let ca_cert = temp_dir.path().join("ca.crt");
            let client_cert = temp_dir.path().join("client.crt");
            let client_key = temp_dir.path().join("client.key");

            File::create(&ca_cert)?.write_all(b"ca certificate content")?;
            File::create(&client_cert)?.write_all(b"client certificate content")?;
            File::create(&client_key)?.write_all(b"client key content")?;

            Ok(TestFiles {
                _temp_dir: temp_dir,
                ca_cert: ca_cert.to_string_lossy().into_owned(),
                client_cert: client_cert.to_string_lossy().into_owned(),
                client_key: client_key.to_string_lossy().into_owned(),
            })
        }
    }

    fn tls_config(toml_tls: &str) -> Config {
        toml::from_str(&format!(
            "host = \"broker.lan\"\nport = 8883\n\n[tls]\n{toml_tls}"
        ))
        .expect("valid TOML")
    }

    #[tokio::test]
    async fn test_build_from_config() {
        let config = Config {
            host: "localhost".to_string(),
            client_id: Some("test_client".to_string()),
            username: Some("pi".to_string()),
            password: Some("secret".to_string()),
            keep_alive: 30,
            ..Default::default()
        };

        let builder = ClientBuilder::from_config(&config).expect("valid config");
        assert_eq!(builder.cap, 10);
        assert!(builder.tls_config.is_none());
        assert_eq!(builder.opts.keep_alive(), Duration::from_secs(30));
        assert_eq!(
            builder.opts.credentials(),
            Some(("pi".to_string(), "secret".to_string()))
        );
        assert!(builder.build().is_ok());
    }

    #[tokio::test]
    async fn test_build_tls_from_config_with_client_auth() {
        let files = TestFiles::new().expect("Failed to create test files");
        let config = tls_config(&format!(
            "ca_cert_path = {:?}\nclient_cert_path = {:?}\nclient_key_path = {:?}\n",
            files.ca_cert, files.client_cert, files.client_key
        ));

        let builder = ClientBuilder::from_config(&config).expect("valid config");
        let tls = builder.tls_config.clone().expect("TLS enabled");
        assert_eq!(tls.client_key_path.as_deref(), Some(files.client_key.as_str()));

        let transport = ClientBuilder::build_tls_transport(&tls).expect("TLS transport");
        match transport {
            Transport::Tls(TlsConfiguration::Simple { ca, client_auth, .. }) => {
                assert_eq!(ca, b"ca certificate content");
                assert_eq!(
                    client_auth,
                    Some((
                        b"client certificate content".to_vec(),
                        b"client key content".to_vec()
                    ))
                );
            }
            _ => panic!("expected a simple TLS transport"),
        }

        assert!(builder.build().is_ok());
    }

    #[tokio::test]
    async fn test_build_tls_from_config_ca_only() {
        let files = TestFiles::new().expect("Failed to create test files");
        let config = tls_config(&format!("ca_cert_path = {:?}\n", files.ca_cert));

        let builder = ClientBuilder::from_config(&config).expect("valid config");
        let tls = builder.tls_config.clone().expect("TLS enabled");
        match ClientBuilder::build_tls_transport(&tls).expect("TLS transport") {
            Transport::Tls(TlsConfiguration::Simple { client_auth, .. }) => {
                assert!(client_auth.is_none());
            }
            _ => panic!("expected a simple TLS transport"),
        }
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_tls_from_config_missing_ca() {
        let config = tls_config("ca_cert_path = \"/nonexistent/ca.crt\"\n");

        let result = ClientBuilder::from_config(&config);
        assert!(matches!(result, Err(TransferError::ConfigError(_))));
    }

    #[test]
    fn test_tls_from_config_partial_client_auth() {
        let files = TestFiles::new().expect("Failed to create test files");
        let config = tls_config(&format!(
            "ca_cert_path = {:?}\nclient_cert_path = {:?}\n",
            files.ca_cert, files.client_cert
        ));

        let builder = ClientBuilder::from_config(&config).expect("paths exist");
        assert!(matches!(builder.build(), Err(TransferError::ClientSetup(_))));
    }

    #[test]
    fn test_build_from_config_invalid() {
        let config = Config {
            host: "".to_string(),
            ..Default::default()
        };

        let result = ClientBuilder::from_config(&config);
        assert!(matches!(result, Err(TransferError::ConfigError(_))));
    }

    #[test]
    fn test_disabled_tls_table_is_ignored() {
        let config = Config {
            tls: Some(TlsConfig::default()),
            ..Default::default()
        };

        let builder = ClientBuilder::from_config(&config).expect("valid config");
        assert!(builder.tls_config.is_none());
    }
}
