//! Error handling for MQTT session operations.
//!
//! `TransferError` is the single error type returned by the session, the
//! client builder and configuration validation. Variants fall into three
//! groups:
//!
//! **Configuration errors** (caught before any network traffic):
//! - `InvalidMetadata`: malformed topic or QoS for a publish
//! - `ClientSetup`: TLS material or options could not be assembled
//! - `ConfigError`: validation failures in [`Config`](crate::Config)
//!
//! **Connection errors** (broker unreachable or refusing us):
//! - `ClientConnection`: network-level failure reported by the event loop
//! - `ConnectionRefused`: CONNACK carried a non-success return code
//! - `Timeout`: the broker did not answer within `connection_timeout`
//!
//! **Runtime errors**:
//! - `ClientTransfer`: the request could not be queued on the client
//! - `SessionClosed`: an operation was attempted after `disconnect`
//! - `Io`: certificate files could not be read
//!
//! None of these are retried. The caller decides whether a failed run is
//! worth repeating; sbcmon leaves that to its external scheduler.

use thiserror::Error;

/// The unified error type for MQTT session operations.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Endpoint metadata is invalid: empty topic, wildcard in a publish
    /// topic, or a QoS outside 0..=2.
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// MQTT client initialization failed.
    ///
    /// Typically a TLS certificate path that cannot be read or an
    /// incomplete client-auth pair.
    #[error("Client setup error: {0}")]
    ClientSetup(String),

    /// Configuration validation failed.
    #[error("Configuration error: {0}")]
    ConfigError(#[from] validator::ValidationErrors),

    /// The client failed to queue a request for the event loop.
    #[error("Client transfer error: {0}")]
    ClientTransfer(#[from] rumqttc::ClientError),

    /// Network or protocol failure reported while polling the event loop.
    ///
    /// Boxed to keep the enum small.
    #[error("Client connection error: {0}")]
    ClientConnection(#[from] Box<rumqttc::ConnectionError>),

    /// The broker answered CONNECT with a non-success return code
    /// (bad credentials, unauthorized client id, ...).
    #[error("Connection refused by broker: {0}")]
    ConnectionRefused(String),

    /// The broker did not complete an exchange in time.
    #[error("Timed out waiting for {0}")]
    Timeout(String),

    /// The broker closed the session while we were waiting on it.
    #[error("Session closed: {0}")]
    SessionClosed(String),

    /// I/O failure outside the network path (certificate loading).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Boxes rumqttc's `ConnectionError` so `?` works directly on `poll()`.
impl From<rumqttc::ConnectionError> for TransferError {
    fn from(err: rumqttc::ConnectionError) -> Self {
        TransferError::ClientConnection(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_error_display() {
        let err = TransferError::InvalidMetadata("QoS must be 0-2".into());
        assert_eq!(err.to_string(), "Invalid metadata: QoS must be 0-2");
    }

    #[test]
    fn test_transfer_error_timeout() {
        let err = TransferError::Timeout("CONNACK".into());
        assert_eq!(err.to_string(), "Timed out waiting for CONNACK");
    }

    #[test]
    fn test_transfer_error_refused() {
        let err = TransferError::ConnectionRefused("BadUserNamePassword".into());
        assert!(err.to_string().contains("BadUserNamePassword"));
    }

    #[test]
    fn test_transfer_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let transfer_err: TransferError = io_err.into();
        assert!(matches!(transfer_err, TransferError::Io(_)));
        assert!(transfer_err.to_string().contains("file not found"));
    }

    #[test]
    fn test_transfer_error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(TransferError::SessionClosed("bye".into()));
        assert_eq!(err.to_string(), "Session closed: bye");
    }
}
