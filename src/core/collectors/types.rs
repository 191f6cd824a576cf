use super::error::CollectorError;

/// Result type returned by every probe.
pub type CollectorResult<T> = std::result::Result<T, CollectorError>;
